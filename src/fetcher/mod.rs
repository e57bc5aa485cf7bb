pub mod http_fetcher;
pub mod parallel;

use async_trait::async_trait;
use serde::Serialize;

use crate::app::Result;
use crate::cache::FeedCache;
use crate::domain::{Failure, FeedItem, FeedMetadata};

/// A feed delivered either fresh from the origin or from the cache after a 304.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedFeed {
    pub feed: FeedMetadata,
    pub items: Vec<FeedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FetchResult {
    Success(FetchedFeed),
    Failure(Failure),
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success(_))
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            FetchResult::Failure(failure) => Some(failure),
            FetchResult::Success(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Skip conditional headers even when validators are cached.
    pub force_refresh: bool,
    /// TTL for the cache write; the cache default applies when `None`.
    pub ttl_secs: Option<u64>,
}

/// Fetches a feed from its origin, optionally revalidating against a cache.
///
/// Expected failures (bad status, timeout, unparsable body) come back as
/// [`FetchResult::Failure`]; `Err` is reserved for the cache store itself
/// misbehaving.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        cache: Option<&FeedCache>,
        options: &FetchOptions,
    ) -> Result<FetchResult>;

    async fn fetch_feed(&self, url: &str) -> Result<FetchResult> {
        self.fetch(url, None, &FetchOptions::default()).await
    }

    async fn fetch_feed_with_cache(&self, url: &str, cache: &FeedCache) -> Result<FetchResult> {
        self.fetch(url, Some(cache), &FetchOptions::default()).await
    }
}
