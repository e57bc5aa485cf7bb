use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FeedItem;

/// Channel-level information extracted once per parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMetadata {
    pub title: String,
    /// Alternate or self link of the feed; empty when none could be found.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl FeedMetadata {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: None,
            last_updated: None,
        }
    }
}

/// A parsed feed as stored under the content sub-key of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedFeedData {
    pub feed: FeedMetadata,
    pub items: Vec<FeedItem>,
    pub cached_at: DateTime<Utc>,
}

impl CachedFeedData {
    pub fn new(feed: FeedMetadata, items: Vec<FeedItem>) -> Self {
        Self {
            feed,
            items,
            cached_at: Utc::now(),
        }
    }
}

/// Revalidation headers remembered for a URL.
///
/// Both fields live under their own sub-key, so either may be missing
/// independently of the other and of the cached content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl CacheMetadata {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}
