use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::{Client, Response, StatusCode};

use crate::app::{FeedwellError, Result};
use crate::cache::{derive_key, FeedCache};
use crate::config::FetcherConfig;
use crate::domain::{CacheMetadata, CachedFeedData, Failure};
use crate::fetcher::{FetchOptions, FetchResult, FetchedFeed, Fetcher};
use crate::normalizer::parse_feed;

pub struct HttpFetcher {
    client: Client,
    accept: HeaderValue,
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let accept = HeaderValue::from_str(&config.accept).map_err(|e| {
            FeedwellError::Config(format!("invalid accept header {:?}: {}", config.accept, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            accept,
            config,
        })
    }

    fn request_headers(&self, validators: &CacheMetadata) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(ACCEPT, self.accept.clone());

        if let Some(ref etag) = validators.etag {
            if let Ok(value) = HeaderValue::from_str(etag) {
                headers.insert(IF_NONE_MATCH, value);
            }
        }

        if let Some(ref last_modified) = validators.last_modified {
            if let Ok(value) = HeaderValue::from_str(last_modified) {
                headers.insert(IF_MODIFIED_SINCE, value);
            }
        }

        headers
    }

    /// Map a transport error to a failure; only the client timeout is `timeout`.
    fn transport_failure(&self, url: &str, err: reqwest::Error) -> Failure {
        if err.is_timeout() {
            tracing::warn!("Timed out fetching {}", url);
            Failure::timeout(format!(
                "Request timed out after {}ms",
                self.config.timeout_ms
            ))
        } else {
            tracing::warn!("Failed to fetch {}: {}", url, err);
            Failure::feed_not_found(err.to_string())
        }
    }

    async fn not_modified(
        &self,
        url: &str,
        cache: &FeedCache,
        key: &str,
        validators: CacheMetadata,
    ) -> Result<FetchResult> {
        match cache.read_content(key).await? {
            Some(data) => {
                tracing::debug!("Feed {} not modified, serving cached copy", url);
                Ok(FetchResult::Success(FetchedFeed {
                    feed: data.feed,
                    items: data.items,
                    etag: validators.etag,
                    last_modified: validators.last_modified,
                    cached: true,
                }))
            }
            None => {
                tracing::warn!("Origin returned 304 for {} but no cached content exists", url);
                Ok(FetchResult::Failure(Failure::feed_not_found(
                    "Origin returned 304 Not Modified but no cached content exists (cache metadata and content are out of sync)",
                )))
            }
        }
    }
}

fn header_string(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        cache: Option<&FeedCache>,
        options: &FetchOptions,
    ) -> Result<FetchResult> {
        let key = derive_key(url);

        let validators = match cache {
            Some(cache) if !options.force_refresh => cache.read_metadata(&key).await?,
            _ => CacheMetadata::default(),
        };
        if !validators.is_empty() {
            tracing::debug!("Revalidating {} with cached validators", url);
        }

        let response = match self
            .client
            .get(url)
            .headers(self.request_headers(&validators))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Ok(FetchResult::Failure(self.transport_failure(url, e))),
        };

        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            if let Some(cache) = cache {
                return self.not_modified(url, cache, &key, validators).await;
            }
        }

        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(FetchResult::Failure(Failure::feed_not_found(format!(
                "Feed not found (HTTP {})",
                status.as_u16()
            ))));
        }

        if !status.is_success() {
            tracing::warn!("Origin returned {} for {}", status, url);
            return Ok(FetchResult::Failure(Failure::feed_not_found(format!(
                "HTTP error: {}",
                status
            ))));
        }

        let etag = header_string(&response, ETAG);
        let last_modified = header_string(&response, LAST_MODIFIED);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(FetchResult::Failure(self.transport_failure(url, e))),
        };

        let parsed = match parse_feed(&body) {
            Ok(parsed) => parsed,
            Err(failure) => return Ok(FetchResult::Failure(failure)),
        };

        if let Some(cache) = cache {
            let data = CachedFeedData::new(parsed.feed.clone(), parsed.items.clone());
            cache.write_content(&key, &data, options.ttl_secs).await?;

            let metadata = CacheMetadata {
                etag: etag.clone(),
                last_modified: last_modified.clone(),
            };
            cache
                .write_metadata(&key, &metadata, options.ttl_secs)
                .await?;
        }

        tracing::info!("Fetched {} items from {}", parsed.items.len(), url);

        Ok(FetchResult::Success(FetchedFeed {
            feed: parsed.feed,
            items: parsed.items,
            etag,
            last_modified,
            cached: false,
        }))
    }
}
