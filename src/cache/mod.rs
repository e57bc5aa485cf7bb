//! Conditional cache for fetched feeds.
//!
//! Each origin URL owns three independently expiring sub-records:
//!
//! ```text
//! feed:<sha256(url)>:content        → CachedFeedData (JSON)
//! feed:<sha256(url)>:etag           → ETag header value
//! feed:<sha256(url)>:last_modified  → Last-Modified header value
//! ```
//!
//! Writes to the sub-records are not atomic with each other, so readers must
//! tolerate any combination of them being present.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use url::Url;

use crate::app::Result;
use crate::config::CacheConfig;
use crate::domain::{CacheMetadata, CachedFeedData};
use crate::store::{effective_ttl, KvStore};

/// Derive the cache key for a request URL.
///
/// The key is the hex SHA-256 of the normalized URL: 64 characters, stable
/// across processes and not reversible to the URL.
pub fn derive_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_url(url).as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical form of a URL for keying: scheme and host lower-cased, empty
/// path made `/`, fragment dropped. Unparsable input is only trimmed.
fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

fn content_key(key: &str) -> String {
    format!("feed:{}:content", key)
}

fn etag_key(key: &str) -> String {
    format!("feed:{}:etag", key)
}

fn last_modified_key(key: &str) -> String {
    format!("feed:{}:last_modified", key)
}

#[derive(Clone)]
pub struct FeedCache {
    store: Arc<dyn KvStore + Send + Sync>,
    config: CacheConfig,
}

impl FeedCache {
    pub fn new(store: Arc<dyn KvStore + Send + Sync>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.config.default_ttl_secs
    }

    fn ttl(&self, ttl_secs: Option<u64>) -> u64 {
        effective_ttl(
            self.store.as_ref(),
            ttl_secs.unwrap_or(self.config.default_ttl_secs),
        )
    }

    /// Read cached content for `key`.
    ///
    /// A missing record or one that no longer deserializes is a miss.
    pub async fn read_content(&self, key: &str) -> Result<Option<CachedFeedData>> {
        let Some(raw) = self.store.get(&content_key(key)).await? else {
            tracing::debug!("Cache miss for {}", key);
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                tracing::warn!("Discarding malformed cache entry {}: {}", key, e);
                Ok(None)
            }
        }
    }

    pub async fn read_metadata(&self, key: &str) -> Result<CacheMetadata> {
        let etag = self.store.get(&etag_key(key)).await?;
        let last_modified = self.store.get(&last_modified_key(key)).await?;
        Ok(CacheMetadata {
            etag,
            last_modified,
        })
    }

    /// Store `data` under the content sub-key, replacing any previous value.
    pub async fn write_content(
        &self,
        key: &str,
        data: &CachedFeedData,
        ttl_secs: Option<u64>,
    ) -> Result<()> {
        let raw = serde_json::to_string(data)?;
        self.store
            .put(&content_key(key), &raw, self.ttl(ttl_secs))
            .await
    }

    /// Store whichever validators are present; absent ones are left untouched.
    pub async fn write_metadata(
        &self,
        key: &str,
        metadata: &CacheMetadata,
        ttl_secs: Option<u64>,
    ) -> Result<()> {
        let ttl = self.ttl(ttl_secs);

        if let Some(ref etag) = metadata.etag {
            self.store.put(&etag_key(key), etag, ttl).await?;
        }
        if let Some(ref last_modified) = metadata.last_modified {
            self.store
                .put(&last_modified_key(key), last_modified, ttl)
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeedItem, FeedMetadata};
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn cache_with_store() -> (FeedCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = FeedCache::new(store.clone(), CacheConfig::default());
        (cache, store)
    }

    fn sample_data() -> CachedFeedData {
        let mut item = FeedItem::new("Item", "https://example.com/item");
        item.categories = vec!["rust".into(), "feeds".into()];
        item.published = Some("2024-01-01T00:00:00Z".parse().unwrap());
        CachedFeedData::new(
            FeedMetadata::new("Example", "https://example.com"),
            vec![item],
        )
    }

    #[test]
    fn test_derive_key_deterministic() {
        let k1 = derive_key("https://example.com/feed.xml");
        let k2 = derive_key("https://example.com/feed.xml");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_derive_key_different_urls() {
        let k1 = derive_key("https://example.com/feed.xml");
        let k2 = derive_key("https://example.com/feed.atom");
        let k3 = derive_key("https://other.com/feed.xml");
        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn test_derive_key_is_hex_sha256() {
        let key = derive_key("https://example.com/feed.xml");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!key.contains("example"));
    }

    #[test]
    fn test_derive_key_normalizes() {
        assert_eq!(
            derive_key("HTTPS://Example.COM"),
            derive_key("https://example.com/")
        );
        assert_eq!(
            derive_key("https://example.com/feed.xml#top"),
            derive_key(" https://example.com/feed.xml ")
        );
        assert_ne!(
            derive_key("https://example.com/feed.xml?page=1"),
            derive_key("https://example.com/feed.xml?page=2")
        );
    }

    #[tokio::test]
    async fn test_content_round_trip() {
        let (cache, _) = cache_with_store();
        let key = derive_key("https://example.com/feed.xml");
        let data = sample_data();

        cache.write_content(&key, &data, None).await.unwrap();
        let read = cache.read_content(&key).await.unwrap();

        assert_eq!(read, Some(data));
    }

    #[tokio::test]
    async fn test_read_content_missing() {
        let (cache, _) = cache_with_store();
        assert!(cache.read_content("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_content_is_a_miss() {
        let (cache, store) = cache_with_store();
        store
            .put(&content_key("k"), "{not json", 900)
            .await
            .unwrap();

        assert!(cache.read_content("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_metadata_fields_independent() {
        let (cache, _) = cache_with_store();

        let empty = cache.read_metadata("k").await.unwrap();
        assert!(empty.is_empty());

        let only_etag = CacheMetadata {
            etag: Some("\"v1\"".into()),
            last_modified: None,
        };
        cache.write_metadata("k", &only_etag, None).await.unwrap();

        let read = cache.read_metadata("k").await.unwrap();
        assert_eq!(read.etag, Some("\"v1\"".into()));
        assert_eq!(read.last_modified, None);
        assert!(cache.read_content("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_metadata_keeps_absent_fields() {
        let (cache, _) = cache_with_store();
        let both = CacheMetadata {
            etag: Some("\"v1\"".into()),
            last_modified: Some("Mon, 01 Jan 2024 00:00:00 GMT".into()),
        };
        cache.write_metadata("k", &both, None).await.unwrap();

        let etag_only = CacheMetadata {
            etag: Some("\"v2\"".into()),
            last_modified: None,
        };
        cache.write_metadata("k", &etag_only, None).await.unwrap();

        let read = cache.read_metadata("k").await.unwrap();
        assert_eq!(read.etag, Some("\"v2\"".into()));
        assert_eq!(
            read.last_modified,
            Some("Mon, 01 Jan 2024 00:00:00 GMT".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_expiry() {
        let (cache, _) = cache_with_store();
        let data = sample_data();
        cache.write_content("k", &data, None).await.unwrap();

        tokio::time::advance(Duration::from_secs(899)).await;
        assert!(cache.read_content("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.read_content("k").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_ttl_clamped_to_store_minimum() {
        let (cache, _) = cache_with_store();
        cache
            .write_content("k", &sample_data(), Some(5))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(cache.read_content("k").await.unwrap().is_some());
    }
}
