use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::app::Result;
use crate::store::KvStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process store with per-entry expiry.
///
/// Expired entries are evicted on read of that key and swept on every write.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    min_ttl_secs: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_min_ttl(60)
    }

    pub fn with_min_ttl(min_ttl_secs: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            min_ttl_secs,
        }
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let ttl = Duration::from_secs(ttl_secs.max(self.min_ttl_secs));
        let now = Instant::now();
        let entry = Entry {
            value: value.to_string(),
            expires_at: now + ttl,
        };

        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn min_ttl_secs(&self) -> u64 {
        self.min_ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        store.put("a", "1", 60).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some("1".into()));
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryStore::new();
        store.put("a", "1", 60).await.unwrap();
        store.put("a", "2", 60).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some("2".into()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires() {
        let store = MemoryStore::new();
        store.put("a", "1", 60).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get("a").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_sweeps_expired_entries() {
        let store = MemoryStore::new();
        for i in 0..1000 {
            store.put(&format!("old:{}", i), "v", 60).await.unwrap();
        }

        tokio::time::advance(Duration::from_secs(3600)).await;
        store.put("new", "v", 60).await.unwrap();

        let entries = store.entries.lock().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_keeps_live_entries() {
        let store = MemoryStore::new();
        store.put("long", "v", 900).await.unwrap();
        store.put("short", "v", 60).await.unwrap();

        tokio::time::advance(Duration::from_secs(120)).await;
        store.put("new", "v", 60).await.unwrap();

        let entries = store.entries.lock().await;
        assert_eq!(entries.len(), 2);
        assert!(entries.contains_key("long"));
        assert!(!entries.contains_key("short"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_raised_to_minimum() {
        let store = MemoryStore::with_min_ttl(60);
        store.put("a", "1", 1).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(store.get("a").await.unwrap().is_some());
    }
}
