pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::app::Result;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// The narrow key-value capability the ingestion core relies on.
///
/// Stores are eventually consistent and offer no transactions: two `put`s are
/// never atomic with respect to each other. Expired entries read as absent.
#[async_trait]
pub trait KvStore {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Smallest TTL this store honours.
    fn min_ttl_secs(&self) -> u64 {
        60
    }
}

/// Raise `ttl_secs` to the store's minimum granularity.
pub fn effective_ttl(store: &(dyn KvStore + Send + Sync), ttl_secs: u64) -> u64 {
    ttl_secs.max(store.min_ttl_secs())
}
