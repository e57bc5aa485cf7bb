use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{FeedwellError, Result};
use crate::cache::FeedCache;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::parallel::ParallelFetcher;
use crate::fetcher::Fetcher;
use crate::ratelimit::RateLimiter;
use crate::store::{KvStore, MemoryStore, SqliteStore};

pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn KvStore + Send + Sync>,
    pub cache: FeedCache,
    pub fetcher: Arc<dyn Fetcher>,
    pub parallel_fetcher: ParallelFetcher,
    pub rate_limiter: RateLimiter,
}

impl AppContext {
    /// Build a context persisting to SQLite at `config.store.path`, or the
    /// platform data directory when unset.
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match config.store.path {
            Some(ref p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = SqliteStore::new(&db_path)?.with_min_ttl(config.store.min_ttl_secs);
        Self::with_store(config, Arc::new(store))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = MemoryStore::with_min_ttl(config.store.min_ttl_secs);
        Self::with_store(config, Arc::new(store))
    }

    pub fn with_store(config: Config, store: Arc<dyn KvStore + Send + Sync>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(config.fetcher.clone())?);
        let parallel_fetcher = ParallelFetcher::with_workers(fetcher.clone(), config.fetcher.workers);
        let cache = FeedCache::new(store.clone(), config.cache.clone());
        let rate_limiter = RateLimiter::new(store.clone(), config.rate_limit.clone());

        Ok(Self {
            config,
            store,
            cache,
            fetcher,
            parallel_fetcher,
            rate_limiter,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| FeedwellError::Config("Could not find data directory".into()))?;
        let feedwell_dir = data_dir.join("feedwell");
        std::fs::create_dir_all(&feedwell_dir)?;
        Ok(feedwell_dir.join("feedwell.db"))
    }
}
