use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::app::{FeedwellError, Result};
use crate::cache::FeedCache;
use crate::fetcher::{FetchOptions, FetchResult, Fetcher};

pub const DEFAULT_WORKERS: usize = 10;

/// Runs independent feed fetches concurrently, at most `workers` at a time.
///
/// Results are returned in input order but fetches complete in any order;
/// distinct URLs share no cache entries.
pub struct ParallelFetcher {
    fetcher: Arc<dyn Fetcher>,
    semaphore: Arc<Semaphore>,
}

impl ParallelFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_workers(fetcher, DEFAULT_WORKERS)
    }

    pub fn with_workers(fetcher: Arc<dyn Fetcher>, workers: usize) -> Self {
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub async fn fetch_all(
        &self,
        urls: Vec<String>,
        cache: Option<FeedCache>,
        options: FetchOptions,
    ) -> Vec<(String, Result<FetchResult>)> {
        let handles = urls.into_iter().map(|url| {
            let fetcher = self.fetcher.clone();
            let semaphore = self.semaphore.clone();
            let cache = cache.clone();

            tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => fetcher.fetch(&url, cache.as_ref(), &options).await,
                    Err(e) => Err(FeedwellError::Other(format!("worker pool closed: {}", e))),
                };
                (url, result)
            })
        });

        let mut results = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::{CacheConfig, FetcherConfig};
    use crate::domain::{ErrorKind, Failure};
    use crate::fetcher::http_fetcher::HttpFetcher;
    use crate::store::MemoryStore;

    const RSS: &str = r#"<rss version="2.0"><channel>
  <title>Batch</title><link>https://example.com/</link>
  <item><title>One</title><link>https://example.com/1</link></item>
</channel></rss>"#;

    /// Counts how many fetches run at once.
    struct SlowFetcher {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(
            &self,
            url: &str,
            _cache: Option<&FeedCache>,
            _options: &FetchOptions,
        ) -> Result<FetchResult> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(FetchResult::Failure(Failure::feed_not_found(url.to_string())))
        }
    }

    #[tokio::test]
    async fn test_fetch_all_mixed_results() {
        let server = MockServer::start().await;
        Mock::given(path("/a.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .mount(&server)
            .await;
        Mock::given(path("/b.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher: Arc<dyn Fetcher> =
            Arc::new(HttpFetcher::new(FetcherConfig::default()).unwrap());
        let parallel = ParallelFetcher::with_workers(fetcher, 2);
        let cache = FeedCache::new(Arc::new(MemoryStore::new()), CacheConfig::default());

        let urls = vec![
            format!("{}/a.xml", server.uri()),
            format!("{}/b.xml", server.uri()),
        ];
        let results = parallel
            .fetch_all(urls.clone(), Some(cache), FetchOptions::default())
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, urls[0]);
        assert!(results[0].1.as_ref().unwrap().is_success());

        let failure = results[1].1.as_ref().unwrap().failure().unwrap();
        assert_eq!(failure.error, ErrorKind::FeedNotFound);
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_workers() {
        let slow = Arc::new(SlowFetcher {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let parallel = ParallelFetcher::with_workers(slow.clone(), 3);

        let urls = (0..10).map(|i| format!("https://example.com/{}", i)).collect();
        let results = parallel.fetch_all(urls, None, FetchOptions::default()).await;

        assert_eq!(results.len(), 10);
        assert!(slow.peak.load(Ordering::SeqCst) <= 3);
        assert!(slow.peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let slow = Arc::new(SlowFetcher {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let parallel = ParallelFetcher::new(slow);
        let results = parallel.fetch_all(Vec::new(), None, FetchOptions::default()).await;
        assert!(results.is_empty());
    }
}
