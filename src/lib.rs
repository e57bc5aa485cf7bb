//! # Feedwell
//!
//! Feed ingestion with an HTTP-conditional cache and per-client rate limiting.
//!
//! ## Architecture
//!
//! ```text
//! caller → RateLimiter → Fetcher → { FeedCache ↔ KvStore, origin HTTP }
//!                                 → Normalizer (fresh 200 bodies only)
//! ```
//!
//! - [`ratelimit`]: Fixed-window admission check over the key-value store
//! - [`fetcher`]: HTTP client with ETag/Last-Modified revalidation
//! - [`cache`]: Content-addressed cache entries with TTLs
//! - [`normalizer`]: Lenient RSS 2.0 / Atom parsing into a uniform item model
//! - [`store`]: Key-value substrate (in-memory or SQLite)
//!
//! ## Quick Start
//!
//! ```bash
//! # Fetch a feed through the cache
//! feedwell fetch https://blog.rust-lang.org/feed.xml
//!
//! # Parse a local document
//! feedwell parse ./feed.xml
//!
//! # Inspect a client's rate-limit window
//! feedwell limit some-client
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, cache, fetcher, rate limiter.
pub mod app;

/// Conditional cache store.
///
/// - [`derive_key`](cache::derive_key): SHA-256 cache key of a normalized URL
/// - [`FeedCache`](cache::FeedCache): content and ETag/Last-Modified records
pub mod cache;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/feedwell/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`FeedMetadata`](domain::FeedMetadata) and [`FeedItem`](domain::FeedItem)
/// - [`CachedFeedData`](domain::CachedFeedData) and [`CacheMetadata`](domain::CacheMetadata)
/// - [`Failure`](domain::Failure): stable error tag plus message
pub mod domain;

/// HTTP fetching with conditional request support.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`ParallelFetcher`](fetcher::parallel::ParallelFetcher): Concurrent fetching with semaphore
pub mod fetcher;

/// Feed parsing and normalization.
///
/// [`parse_feed`](normalizer::parse_feed) detects RSS or Atom and extracts
/// feed metadata and items.
pub mod normalizer;

/// Fixed-window rate limiting.
pub mod ratelimit;

/// Key-value stores.
///
/// - [`KvStore`](store::KvStore): `get`/`put` with TTL
/// - [`MemoryStore`](store::MemoryStore) and [`SqliteStore`](store::SqliteStore)
pub mod store;

pub use cache::{derive_key, FeedCache};
pub use domain::{ErrorKind, Failure};
pub use fetcher::{FetchResult, Fetcher};
pub use normalizer::{parse_feed, ParseResult};
pub use ratelimit::{check_rate_limit, increment_rate_limit, RateLimiter};
