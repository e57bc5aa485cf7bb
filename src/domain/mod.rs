pub mod failure;
pub mod feed;
pub mod item;

pub use failure::{ErrorKind, Failure};
pub use feed::{CacheMetadata, CachedFeedData, FeedMetadata};
pub use item::FeedItem;
