use std::time::Duration;

use async_trait::async_trait;

use super::{Result, TagSet};

/// Trait for tag-scoped cache stores.
///
/// Every value is stored under a key *and* a set of tags. Flushing a tag
/// removes every value that was stored with that tag, regardless of its key.
#[async_trait]
pub trait TaggedCache: Send + Sync {
    /// Gets a value stored under `key` within `tags`.
    ///
    /// Returns `None` for missing or expired entries.
    async fn get(&self, tags: &TagSet, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores a value under `key`, tagged with every tag in `tags`, expiring after `ttl`.
    async fn put(&self, tags: &TagSet, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Removes every value stored under any of `tags`.
    ///
    /// Returns the number of removed entries.
    async fn flush(&self, tags: &TagSet) -> Result<u64>;
}
