//! In-memory tagged cache with LRU eviction.
//!
//! Provides a thread-safe in-memory cache with TTL support using
//! tokio synchronization primitives and LRU eviction policy.
//!
//! This implementation mirrors the Redis cache behavior for consistency:
//! - Values are stored under `depo:<tags>:<key>`
//! - Every tag tracks the keys stored under it
//! - Flushing a tag removes exactly the tracked keys

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use depo_core::cache::{namespaced_key, CacheError, Result, TagSet, TaggedCache};

/// A single cache entry with its expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Returns true if this entry has expired.
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Hit/miss counters of a [`MemoryCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// In-memory cache implementation with LRU eviction.
///
/// Thread-safe cache using `Arc<RwLock<LruCache>>` for concurrent access.
/// Supports TTL with lazy expiration (entries are cleaned up on access).
/// Uses LRU eviction to limit memory usage when max_entries is reached.
///
/// Keys evicted by the LRU stay referenced in the tag tracking sets until
/// the tag is flushed, which only costs a no-op removal.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    /// Main key-value store with LRU eviction.
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
    /// Maps tag -> set of namespaced keys stored under it.
    tracking: Arc<RwLock<HashMap<String, HashSet<String>>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl MemoryCache {
    /// Creates a new in-memory cache with LRU eviction.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::OperationFailed` if `max_entries` is 0.
    pub fn new(max_entries: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(max_entries).ok_or_else(|| {
            CacheError::OperationFailed("max_entries must be greater than 0".to_string())
        })?;
        Ok(Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
            tracking: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Returns the current hit/miss counters and entry count.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.store.read().await.len(),
        }
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl TaggedCache for MemoryCache {
    async fn get(&self, tags: &TagSet, key: &str) -> Result<Option<Vec<u8>>> {
        let key = namespaced_key(tags, key);
        let mut store = self.store.write().await;

        let (value, expired) = match store.get(&key) {
            Some(entry) if entry.is_expired() => (None, true),
            Some(entry) => (Some(entry.value.clone()), false),
            None => (None, false),
        };
        if expired {
            store.pop(&key);
        }

        self.record(value.is_some());
        Ok(value)
    }

    async fn put(&self, tags: &TagSet, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let key = namespaced_key(tags, key);

        // Lock order: tracking, then store
        let mut tracking = self.tracking.write().await;
        let mut store = self.store.write().await;

        for tag in tags.iter() {
            tracking
                .entry(tag.to_string())
                .or_default()
                .insert(key.clone());
        }
        store.put(key, CacheEntry::new(value.to_vec(), ttl));

        Ok(())
    }

    async fn flush(&self, tags: &TagSet) -> Result<u64> {
        let mut tracking = self.tracking.write().await;
        let tracked_keys: HashSet<String> = tags
            .iter()
            .filter_map(|tag| tracking.remove(tag))
            .flatten()
            .collect();

        if tracked_keys.is_empty() {
            return Ok(0);
        }

        // Held with the tracking lock so no put lands between the two
        let mut store = self.store.write().await;
        let removed = tracked_keys
            .iter()
            .filter(|key| store.pop(*key).is_some())
            .count();

        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn tags(names: &[&str]) -> TagSet {
        names.iter().copied().collect()
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(matches!(
            MemoryCache::new(0),
            Err(CacheError::OperationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = MemoryCache::new(100).unwrap();
        let tasks = tags(&["tasks"]);

        cache.put(&tasks, "key1", b"value1", TTL).await.unwrap();

        let result = cache.get(&tasks, "key1").await.unwrap();
        assert_eq!(result, Some(b"value1".to_vec()));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let cache = MemoryCache::new(100).unwrap();

        let result = cache.get(&tags(&["tasks"]), "nonexistent").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_same_key_under_different_tags() {
        let cache = MemoryCache::new(100).unwrap();

        cache.put(&tags(&["tasks"]), "k", b"tasks", TTL).await.unwrap();
        cache.put(&tags(&["projects"]), "k", b"projects", TTL).await.unwrap();

        assert_eq!(
            cache.get(&tags(&["tasks"]), "k").await.unwrap(),
            Some(b"tasks".to_vec())
        );
        assert_eq!(
            cache.get(&tags(&["projects"]), "k").await.unwrap(),
            Some(b"projects".to_vec())
        );
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = MemoryCache::new(100).unwrap();
        let tasks = tags(&["tasks"]);

        cache
            .put(&tasks, "expiring", b"value", Duration::from_millis(10))
            .await
            .unwrap();
        assert!(cache.get(&tasks, "expiring").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(cache.get(&tasks, "expiring").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flush_removes_only_tagged_entries() {
        let cache = MemoryCache::new(100).unwrap();
        let tasks = tags(&["tasks"]);
        let projects = tags(&["projects"]);

        cache.put(&tasks, "a", b"1", TTL).await.unwrap();
        cache.put(&tasks, "b", b"2", TTL).await.unwrap();
        cache.put(&projects, "c", b"3", TTL).await.unwrap();

        let removed = cache.flush(&tasks).await.unwrap();

        assert_eq!(removed, 2);
        assert!(cache.get(&tasks, "a").await.unwrap().is_none());
        assert!(cache.get(&tasks, "b").await.unwrap().is_none());
        assert!(cache.get(&projects, "c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_flush_any_tag_of_multi_tagged_entry() {
        let cache = MemoryCache::new(100).unwrap();
        let both = tags(&["tasks", "dashboard"]);

        cache.put(&both, "summary", b"1", TTL).await.unwrap();

        let removed = cache.flush(&tags(&["dashboard"])).await.unwrap();

        assert_eq!(removed, 1);
        assert!(cache.get(&both, "summary").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flush_unknown_tag_is_noop() {
        let cache = MemoryCache::new(100).unwrap();

        assert_eq!(cache.flush(&tags(&["nothing"])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_flush_after_eviction() {
        let cache = MemoryCache::new(1).unwrap();
        let tasks = tags(&["tasks"]);

        cache.put(&tasks, "a", b"1", TTL).await.unwrap();
        cache.put(&tasks, "b", b"2", TTL).await.unwrap();

        // "a" was evicted, only "b" is left to remove
        assert_eq!(cache.flush(&tasks).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stats_count_hits_and_misses() {
        let cache = MemoryCache::new(100).unwrap();
        let tasks = tags(&["tasks"]);

        cache.get(&tasks, "k").await.unwrap();
        cache.put(&tasks, "k", b"v", TTL).await.unwrap();
        cache.get(&tasks, "k").await.unwrap();
        cache.get(&tasks, "k").await.unwrap();

        assert_eq!(
            cache.stats().await,
            CacheStats {
                hits: 2,
                misses: 1,
                entries: 1,
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_put_and_flush_never_strand_a_value() {
        let cache = MemoryCache::new(100).unwrap();
        let tasks = tags(&["tasks"]);
        let stored = namespaced_key(&tasks, "k");

        for _ in 0..200 {
            let writer = {
                let cache = cache.clone();
                let tasks = tasks.clone();
                tokio::spawn(async move { cache.put(&tasks, "k", b"v", TTL).await })
            };
            let flusher = {
                let cache = cache.clone();
                let tasks = tasks.clone();
                tokio::spawn(async move { cache.flush(&tasks).await })
            };
            writer.await.unwrap().unwrap();
            let removed = flusher.await.unwrap().unwrap();

            // Either the flush ran first and the value is tracked,
            // or it ran second and removed it
            let present = cache.store.read().await.contains(&stored);
            let tracked = cache
                .tracking
                .read()
                .await
                .get("tasks")
                .is_some_and(|keys| keys.contains(&stored));
            assert_eq!(present, tracked);
            assert!(removed == 1 || present);

            cache.flush(&tasks).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cache = MemoryCache::new(100).unwrap();
        let clone = cache.clone();
        let tasks = tags(&["tasks"]);

        cache.put(&tasks, "k", b"v", TTL).await.unwrap();

        assert!(clone.get(&tasks, "k").await.unwrap().is_some());
    }
}
