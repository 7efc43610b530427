//! Redis tagged cache implementation.
//!
//! Uses set-based key tracking for tag flushes without SCAN.
//! Every tag owns a Redis Set (`depo:tag:<tag>:_keys`) listing the
//! namespaced keys stored under it.
//!
//! # Non-Atomicity Safety
//!
//! `put` and `flush` are not atomic - they involve multiple Redis commands.
//! This is safe because:
//!
//! - **Orphaned entries in tracking set**: If a key is tracked but the
//!   entry expired or was never written, flushing simply deletes a key that
//!   does not exist.
//! - **Partial flush**: If a flush deletes some keys but fails before
//!   completing, the error is returned and a later flush finishes the cleanup.
//!
//! The worst case is temporary inconsistency, not data corruption or lost writes.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use depo_core::cache::{namespaced_key, tag_tracking_key, Result, TagSet, TaggedCache};

use super::error::map_redis_error;

/// Redis cache backend using connection manager for pooling.
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Creates a new Redis cache connection.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl TaggedCache for RedisCache {
    async fn get(&self, tags: &TagSet, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn
            .get(namespaced_key(tags, key))
            .await
            .map_err(map_redis_error)?;
        Ok(result)
    }

    async fn put(&self, tags: &TagSet, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = namespaced_key(tags, key);

        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(&key, value, seconds)
            .await
            .map_err(map_redis_error)?;

        for tag in tags.iter() {
            conn.sadd::<_, _, ()>(tag_tracking_key(tag), &key)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }

    async fn flush(&self, tags: &TagSet) -> Result<u64> {
        let mut conn = self.conn.clone();

        let mut tracked_keys = HashSet::new();
        for tag in tags.iter() {
            let keys: Vec<String> = conn
                .smembers(tag_tracking_key(tag))
                .await
                .map_err(map_redis_error)?;
            tracked_keys.extend(keys);
        }

        let mut removed = 0;
        if !tracked_keys.is_empty() {
            let keys: Vec<String> = tracked_keys.into_iter().collect();
            removed = conn.del(&keys).await.map_err(map_redis_error)?;
        }

        let tracking_keys: Vec<String> = tags.iter().map(tag_tracking_key).collect();
        if !tracking_keys.is_empty() {
            conn.del::<_, ()>(&tracking_keys)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(removed)
    }
}
