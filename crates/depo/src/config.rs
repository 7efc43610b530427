use std::{env, time::Duration};

#[cfg(feature = "memory")]
use crate::cache::MemoryCache;

const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
const DEFAULT_SQLITE_PATH: &str = "depo.db";
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Runtime settings for the cache stores and storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Lifetime of cached reads, in seconds
    pub cache_ttl_seconds: u64,
    /// LRU capacity of the in-memory cache store
    pub cache_max_entries: usize,
    /// Database file used with the `sqlite` feature
    pub sqlite_path: String,
    /// Server used with the `redis` feature
    pub redis_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `CACHE_TTL_SECONDS` (default: 300)
    /// - `CACHE_MAX_ENTRIES` (default: 10,000)
    /// - `SQLITE_PATH` (default: "depo.db")
    /// - `REDIS_URL` (default: "redis://localhost:6379")
    ///
    /// Values that do not parse fall back to their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse().ok());

        Self {
            cache_ttl_seconds: parsed("CACHE_TTL_SECONDS").unwrap_or(DEFAULT_CACHE_TTL_SECONDS),
            cache_max_entries: parsed("CACHE_MAX_ENTRIES")
                .map(|v: u64| v as usize)
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string()),
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Builds the in-memory cache store sized by `cache_max_entries`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::OperationFailed` if `cache_max_entries` is 0.
    #[cfg(feature = "memory")]
    pub fn memory_cache(&self) -> depo_core::cache::Result<MemoryCache> {
        MemoryCache::new(self.cache_max_entries)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
