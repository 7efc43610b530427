//! In-memory cache backend implementation.
//!
//! Provides a thread-safe tagged cache with TTL support and LRU eviction
//! for single-process deployments and tests.

mod cache;

pub use cache::{CacheStats, MemoryCache};
