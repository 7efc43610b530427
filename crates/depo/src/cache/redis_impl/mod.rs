//! Redis cache backend implementation.
//!
//! Provides a distributed tagged cache using Redis for multi-process
//! deployments. Supports connection pooling, TTL and tag flushes.

mod cache;
mod error;

pub use cache::RedisCache;
