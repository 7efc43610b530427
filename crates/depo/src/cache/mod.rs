//! Cache backend implementations.
//!
//! This module provides concrete implementations of the
//! `depo_core::cache::TaggedCache` trait, selected via feature flags, plus
//! the [`remember`] get-or-compute helper shared by every backend.
//!
//! # Feature Flags
//!
//! - `memory` (default): In-memory cache using tokio synchronization primitives
//! - `redis`: Redis cache using the redis crate

#[cfg(not(any(feature = "memory", feature = "redis")))]
compile_error!(
    "No cache backend selected. Enable 'memory' or 'redis' feature. \
    Example: cargo build -p depo --features memory"
);

mod remember;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

pub use remember::remember;

#[cfg(feature = "memory")]
pub use memory::{CacheStats, MemoryCache};

#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;
