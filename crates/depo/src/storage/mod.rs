//! Storage backend implementations.
//!
//! This module provides the base [`Repository`], the [`cached`] decorator on
//! top of it, and concrete implementations of `depo_core::storage::Model`
//! selected via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): Rows kept in a `BTreeMap` behind a tokio `RwLock`
//! - `sqlite`: SQLite storage backend using `rusqlite` and `tokio-rusqlite`
//!
//! Both backends may be enabled together; the `depo` binary prefers SQLite
//! when it is available.
//!
//! # Examples
//!
//! Build with SQLite and Redis:
//! ```bash
//! cargo build -p depo --features sqlite,redis
//! ```

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!(
    "No storage backend selected. Enable 'inmemory' or 'sqlite' feature. \
    Example: cargo build -p depo --features sqlite"
);

pub mod cached;
mod repository;

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cached::{CacheOptions, CachingRepository};
pub use repository::Repository;
