//! Repository layer with tag-invalidated query caching.
//!
//! [`storage::Repository`] wraps a [`depo_core::storage::Model`] with a
//! resettable query scope. [`storage::cached::CachingRepository`] decorates it,
//! caching terminal reads under keys derived from the chain of scope calls and
//! flushing the model's cache tags on every write.

pub mod cache;
pub mod config;
pub mod demo;
pub mod storage;
