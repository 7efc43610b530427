//! Contracts and pure functions for the depo repository layer.
//!
//! This crate holds everything that does not perform I/O: record and query
//! types, the repository/model/cache traits, error enums, and the cache-key
//! protocol used by the caching decorator.

pub mod cache;
pub mod query;
pub mod storage;
