//! SQLite storage backend implementation.
//!
//! This module provides a SQLite-based implementation of the `Model` and
//! `QueryBuilder` traits using `rusqlite` for synchronous operations and
//! `tokio-rusqlite` for async wrapping.

mod conversions;
mod error;
mod model;
mod query;
mod schema;

pub use model::SqliteModel;
pub use query::SqliteQuery;
