//! In-memory storage backend.
//!
//! This module provides an in-memory implementation of the `Model` and
//! `QueryBuilder` traits that stores rows in a `BTreeMap` wrapped in
//! `Arc<RwLock<_>>`. This is useful for testing and development scenarios
//! where persistence is not required.
//!
//! # Example
//!
//! ```rust
//! use depo::storage::inmemory::InMemoryModel;
//! use depo_core::query::Filter;
//!
//! let tasks = InMemoryModel::new("Task").with_scope("completed", |spec, _| {
//!     spec.push_filter(Filter::eq("completed", true));
//!     Ok(())
//! });
//! assert_eq!(tasks.read_count(), 0);
//! ```

mod eval;
mod model;
mod query;

pub use model::InMemoryModel;
pub use query::InMemoryQuery;
