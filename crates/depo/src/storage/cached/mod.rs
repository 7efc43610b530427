//! Caching decorator over the base repository.
//!
//! [`CachingRepository`] records scope calls as keywords and caches terminal
//! reads under tag-scoped keys. [`CacheOptions`] names the tags it reads and
//! flushes.

mod options;
mod repository;

pub use options::CacheOptions;
pub use repository::CachingRepository;
