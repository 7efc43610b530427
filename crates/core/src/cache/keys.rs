//! Cache key protocol.
//!
//! A terminal read is cached under `sha256(prefix + "." + trail)` where the
//! prefix names the operation and its parameters and the trail is the
//! ordered list of narrowing calls made before it. Pure functions, no I/O.

use sha2::{Digest, Sha256};

use crate::storage::{Columns, Pagination};

use super::{KeywordTrail, TagSet};

/// Namespace shared by every key written by this crate's cache stores.
pub const KEY_NAMESPACE: &str = "depo";

/// Returns the operation prefix for `get`.
pub fn get_prefix(columns: &Columns) -> String {
    format!("get[{columns}]")
}

/// Returns the operation prefix for `paginate`.
///
/// Pagination parameters live in the prefix, never in the trail.
pub fn paginate_prefix(pagination: Pagination, columns: &Columns) -> String {
    format!(
        "paginate({},{})[{columns}]",
        pagination.per_page(),
        pagination.page()
    )
}

/// Returns the operation prefix for `all`.
pub fn all_prefix(columns: &Columns) -> String {
    format!("all[{columns}]")
}

/// Concatenates a prefix and a trail into the string that gets hashed.
pub fn compose_key(prefix: &str, trail: &KeywordTrail) -> String {
    format!("{prefix}.{}", trail.joined())
}

/// Returns the lowercase hex SHA-256 digest of `input`.
pub fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Returns the cache key for a terminal read with the given prefix and trail.
///
/// # Examples
///
/// ```
/// use depo_core::cache::{cache_key, get_prefix, KeywordTrail};
/// use depo_core::storage::Columns;
///
/// let trail: KeywordTrail = ["completed."].into_iter().collect();
/// let key = cache_key(&get_prefix(&Columns::All), &trail);
///
/// assert_eq!(key.len(), 64);
/// assert_eq!(key, cache_key("get[*]", &trail));
/// ```
pub fn cache_key(prefix: &str, trail: &KeywordTrail) -> String {
    digest(&compose_key(prefix, trail))
}

/// Returns the cache key for `all`, which never depends on a trail.
pub fn all_key(columns: &Columns) -> String {
    digest(&all_prefix(columns))
}

/// Turns a model name into a URL-safe tag.
///
/// ASCII letters and digits are lowercased, runs of whitespace, `-` and `_`
/// collapse into a single `-`, and every other character is dropped.
///
/// ```
/// use depo_core::cache::slugify;
///
/// assert_eq!(slugify("Task"), "task");
/// assert_eq!(slugify("Blog Post"), "blog-post");
/// assert_eq!(slugify("app::Task_Item"), "apptask-item");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = true;
        }
    }

    slug
}

/// Returns the key a cache store writes a tagged value under.
pub fn namespaced_key(tags: &TagSet, key: &str) -> String {
    format!("{KEY_NAMESPACE}:{}:{key}", tags.joined())
}

/// Returns the key of the set tracking every namespaced key stored under `tag`.
///
/// Flushing a tag reads this set instead of scanning the key space.
pub fn tag_tracking_key(tag: &str) -> String {
    format!("{KEY_NAMESPACE}:tag:{tag}:_keys")
}
