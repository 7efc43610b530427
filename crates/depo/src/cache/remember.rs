//! Get-or-compute over a tagged cache.

use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use depo_core::cache::{deserialize_value, serialize_value, CacheError, TagSet, TaggedCache};
use depo_core::storage::Result;

/// Returns the value cached under `key` within `tags`, or computes and stores it.
///
/// Cache failures are returned as `CacheUnavailable`; the value is never
/// computed as a fallback for an unreachable store. A stored value that no
/// longer deserializes is treated as a miss and overwritten.
///
/// `compute` is only polled on a miss.
pub async fn remember<C, T, F>(
    cache: &C,
    tags: &TagSet,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<T>
where
    C: TaggedCache + ?Sized,
    T: Serialize + DeserializeOwned + Send,
    F: Future<Output = Result<T>> + Send,
{
    if let Some(bytes) = cache.get(tags, key).await? {
        match deserialize_value(&bytes) {
            Ok(value) => {
                tracing::trace!(%key, %tags, "Cache hit");
                return Ok(value);
            }
            Err(err) => {
                tracing::warn!(%key, %tags, error = %err, "Cached value deserialization failed");
            }
        }
    }

    tracing::trace!(%key, %tags, "Cache miss");
    let value = compute.await?;

    let bytes = serialize_value(&value).map_err(CacheError::from)?;
    cache.put(tags, key, &bytes, ttl).await?;

    Ok(value)
}
