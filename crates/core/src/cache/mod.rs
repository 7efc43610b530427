mod error;
mod keys;
mod serialization;
mod tags;
mod trail;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{
    all_key, all_prefix, cache_key, compose_key, digest, get_prefix, namespaced_key,
    paginate_prefix, slugify, tag_tracking_key, KEY_NAMESPACE,
};
pub use serialization::{deserialize_value, serialize_value, SerializationError};
pub use tags::TagSet;
pub use trail::KeywordTrail;
pub use traits::TaggedCache;
