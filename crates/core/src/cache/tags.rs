use std::collections::BTreeSet;
use std::fmt;

/// An ordered, duplicate-free set of cache tags.
///
/// Ordering is lexicographic so the same tags always produce the same
/// namespace, whatever order they were supplied in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagSet {
    tags: BTreeSet<String>,
}

impl TagSet {
    /// Creates an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tag set holding a single tag.
    pub fn single(tag: impl Into<String>) -> Self {
        let mut tags = BTreeSet::new();
        tags.insert(tag.into());
        Self { tags }
    }

    /// Adds a tag. Returns `false` if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Joins the tags with `|`, the separator used in namespaced keys.
    pub fn joined(&self) -> String {
        self.tags.iter().cloned().collect::<Vec<_>>().join("|")
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.joined())
    }
}
