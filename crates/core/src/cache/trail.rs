use std::fmt;

/// Ordered record of the narrowing calls made since the last scope reset.
///
/// Each keyword is `name.args` as rendered by [`crate::query::ScopeCommand::keyword`].
/// A keyword that is already present is not appended again, so repeating a
/// call does not change the resulting cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTrail {
    keywords: Vec<String>,
}

impl KeywordTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `keyword` unless an identical one was already recorded.
    ///
    /// Returns `true` when the trail changed.
    pub fn push(&mut self, keyword: impl Into<String>) -> bool {
        let keyword = keyword.into();
        if self.keywords.contains(&keyword) {
            return false;
        }
        self.keywords.push(keyword);
        true
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|recorded| recorded == keyword)
    }

    pub fn clear(&mut self) {
        self.keywords.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }

    /// Joins the keywords with `.` in call order.
    pub fn joined(&self) -> String {
        self.keywords.join(".")
    }
}

impl<S: Into<String>> FromIterator<S> for KeywordTrail {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut trail = Self::new();
        for keyword in iter {
            trail.push(keyword);
        }
        trail
    }
}

impl fmt::Display for KeywordTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}
