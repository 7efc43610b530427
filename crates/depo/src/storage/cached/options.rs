use depo_core::cache::{slugify, TagSet};
use depo_core::storage::{RepositoryError, Result};

/// Cache namespace settings of a `CachingRepository`.
///
/// Unset or empty values fall back to defaults derived from the model name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Tag every cached read is stored under. Defaults to the slugged model name.
    pub primary_tag: Option<String>,
    /// Tags flushed on every write. Defaults to the primary tag alone.
    pub forget_tags: Option<Vec<String>>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primary_tag(mut self, tag: impl Into<String>) -> Self {
        self.primary_tag = Some(tag.into());
        self
    }

    pub fn with_forget_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forget_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Resolves the primary tag and the forget tags for `model`.
    pub(super) fn resolve(&self, model: &str) -> Result<(String, TagSet)> {
        let primary_tag = match self.primary_tag.as_deref() {
            Some(tag) if !tag.is_empty() => tag.to_string(),
            _ => slugify(model),
        };
        if primary_tag.trim().is_empty() {
            return Err(RepositoryError::Configuration(format!(
                "cannot derive a cache tag from model name {model:?}"
            )));
        }

        let forget_tags = match self.forget_tags.as_deref() {
            Some(tags) if !tags.is_empty() => {
                if tags.iter().any(|tag| tag.trim().is_empty()) {
                    return Err(RepositoryError::Configuration(
                        "forget tags must not be blank".to_string(),
                    ));
                }
                tags.iter().cloned().collect()
            }
            _ => TagSet::single(primary_tag.clone()),
        };

        Ok((primary_tag, forget_tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_derive_from_model_name() {
        let (primary, forget) = CacheOptions::new().resolve("Blog Post").unwrap();

        assert_eq!(primary, "blog-post");
        assert_eq!(forget, TagSet::single("blog-post"));
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let options = CacheOptions::new()
            .with_primary_tag("")
            .with_forget_tags(Vec::<String>::new());

        let (primary, forget) = options.resolve("Task").unwrap();

        assert_eq!(primary, "task");
        assert_eq!(forget, TagSet::single("task"));
    }

    #[test]
    fn test_explicit_tags() {
        let options = CacheOptions::new()
            .with_primary_tag("tasks")
            .with_forget_tags(["tasks", "dashboard"]);

        let (primary, forget) = options.resolve("Task").unwrap();

        assert_eq!(primary, "tasks");
        assert!(forget.contains("tasks"));
        assert!(forget.contains("dashboard"));
    }

    #[test]
    fn test_unsluggable_model_name_is_configuration_error() {
        let result = CacheOptions::new().resolve("!!!");

        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
    }

    #[test]
    fn test_blank_forget_tag_is_configuration_error() {
        let result = CacheOptions::new()
            .with_forget_tags(["task", " "])
            .resolve("Task");

        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
    }

    #[test]
    fn test_blank_primary_tag_is_configuration_error() {
        let result = CacheOptions::new().with_primary_tag("   ").resolve("Task");

        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
    }
}
