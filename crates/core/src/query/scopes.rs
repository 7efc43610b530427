use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::storage::Result;

use super::QuerySpec;

/// A named scope: narrows a [`QuerySpec`] using the call's arguments.
pub type ScopeFn = Arc<dyn Fn(&mut QuerySpec, &[Value]) -> Result<()> + Send + Sync>;

/// Named scopes a model understands beyond the built-in clauses.
///
/// ```
/// use depo_core::query::{Filter, ScopeRegistry};
///
/// let scopes = ScopeRegistry::new()
///     .with_scope("completed", |spec, _| {
///         spec.push_filter(Filter::eq("completed", true));
///         Ok(())
///     });
///
/// assert!(scopes.contains("completed"));
/// ```
#[derive(Clone, Default)]
pub struct ScopeRegistry {
    scopes: HashMap<String, ScopeFn>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a named scope.
    ///
    /// Names containing `.` are refused when the scope is applied.
    pub fn with_scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(&mut QuerySpec, &[Value]) -> Result<()> + Send + Sync + 'static,
    {
        self.scopes.insert(name.into(), Arc::new(scope));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ScopeFn> {
        self.scopes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    /// Registered scope names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scopes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("scopes", &self.names())
            .finish()
    }
}
