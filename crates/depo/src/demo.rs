//! Task fixtures used by the `depo demo` command and the tests.

use serde_json::Value;

use depo_core::query::{Filter, ScopeRegistry};
use depo_core::storage::{Attributes, Model, Result};

/// Name of the demo model.
pub const TASK_MODEL: &str = "Task";

/// Builds an attribute map from `(column, value)` pairs.
pub fn attributes<I, K>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs
        .into_iter()
        .map(|(column, value)| (column.into(), value))
        .collect()
}

/// Named scopes of the task model: `completed` and `inProgress`.
pub fn task_scopes() -> ScopeRegistry {
    ScopeRegistry::new()
        .with_scope("completed", |spec, _| {
            spec.push_filter(Filter::eq("completed", true));
            Ok(())
        })
        .with_scope("inProgress", |spec, _| {
            spec.push_filter(Filter::eq("completed", false));
            Ok(())
        })
}

/// An empty in-memory task model with the task scopes registered.
#[cfg(feature = "inmemory")]
pub fn task_model() -> crate::storage::inmemory::InMemoryModel {
    crate::storage::inmemory::InMemoryModel::new(TASK_MODEL).with_scopes(task_scopes())
}

/// Attributes of one demo task.
pub fn task(title: impl Into<String>, completed: bool) -> Attributes {
    attributes([
        ("title", Value::String(title.into())),
        ("completed", Value::Bool(completed)),
    ])
}

/// Inserts `completed` finished tasks followed by `in_progress` open ones.
pub async fn seed_tasks<M: Model>(model: &M, completed: usize, in_progress: usize) -> Result<()> {
    for n in 1..=completed {
        model.create(task(format!("Completed task {n}"), true)).await?;
    }
    for n in 1..=in_progress {
        model
            .create(task(format!("Task in progress {n}"), false))
            .await?;
    }
    tracing::debug!(model = model.name(), completed, in_progress, "Seeded tasks");
    Ok(())
}
