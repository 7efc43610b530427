//! In-memory model implementation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use depo_core::query::{QuerySpec, ScopeRegistry};
use depo_core::storage::{Attributes, Columns, Model, RecordId, RepositoryError, Result, Row};

use super::eval;
use super::query::InMemoryQuery;

pub(super) const CREATED_AT: &str = "created_at";
pub(super) const UPDATED_AT: &str = "updated_at";

#[derive(Debug, Default)]
struct Table {
    rows: RwLock<BTreeMap<RecordId, Attributes>>,
    last_id: AtomicI64,
    reads: AtomicUsize,
}

/// In-memory storage backend for one model.
///
/// Rows live in a `BTreeMap` wrapped in `Arc<RwLock<_>>`; clones share the
/// same rows. Ids auto-increment from 1 and `created_at`/`updated_at` are
/// maintained on writes. Data is lost when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryModel {
    name: Arc<str>,
    table: Arc<Table>,
    scopes: ScopeRegistry,
}

impl InMemoryModel {
    /// Creates an empty model named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            table: Arc::new(Table::default()),
            scopes: ScopeRegistry::new(),
        }
    }

    /// Registers a named scope for queries on this model.
    pub fn with_scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(&mut QuerySpec, &[Value]) -> Result<()> + Send + Sync + 'static,
    {
        self.scopes = std::mem::take(&mut self.scopes).with_scope(name, scope);
        self
    }

    /// Replaces the named scopes of this model.
    pub fn with_scopes(mut self, scopes: ScopeRegistry) -> Self {
        self.scopes = scopes;
        self
    }

    pub(super) fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    /// Number of reads executed against this model so far.
    ///
    /// Every `all`, `find`, `get`, `paginate`, `count`, `first` and `exists`
    /// counts as one read. Writes are not counted.
    pub fn read_count(&self) -> usize {
        self.table.reads.load(Ordering::SeqCst)
    }

    pub(super) fn record_read(&self) {
        self.table.reads.fetch_add(1, Ordering::SeqCst);
    }

    /// Rows matching the filters of `spec`, ordered, before any window is applied.
    pub(super) async fn select(&self, spec: &QuerySpec) -> Vec<Row> {
        let rows = self.table.rows.read().await;
        let mut selected: Vec<Row> = rows
            .iter()
            .map(|(id, attributes)| Row {
                id: *id,
                attributes: attributes.clone(),
            })
            .filter(|row| eval::matches_all(spec, row))
            .collect();
        eval::sort_rows(&mut selected, &spec.orders);
        selected
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

#[async_trait]
impl Model for InMemoryModel {
    type Record = Row;
    type Query = InMemoryQuery;

    fn name(&self) -> &str {
        &self.name
    }

    fn new_query(&self) -> InMemoryQuery {
        InMemoryQuery::new(self.clone())
    }

    async fn all(&self, columns: &Columns) -> Result<Vec<Row>> {
        self.record_read();
        let rows = self.select(&QuerySpec::new()).await;
        Ok(rows.into_iter().map(|row| row.project(columns)).collect())
    }

    async fn find(&self, id: RecordId) -> Result<Option<Row>> {
        self.record_read();
        let rows = self.table.rows.read().await;
        Ok(rows.get(&id).map(|attributes| Row {
            id,
            attributes: attributes.clone(),
        }))
    }

    async fn create(&self, mut attributes: Attributes) -> Result<Row> {
        let timestamp = now();
        attributes
            .entry(CREATED_AT)
            .or_insert_with(|| timestamp.clone());
        attributes.entry(UPDATED_AT).or_insert(timestamp);

        let mut rows = self.table.rows.write().await;
        let id = self.table.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        rows.insert(id, attributes.clone());

        tracing::trace!(model = %self.name, id, "Row created");
        Ok(Row { id, attributes })
    }

    async fn update(&self, record: &Row, attributes: Attributes) -> Result<Row> {
        let mut rows = self.table.rows.write().await;
        let stored = rows
            .get_mut(&record.id)
            .ok_or_else(|| RepositoryError::NotFound {
                model: self.name.to_string(),
                id: record.id.to_string(),
            })?;

        let touched = !attributes.contains_key(UPDATED_AT);
        stored.extend(attributes);
        if touched {
            stored.insert(UPDATED_AT.to_string(), now());
        }

        tracing::trace!(model = %self.name, id = record.id, "Row updated");
        Ok(Row {
            id: record.id,
            attributes: stored.clone(),
        })
    }

    async fn delete(&self, record: &Row) -> Result<bool> {
        self.destroy(record.id).await
    }

    async fn destroy(&self, id: RecordId) -> Result<bool> {
        let removed = self.table.rows.write().await.remove(&id).is_some();
        tracing::trace!(model = %self.name, id, removed, "Row destroyed");
        Ok(removed)
    }
}
