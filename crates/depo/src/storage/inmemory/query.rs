//! In-memory query builder.

use async_trait::async_trait;

use depo_core::query::{Clause, Delegated, QueryBuilder, QuerySpec, QueryValue, ScopeCommand};
use depo_core::storage::{Columns, Model, Page, Pagination, Result, Row};

use super::model::InMemoryModel;

/// Query over an [`InMemoryModel`], built up from scope calls.
#[derive(Debug, Clone)]
pub struct InMemoryQuery {
    model: InMemoryModel,
    spec: QuerySpec,
}

impl InMemoryQuery {
    pub(super) fn new(model: InMemoryModel) -> Self {
        Self {
            model,
            spec: QuerySpec::new(),
        }
    }

    /// The clauses applied so far.
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Matching rows with the limit/offset window applied.
    async fn windowed(&self) -> Vec<Row> {
        self.model
            .select(&self.spec)
            .await
            .into_iter()
            .skip(self.spec.offset.unwrap_or(0))
            .take(self.spec.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

#[async_trait]
impl QueryBuilder for InMemoryQuery {
    type Record = Row;

    async fn apply(&mut self, command: &ScopeCommand) -> Result<Delegated<QueryValue<Row>>> {
        let clause = self
            .spec
            .apply(command, self.model.scopes(), self.model.name())?;

        let value = match clause {
            Clause::Constrained => return Ok(Delegated::Continue),
            Clause::Count => QueryValue::Count(self.windowed().await.len() as u64),
            Clause::First => QueryValue::First(self.windowed().await.into_iter().next()),
            Clause::Exists => QueryValue::Exists(!self.windowed().await.is_empty()),
        };
        self.model.record_read();
        Ok(Delegated::Value(value))
    }

    async fn execute(self, columns: &Columns) -> Result<Vec<Row>> {
        self.model.record_read();
        Ok(self
            .windowed()
            .await
            .into_iter()
            .map(|row| row.project(columns))
            .collect())
    }

    async fn paginate(self, pagination: Pagination, columns: &Columns) -> Result<Page<Row>> {
        self.model.record_read();
        let rows = self.model.select(&self.spec).await;
        let total = rows.len() as u64;
        let items = rows
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.per_page() as usize)
            .map(|row| row.project(columns))
            .collect();
        Ok(Page::new(items, total, pagination))
    }
}
