//! SQLite query builder.

use async_trait::async_trait;

use depo_core::query::{Clause, Delegated, QueryBuilder, QuerySpec, QueryValue, ScopeCommand};
use depo_core::storage::{Columns, Page, Pagination, Result, Row};

use super::model::SqliteModel;
use super::schema;

/// Query over a [`SqliteModel`], compiled to SQL when it runs.
#[derive(Clone)]
pub struct SqliteQuery {
    model: SqliteModel,
    spec: QuerySpec,
}

impl SqliteQuery {
    pub(super) fn new(model: SqliteModel) -> Self {
        Self {
            model,
            spec: QuerySpec::new(),
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    async fn first(&self) -> Result<Option<Row>> {
        let limit = self.spec.limit.map_or(1, |limit| limit.min(1));
        let rows = self
            .model
            .select(&self.spec, Some(limit), self.spec.offset)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn count(&self) -> Result<u64> {
        let statement = schema::count_rows(self.model.table(), &self.spec)?;
        self.model.fetch_count(statement).await
    }
}

#[async_trait]
impl QueryBuilder for SqliteQuery {
    type Record = Row;

    async fn apply(&mut self, command: &ScopeCommand) -> Result<Delegated<QueryValue<Row>>> {
        let clause = self
            .spec
            .apply(command, self.model.scopes(), self.model.name())?;

        let value = match clause {
            Clause::Constrained => return Ok(Delegated::Continue),
            Clause::Count => QueryValue::Count(self.count().await?),
            Clause::First => QueryValue::First(self.first().await?),
            Clause::Exists => QueryValue::Exists(self.first().await?.is_some()),
        };
        Ok(Delegated::Value(value))
    }

    async fn execute(self, columns: &Columns) -> Result<Vec<Row>> {
        let rows = self
            .model
            .select(&self.spec, self.spec.limit, self.spec.offset)
            .await?;
        Ok(rows.into_iter().map(|row| row.project(columns)).collect())
    }

    async fn paginate(self, pagination: Pagination, columns: &Columns) -> Result<Page<Row>> {
        let total = self
            .model
            .fetch_count(schema::count_filtered(self.model.table(), &self.spec)?)
            .await?;
        let rows = self
            .model
            .select(
                &self.spec,
                Some(pagination.per_page() as usize),
                Some(pagination.offset()),
            )
            .await?;

        let items = rows.into_iter().map(|row| row.project(columns)).collect();
        Ok(Page::new(items, total, pagination))
    }
}
