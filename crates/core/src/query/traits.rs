use async_trait::async_trait;

use crate::storage::{Columns, Page, Pagination, Result};

use super::{Delegated, QueryValue, ScopeCommand};

/// A mutable query handle bound to one model.
///
/// Narrowing calls arrive through [`QueryBuilder::apply`]; the terminal
/// reads consume the builder.
#[async_trait]
pub trait QueryBuilder: Send + Sync + Sized {
    type Record: Send + Sync;

    /// Applies a forwarded call.
    ///
    /// Returns `Delegated::Continue` when the call narrowed the query and
    /// `Delegated::Value` when it produced a terminal value. A failed call
    /// leaves the builder unchanged.
    async fn apply(
        &mut self,
        command: &ScopeCommand,
    ) -> Result<Delegated<QueryValue<Self::Record>>>;

    /// Runs the query and returns every matching record.
    async fn execute(self, columns: &Columns) -> Result<Vec<Self::Record>>;

    /// Runs the query for a single page of results.
    async fn paginate(
        self,
        pagination: Pagination,
        columns: &Columns,
    ) -> Result<Page<Self::Record>>;
}
