use async_trait::async_trait;

use crate::query::{Delegated, QueryBuilder, QueryValue, ScopeCommand};

use super::{Attributes, Columns, Page, Pagination, RecordId, RecordRef, RepositoryError, Result};

/// Gateway to the persisted records of one model.
#[async_trait]
pub trait Model: Send + Sync {
    type Record: Clone + Send + Sync + 'static;
    type Query: QueryBuilder<Record = Self::Record>;

    /// Stable type identity of the model, e.g. `"Task"`.
    fn name(&self) -> &str;

    /// Returns a fresh, unconstrained query.
    fn new_query(&self) -> Self::Query;

    /// Gets every record of the model.
    async fn all(&self, columns: &Columns) -> Result<Vec<Self::Record>>;

    /// Gets a record by its id.
    async fn find(&self, id: RecordId) -> Result<Option<Self::Record>>;

    /// Creates a new record.
    async fn create(&self, attributes: Attributes) -> Result<Self::Record>;

    /// Updates an existing record.
    async fn update(&self, record: &Self::Record, attributes: Attributes) -> Result<Self::Record>;

    /// Deletes an existing record. Returns `false` if it was already gone.
    async fn delete(&self, record: &Self::Record) -> Result<bool>;

    /// Deletes a record by id. Returns `false` if no record matched.
    async fn destroy(&self, id: RecordId) -> Result<bool>;
}

/// Uniform read/write contract with query-scope delegation.
///
/// Terminal reads (`get`, `paginate`) reset the scope; `all` ignores it.
#[async_trait]
pub trait RecordRepository: Send {
    type Record: Send + Sync + 'static;

    /// Gets every record, bypassing the current scope.
    async fn all(&mut self, columns: &Columns) -> Result<Vec<Self::Record>>;

    /// Runs the current scope and resets it.
    async fn get(&mut self, columns: &Columns) -> Result<Vec<Self::Record>>;

    /// Runs the current scope for one page and resets it.
    async fn paginate(
        &mut self,
        pagination: Pagination,
        columns: &Columns,
    ) -> Result<Page<Self::Record>>;

    async fn create(&mut self, attributes: Attributes) -> Result<Self::Record>;

    /// Updates a record. An id with no matching record is `NotFound`.
    async fn update(
        &mut self,
        target: RecordRef<Self::Record>,
        attributes: Attributes,
    ) -> Result<Self::Record>;

    /// Deletes a record. An id with no matching record returns `false`.
    async fn delete(&mut self, target: RecordRef<Self::Record>) -> Result<bool>;

    /// Forwards a call to the query.
    ///
    /// A call that produces a value resets the scope.
    async fn call(
        &mut self,
        command: ScopeCommand,
    ) -> Result<Delegated<QueryValue<Self::Record>>>;

    /// Discards the current scope.
    fn reset_scope(&mut self);

    /// Forwards a narrowing call and returns `self` for chaining.
    ///
    /// Fails with `UnexpectedValue` if the call produced a value instead.
    async fn scope(&mut self, command: ScopeCommand) -> Result<&mut Self>
    where
        Self: Sized,
    {
        let keyword = command.keyword();
        match self.call(command).await? {
            Delegated::Continue => Ok(self),
            Delegated::Value(_) => Err(RepositoryError::UnexpectedValue { command: keyword }),
        }
    }
}
