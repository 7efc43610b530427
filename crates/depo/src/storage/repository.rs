//! Base repository over a [`Model`].
//!
//! Owns one query per model and swaps in a fresh one after every terminal
//! read, so each chain of scope calls starts from the unconstrained query.

use std::mem;

use async_trait::async_trait;

use depo_core::query::{Delegated, QueryBuilder, QueryValue, ScopeCommand};
use depo_core::storage::{
    Attributes, Columns, Model, Page, Pagination, RecordRef, RecordRepository, RepositoryError,
    Result,
};

/// Repository bound to one model.
pub struct Repository<M: Model> {
    model: M,
    query: M::Query,
    bound_model: String,
}

impl<M: Model> Repository<M> {
    /// Creates a repository bound to the model's own name.
    pub fn new(model: M) -> Self {
        let bound_model = model.name().to_string();
        let query = model.new_query();
        Self {
            model,
            query,
            bound_model,
        }
    }

    /// Creates a repository that only accepts a model named `expected`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ModelMismatch` if the model has another name.
    pub fn bind(model: M, expected: impl Into<String>) -> Result<Self> {
        let expected = expected.into();
        if model.name() != expected {
            return Err(RepositoryError::ModelMismatch {
                expected,
                found: model.name().to_string(),
            });
        }
        Ok(Self::new(model))
    }

    /// Name of the model this repository is bound to.
    pub fn repository_model(&self) -> &str {
        &self.bound_model
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// The query the next terminal read will run.
    pub fn query(&self) -> &M::Query {
        &self.query
    }

    /// Takes the current query, leaving a fresh one in its place.
    fn take_query(&mut self) -> M::Query {
        mem::replace(&mut self.query, self.model.new_query())
    }
}

#[async_trait]
impl<M> RecordRepository for Repository<M>
where
    M: Model + 'static,
{
    type Record = M::Record;

    async fn all(&mut self, columns: &Columns) -> Result<Vec<M::Record>> {
        self.model.all(columns).await
    }

    async fn get(&mut self, columns: &Columns) -> Result<Vec<M::Record>> {
        let query = self.take_query();
        query.execute(columns).await
    }

    async fn paginate(
        &mut self,
        pagination: Pagination,
        columns: &Columns,
    ) -> Result<Page<M::Record>> {
        let query = self.take_query();
        query.paginate(pagination, columns).await
    }

    async fn create(&mut self, attributes: Attributes) -> Result<M::Record> {
        self.model.create(attributes).await
    }

    async fn update(
        &mut self,
        target: RecordRef<M::Record>,
        attributes: Attributes,
    ) -> Result<M::Record> {
        let record = match target {
            RecordRef::Record(record) => record,
            RecordRef::Id(id) => {
                self.model
                    .find(id)
                    .await?
                    .ok_or_else(|| RepositoryError::NotFound {
                        model: self.bound_model.clone(),
                        id: id.to_string(),
                    })?
            }
        };
        self.model.update(&record, attributes).await
    }

    async fn delete(&mut self, target: RecordRef<M::Record>) -> Result<bool> {
        match target {
            RecordRef::Record(record) => self.model.delete(&record).await,
            RecordRef::Id(id) => self.model.destroy(id).await,
        }
    }

    async fn call(&mut self, command: ScopeCommand) -> Result<Delegated<QueryValue<M::Record>>> {
        let outcome = self.query.apply(&command).await?;
        if let Delegated::Value(_) = outcome {
            self.reset_scope();
        }
        Ok(outcome)
    }

    fn reset_scope(&mut self) {
        self.query = self.model.new_query();
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::demo::{attributes, task_model};
    use crate::storage::inmemory::InMemoryModel;

    async fn seeded() -> InMemoryModel {
        let model = task_model();
        for (title, completed) in [("Write docs", true), ("Ship it", false), ("Review", false)] {
            model
                .create(attributes([("title", json!(title)), ("completed", json!(completed))]))
                .await
                .unwrap();
        }
        model
    }

    #[tokio::test]
    async fn test_new_binds_model_name() {
        let repository = Repository::new(task_model());

        assert_eq!(repository.repository_model(), "Task");
    }

    #[tokio::test]
    async fn test_bind_rejects_other_model() {
        let result = Repository::bind(InMemoryModel::new("Project"), "Task");

        assert_eq!(
            result.err(),
            Some(RepositoryError::ModelMismatch {
                expected: "Task".to_string(),
                found: "Project".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_get_resets_scope() {
        let mut repository = Repository::new(seeded().await);

        let open = repository
            .scope(ScopeCommand::new("inProgress"))
            .await
            .unwrap()
            .get(&Columns::All)
            .await
            .unwrap();
        assert_eq!(open.len(), 2);
        assert!(repository.query().spec().is_unconstrained());

        let everything = repository.get(&Columns::All).await.unwrap();
        assert_eq!(everything.len(), 3);
    }

    #[tokio::test]
    async fn test_paginate_resets_scope() {
        let mut repository = Repository::new(seeded().await);

        repository.call(ScopeCommand::new("inProgress")).await.unwrap();
        let page = repository
            .paginate(Pagination::new(1, 2).unwrap(), &Columns::All)
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].attribute("title"), Some(&json!("Review")));
        assert!(repository.query().spec().is_unconstrained());
    }

    #[tokio::test]
    async fn test_all_ignores_and_keeps_scope() {
        let mut repository = Repository::new(seeded().await);

        repository.call(ScopeCommand::new("completed")).await.unwrap();
        let everything = repository.all(&Columns::All).await.unwrap();

        assert_eq!(everything.len(), 3);
        assert!(!repository.query().spec().is_unconstrained());
    }

    #[tokio::test]
    async fn test_value_call_resets_scope() {
        let mut repository = Repository::new(seeded().await);

        repository.call(ScopeCommand::new("completed")).await.unwrap();
        let count = repository.call(ScopeCommand::new("count")).await.unwrap();

        assert_eq!(count, Delegated::Value(QueryValue::Count(1)));
        assert!(repository.query().spec().is_unconstrained());
    }

    #[tokio::test]
    async fn test_scope_rejects_value_calls() {
        let mut repository = Repository::new(seeded().await);

        let result = repository.scope(ScopeCommand::new("count")).await;

        assert!(matches!(
            result,
            Err(RepositoryError::UnexpectedValue { ref command }) if command == "count."
        ));
    }

    #[tokio::test]
    async fn test_unknown_scope_propagates() {
        let mut repository = Repository::new(seeded().await);

        let result = repository.call(ScopeCommand::new("archived")).await;

        assert!(matches!(result, Err(RepositoryError::UnknownScope { .. })));
    }

    #[tokio::test]
    async fn test_reset_scope() {
        let mut repository = Repository::new(seeded().await);

        repository.call(ScopeCommand::new("completed")).await.unwrap();
        repository.reset_scope();

        assert!(repository.query().spec().is_unconstrained());
        assert_eq!(repository.get(&Columns::All).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_by_id_and_record() {
        let mut repository = Repository::new(seeded().await);

        let updated = repository
            .update(RecordRef::Id(2), attributes([("completed", json!(true))]))
            .await
            .unwrap();
        assert_eq!(updated.attribute("completed"), Some(&json!(true)));

        let renamed = repository
            .update(
                RecordRef::Record(updated),
                attributes([("title", json!("Shipped"))]),
            )
            .await
            .unwrap();
        assert_eq!(renamed.attribute("title"), Some(&json!("Shipped")));
        assert_eq!(renamed.attribute("completed"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let mut repository = Repository::new(seeded().await);

        let result = repository
            .update(RecordRef::Id(99), attributes([("completed", json!(true))]))
            .await;

        assert_eq!(
            result,
            Err(RepositoryError::NotFound {
                model: "Task".to_string(),
                id: "99".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_delete_by_id_and_record() {
        let model = seeded().await;
        let mut repository = Repository::new(model.clone());

        assert!(repository.delete(RecordRef::Id(1)).await.unwrap());

        let record = model.find(2).await.unwrap().unwrap();
        assert!(repository.delete(RecordRef::Record(record)).await.unwrap());

        assert_eq!(repository.all(&Columns::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_noop() {
        let mut repository = Repository::new(seeded().await);

        assert!(!repository.delete(RecordRef::Id(99)).await.unwrap());
        assert_eq!(repository.all(&Columns::All).await.unwrap().len(), 3);
    }
}
