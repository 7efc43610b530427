//! Caching repository decorator.
//!
//! Wraps a `Repository` with a read-through cache:
//! - **Reads**: `get`/`paginate` are cached under a key derived from the
//!   trail of scope calls made since the last reset; `all` under a constant key
//! - **Writes**: Persist through the repository, then flush the forget tags

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use depo_core::cache::{all_key, cache_key, get_prefix, paginate_prefix, KeywordTrail};
use depo_core::cache::{TagSet, TaggedCache};
use depo_core::query::{Delegated, QueryValue, ScopeCommand};
use depo_core::storage::{
    Attributes, Columns, Model, Page, Pagination, RecordRef, RecordRepository, Result,
};

use crate::cache::remember;
use crate::storage::Repository;

use super::CacheOptions;

/// Caching repository decorator.
///
/// Every narrowing call is recorded as a keyword (`name.args`) before it is
/// forwarded. A call already on the trail is not forwarded again. A terminal read hashes its operation prefix together with the
/// recorded keywords, so equal chains share a cache entry and different
/// chains never do. Reads are tagged with the primary tag; writes flush the
/// forget tags, dropping every cached read of the model at once.
///
/// Writes leave the keyword trail and the pending scope untouched.
///
/// # Type Parameters
///
/// * `M` - The model behind the wrapped repository
/// * `C` - The cache implementation
pub struct CachingRepository<M, C>
where
    M: Model,
    C: TaggedCache + ?Sized,
{
    repository: Repository<M>,
    cache: Arc<C>,
    ttl: Duration,
    primary_tag: String,
    forget_tags: TagSet,
    keywords: KeywordTrail,
}

impl<M, C> CachingRepository<M, C>
where
    M: Model,
    C: TaggedCache + ?Sized,
{
    /// Creates a caching repository around an existing repository.
    ///
    /// # Arguments
    ///
    /// * `repository` - The repository to cache
    /// * `ttl` - Time-to-live for cached reads
    /// * `cache` - The cache implementation
    /// * `options` - Cache tag settings
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Configuration` if no usable cache tag can be derived.
    pub fn new(
        repository: Repository<M>,
        ttl: Duration,
        cache: Arc<C>,
        options: CacheOptions,
    ) -> Result<Self> {
        let (primary_tag, forget_tags) = options.resolve(repository.repository_model())?;
        Ok(Self {
            repository,
            cache,
            ttl,
            primary_tag,
            forget_tags,
            keywords: KeywordTrail::new(),
        })
    }

    /// Creates a caching repository over a default repository for `model`.
    pub fn from_model(model: M, ttl: Duration, cache: Arc<C>, options: CacheOptions) -> Result<Self> {
        Self::new(Repository::new(model), ttl, cache, options)
    }

    /// Tag cached reads are stored under.
    pub fn primary_tag(&self) -> &str {
        &self.primary_tag
    }

    /// Tags flushed on every write.
    pub fn forget_tags(&self) -> &TagSet {
        &self.forget_tags
    }

    /// Keywords recorded since the last reset.
    pub fn keywords(&self) -> &KeywordTrail {
        &self.keywords
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn repository(&self) -> &Repository<M> {
        &self.repository
    }

    /// Cache key for an operation prefix combined with the current trail.
    pub fn cache_key(&self, prefix: &str) -> String {
        cache_key(prefix, &self.keywords)
    }

    /// Flushes every cached read under the forget tags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::CacheUnavailable` if the cache cannot be reached.
    pub async fn forget(&self) -> Result<()> {
        let removed = self.cache.flush(&self.forget_tags).await?;
        tracing::debug!(tags = %self.forget_tags, removed, "Cache tags flushed");
        Ok(())
    }

    fn read_tags(&self) -> TagSet {
        TagSet::single(self.primary_tag.clone())
    }
}

#[async_trait]
impl<M, C> RecordRepository for CachingRepository<M, C>
where
    M: Model + 'static,
    M::Record: Serialize + DeserializeOwned,
    C: TaggedCache + ?Sized + 'static,
{
    type Record = M::Record;

    async fn all(&mut self, columns: &Columns) -> Result<Vec<M::Record>> {
        let key = all_key(columns);
        let tags = self.read_tags();

        let result = remember(
            self.cache.as_ref(),
            &tags,
            &key,
            self.ttl,
            self.repository.all(columns),
        )
        .await;

        self.reset_scope();
        result
    }

    async fn get(&mut self, columns: &Columns) -> Result<Vec<M::Record>> {
        let key = self.cache_key(&get_prefix(columns));
        let tags = self.read_tags();

        let result = remember(
            self.cache.as_ref(),
            &tags,
            &key,
            self.ttl,
            self.repository.get(columns),
        )
        .await;

        self.reset_scope();
        result
    }

    async fn paginate(
        &mut self,
        pagination: Pagination,
        columns: &Columns,
    ) -> Result<Page<M::Record>> {
        let key = self.cache_key(&paginate_prefix(pagination, columns));
        let tags = self.read_tags();

        let result = remember(
            self.cache.as_ref(),
            &tags,
            &key,
            self.ttl,
            self.repository.paginate(pagination, columns),
        )
        .await;

        self.reset_scope();
        result
    }

    async fn create(&mut self, attributes: Attributes) -> Result<M::Record> {
        let record = self.repository.create(attributes).await?;
        tracing::debug!(model = self.repository.repository_model(), "Record created");
        self.forget().await?;
        Ok(record)
    }

    async fn update(
        &mut self,
        target: RecordRef<M::Record>,
        attributes: Attributes,
    ) -> Result<M::Record> {
        let record = self.repository.update(target, attributes).await?;
        tracing::debug!(model = self.repository.repository_model(), "Record updated");
        self.forget().await?;
        Ok(record)
    }

    async fn delete(&mut self, target: RecordRef<M::Record>) -> Result<bool> {
        let deleted = self.repository.delete(target).await?;
        tracing::debug!(
            model = self.repository.repository_model(),
            deleted,
            "Record deleted"
        );
        self.forget().await?;
        Ok(deleted)
    }

    async fn call(&mut self, command: ScopeCommand) -> Result<Delegated<QueryValue<M::Record>>> {
        let keyword = command.keyword();
        // A repeat must not reach the query either, or a later `take` could
        // override a window the key no longer reflects
        if self.keywords.contains(&keyword) {
            return Ok(Delegated::Continue);
        }

        match self.repository.call(command).await? {
            Delegated::Continue => {
                self.keywords.push(keyword);
                tracing::trace!(keywords = %self.keywords, "Scope recorded");
                Ok(Delegated::Continue)
            }
            Delegated::Value(value) => {
                self.keywords.clear();
                Ok(Delegated::Value(value))
            }
        }
    }

    fn reset_scope(&mut self) {
        self.repository.reset_scope();
        self.keywords.clear();
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use serde_json::json;
    use tokio::sync::RwLock;

    use depo_core::cache::{CacheError, Result as CacheResult};
    use depo_core::storage::{RepositoryError, Row};

    use crate::demo::{seed_tasks, task, task_model};
    use crate::storage::inmemory::InMemoryModel;

    const TTL: Duration = Duration::from_secs(300);

    // Mock cache that tracks flushes and can be switched off
    #[derive(Default)]
    struct MockCache {
        store: RwLock<HashMap<String, (TagSet, Vec<u8>)>>,
        flushes: AtomicUsize,
        unavailable: AtomicBool,
    }

    impl MockCache {
        fn check(&self) -> CacheResult<()> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(CacheError::ConnectionFailed("connection refused".to_string()));
            }
            Ok(())
        }

        async fn len(&self) -> usize {
            self.store.read().await.len()
        }
    }

    #[async_trait]
    impl TaggedCache for MockCache {
        async fn get(&self, _tags: &TagSet, key: &str) -> CacheResult<Option<Vec<u8>>> {
            self.check()?;
            Ok(self.store.read().await.get(key).map(|(_, v)| v.clone()))
        }

        async fn put(
            &self,
            tags: &TagSet,
            key: &str,
            value: &[u8],
            _ttl: Duration,
        ) -> CacheResult<()> {
            self.check()?;
            self.store
                .write()
                .await
                .insert(key.to_string(), (tags.clone(), value.to_vec()));
            Ok(())
        }

        async fn flush(&self, tags: &TagSet) -> CacheResult<u64> {
            self.check()?;
            self.flushes.fetch_add(1, Ordering::SeqCst);
            let mut store = self.store.write().await;
            let before = store.len();
            store.retain(|_, (stored, _)| !stored.iter().any(|tag| tags.contains(tag)));
            Ok((before - store.len()) as u64)
        }
    }

    async fn seeded() -> (InMemoryModel, Arc<MockCache>, CachingRepository<InMemoryModel, MockCache>) {
        let model = task_model();
        seed_tasks(&model, 10, 8).await.unwrap();
        let cache = Arc::new(MockCache::default());
        let repository =
            CachingRepository::from_model(model.clone(), TTL, cache.clone(), CacheOptions::new())
                .unwrap();
        (model, cache, repository)
    }

    async fn scoped_get(
        repository: &mut CachingRepository<InMemoryModel, MockCache>,
        scope: &str,
    ) -> Vec<Row> {
        repository
            .scope(ScopeCommand::new(scope))
            .await
            .unwrap()
            .get(&Columns::All)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_task_scenario_query_counts() {
        let (model, _cache, mut repository) = seeded().await;

        assert_eq!(scoped_get(&mut repository, "inProgress").await.len(), 8);
        assert_eq!(scoped_get(&mut repository, "completed").await.len(), 10);
        assert_eq!(model.read_count(), 2);

        assert_eq!(scoped_get(&mut repository, "inProgress").await.len(), 8);
        assert_eq!(scoped_get(&mut repository, "completed").await.len(), 10);
        assert_eq!(model.read_count(), 2);

        assert_eq!(repository.all(&Columns::All).await.unwrap().len(), 18);
        assert_eq!(model.read_count(), 3);
        assert_eq!(repository.all(&Columns::All).await.unwrap().len(), 18);
        assert_eq!(model.read_count(), 3);

        repository.create(task("Another", false)).await.unwrap();
        assert_eq!(scoped_get(&mut repository, "inProgress").await.len(), 9);
        assert_eq!(model.read_count(), 4);
    }

    #[tokio::test]
    async fn test_same_chain_same_key() {
        let (_model, _cache, mut repository) = seeded().await;

        repository.call(ScopeCommand::new("completed")).await.unwrap();
        repository.call(ScopeCommand::new("latest")).await.unwrap();
        let first = repository.cache_key("get[*]");
        repository.reset_scope();

        repository.call(ScopeCommand::new("completed")).await.unwrap();
        repository.call(ScopeCommand::new("latest")).await.unwrap();
        let second = repository.cache_key("get[*]");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_different_args_different_keys() {
        let (model, _cache, mut repository) = seeded().await;

        repository
            .scope(ScopeCommand::new("take").arg(2))
            .await
            .unwrap();
        let two = repository.get(&Columns::All).await.unwrap();
        repository
            .scope(ScopeCommand::new("take").arg(3))
            .await
            .unwrap();
        let three = repository.get(&Columns::All).await.unwrap();

        assert_eq!(two.len(), 2);
        assert_eq!(three.len(), 3);
        assert_eq!(model.read_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_calls_are_recorded_once() {
        let (_model, _cache, mut repository) = seeded().await;

        repository.call(ScopeCommand::new("completed")).await.unwrap();
        let once = repository.cache_key("get[*]");
        repository.call(ScopeCommand::new("completed")).await.unwrap();

        assert_eq!(repository.keywords().len(), 1);
        assert_eq!(repository.cache_key("get[*]"), once);
    }

    #[tokio::test]
    async fn test_repeated_window_call_matches_its_key() {
        let (model, _cache, mut repository) = seeded().await;

        for limit in [2, 3, 2] {
            repository
                .call(ScopeCommand::new("take").arg(limit))
                .await
                .unwrap();
        }
        let repeated = repository.get(&Columns::All).await.unwrap();

        for limit in [2, 3] {
            repository
                .call(ScopeCommand::new("take").arg(limit))
                .await
                .unwrap();
        }
        let cached = repository.get(&Columns::All).await.unwrap();

        let mut plain = Repository::new(model.clone());
        for limit in [2, 3] {
            plain.call(ScopeCommand::new("take").arg(limit)).await.unwrap();
        }
        let uncached = plain.get(&Columns::All).await.unwrap();

        assert_eq!(repeated.len(), 3);
        assert_eq!(cached.len(), uncached.len());
        assert_eq!(cached, uncached);
    }

    #[tokio::test]
    async fn test_get_clears_trail() {
        let (_model, _cache, mut repository) = seeded().await;

        scoped_get(&mut repository, "completed").await;

        assert!(repository.keywords().is_empty());
        assert!(repository.repository().query().spec().is_unconstrained());
    }

    #[tokio::test]
    async fn test_cache_hit_still_resets_scope() {
        let (_model, _cache, mut repository) = seeded().await;

        scoped_get(&mut repository, "completed").await;
        scoped_get(&mut repository, "completed").await;

        assert!(repository.repository().query().spec().is_unconstrained());
        assert_eq!(repository.get(&Columns::All).await.unwrap().len(), 18);
    }

    #[tokio::test]
    async fn test_all_ignores_and_clears_trail() {
        let (model, _cache, mut repository) = seeded().await;

        repository.call(ScopeCommand::new("completed")).await.unwrap();
        let everything = repository.all(&Columns::All).await.unwrap();
        assert_eq!(everything.len(), 18);
        assert!(repository.keywords().is_empty());

        repository.call(ScopeCommand::new("inProgress")).await.unwrap();
        let again = repository.all(&Columns::All).await.unwrap();
        assert_eq!(again.len(), 18);
        assert_eq!(model.read_count(), 1);
    }

    #[tokio::test]
    async fn test_paginate_pages_are_cached_separately() {
        let (model, _cache, mut repository) = seeded().await;
        let first = Pagination::new(5, 1).unwrap();
        let second = Pagination::new(5, 2).unwrap();

        let page_one = repository.paginate(first, &Columns::All).await.unwrap();
        let page_two = repository.paginate(second, &Columns::All).await.unwrap();
        assert_eq!(model.read_count(), 2);
        assert_ne!(page_one.items, page_two.items);

        let cached = repository.paginate(first, &Columns::All).await.unwrap();
        assert_eq!(cached, page_one);
        assert_eq!(model.read_count(), 2);

        repository.get(&Columns::All).await.unwrap();
        assert_eq!(model.read_count(), 3);
    }

    #[tokio::test]
    async fn test_projections_are_cached_separately() {
        let (model, _cache, mut repository) = seeded().await;

        let full = repository.get(&Columns::All).await.unwrap();
        let titles = repository.get(&Columns::only(["title"])).await.unwrap();

        assert!(full[0].attribute("completed").is_some());
        assert!(titles[0].attribute("completed").is_none());
        assert_eq!(model.read_count(), 2);
    }

    #[tokio::test]
    async fn test_writes_invalidate() {
        let (model, cache, mut repository) = seeded().await;

        scoped_get(&mut repository, "completed").await;
        repository.all(&Columns::All).await.unwrap();
        assert_eq!(cache.len().await, 2);

        let updated = repository
            .update(RecordRef::Id(11), task("Finished", true))
            .await
            .unwrap();
        assert_eq!(cache.len().await, 0);
        assert_eq!(scoped_get(&mut repository, "completed").await.len(), 11);

        repository.delete(RecordRef::Record(updated)).await.unwrap();
        assert_eq!(scoped_get(&mut repository, "completed").await.len(), 10);
        // update by id looks the row up first
        assert_eq!(model.read_count(), 5);
        assert_eq!(cache.flushes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_id_still_flushes() {
        let (_model, cache, mut repository) = seeded().await;

        assert!(!repository.delete(RecordRef::Id(999)).await.unwrap());
        assert_eq!(cache.flushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_flush() {
        let (_model, cache, mut repository) = seeded().await;

        let result = repository.update(RecordRef::Id(999), task("x", true)).await;

        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
        assert_eq!(cache.flushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_writes_keep_trail() {
        let (model, _cache, mut repository) = seeded().await;

        repository.call(ScopeCommand::new("inProgress")).await.unwrap();
        let before = repository.cache_key("get[*]");
        repository.create(task("Another", false)).await.unwrap();

        assert_eq!(repository.keywords().len(), 1);
        assert_eq!(repository.cache_key("get[*]"), before);

        let open = repository.get(&Columns::All).await.unwrap();
        assert_eq!(open.len(), 9);
        assert_eq!(model.read_count(), 1);
    }

    #[tokio::test]
    async fn test_value_calls_are_uncached_and_reset() {
        let (model, cache, mut repository) = seeded().await;

        repository.call(ScopeCommand::new("completed")).await.unwrap();
        let count = repository.call(ScopeCommand::new("count")).await.unwrap();
        assert_eq!(count, Delegated::Value(QueryValue::Count(10)));
        assert!(repository.keywords().is_empty());

        repository.call(ScopeCommand::new("count")).await.unwrap();
        assert_eq!(model.read_count(), 2);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_failed_call_leaves_trail() {
        let (_model, _cache, mut repository) = seeded().await;

        repository.call(ScopeCommand::new("completed")).await.unwrap();
        let result = repository.call(ScopeCommand::new("archived")).await;

        assert!(matches!(result, Err(RepositoryError::UnknownScope { .. })));
        assert_eq!(repository.keywords().as_slice(), ["completed."]);
    }

    #[tokio::test]
    async fn test_reset_scope_clears_trail_without_cache() {
        let (_model, cache, mut repository) = seeded().await;

        repository.call(ScopeCommand::new("completed")).await.unwrap();
        repository.reset_scope();

        assert!(repository.keywords().is_empty());
        assert_eq!(cache.len().await, 0);
        assert_eq!(repository.get(&Columns::All).await.unwrap().len(), 18);
    }

    #[tokio::test]
    async fn test_unavailable_cache_fails_reads() {
        let (model, cache, mut repository) = seeded().await;
        cache.unavailable.store(true, Ordering::SeqCst);

        let result = repository.get(&Columns::All).await;

        assert!(matches!(result, Err(RepositoryError::CacheUnavailable(_))));
        assert_eq!(model.read_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_cache_fails_writes_after_persisting() {
        let (model, cache, mut repository) = seeded().await;
        cache.unavailable.store(true, Ordering::SeqCst);

        let result = repository.create(task("Another", false)).await;

        assert!(matches!(result, Err(RepositoryError::CacheUnavailable(_))));
        assert_eq!(model.all(&Columns::All).await.unwrap().len(), 19);
    }

    #[tokio::test]
    async fn test_forget_tags_cover_other_repositories() {
        let cache = Arc::new(MockCache::default());
        let tasks = task_model();
        seed_tasks(&tasks, 1, 1).await.unwrap();
        let projects = InMemoryModel::new("Project");
        projects.create(Attributes::new()).await.unwrap();

        let mut task_repository = CachingRepository::from_model(
            tasks.clone(),
            TTL,
            cache.clone(),
            CacheOptions::new().with_forget_tags(["task", "project"]),
        )
        .unwrap();
        let mut project_repository =
            CachingRepository::from_model(projects.clone(), TTL, cache.clone(), CacheOptions::new())
                .unwrap();

        project_repository.get(&Columns::All).await.unwrap();
        task_repository.get(&Columns::All).await.unwrap();
        assert_eq!(cache.len().await, 2);

        task_repository.create(task("Another", true)).await.unwrap();
        assert_eq!(cache.len().await, 0);

        project_repository.get(&Columns::All).await.unwrap();
        assert_eq!(projects.read_count(), 2);
    }

    #[tokio::test]
    async fn test_default_tags() {
        let (_model, _cache, repository) = seeded().await;

        assert_eq!(repository.primary_tag(), "task");
        assert_eq!(repository.forget_tags(), &TagSet::single("task"));
        assert_eq!(repository.ttl(), TTL);
    }

    #[tokio::test]
    async fn test_construct_from_repository() {
        let repository = Repository::bind(task_model(), "Task").unwrap();
        let cache = Arc::new(MockCache::default());

        let caching = CachingRepository::new(
            repository,
            TTL,
            cache,
            CacheOptions::new().with_primary_tag("tasks"),
        )
        .unwrap();

        assert_eq!(caching.primary_tag(), "tasks");
        assert_eq!(caching.forget_tags(), &TagSet::single("tasks"));
    }

    #[tokio::test]
    async fn test_unusable_model_name_is_configuration_error() {
        let cache = Arc::new(MockCache::default());

        let result =
            CachingRepository::from_model(InMemoryModel::new("???"), TTL, cache, CacheOptions::new());

        assert!(matches!(result, Err(RepositoryError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_works_with_trait_object_cache() {
        let cache: Arc<dyn TaggedCache> = Arc::new(MockCache::default());
        let model = task_model();
        seed_tasks(&model, 2, 1).await.unwrap();

        let mut repository =
            CachingRepository::from_model(model.clone(), TTL, cache, CacheOptions::new()).unwrap();

        repository.get(&Columns::All).await.unwrap();
        repository.get(&Columns::All).await.unwrap();

        assert_eq!(model.read_count(), 1);
    }

    #[tokio::test]
    async fn test_json_round_trip_of_cached_rows() {
        let (_model, _cache, mut repository) = seeded().await;

        let fresh = scoped_get(&mut repository, "completed").await;
        let cached = scoped_get(&mut repository, "completed").await;

        assert_eq!(fresh, cached);
        assert_eq!(cached[0].attribute("completed"), Some(&json!(true)));
    }
}
