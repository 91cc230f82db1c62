//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use linkstash::application::links::LinkService;
use linkstash::application::repos::{
    CreateLinkParams, CreateWorkspaceParams, DeleteWorkspaceOutcome, LinksRepo, LinksWriteRepo,
    RepoError, StoreHealth, UpdateLinkParams, UpdateWorkspaceParams, WorkspacesRepo,
    WorkspacesWriteRepo,
};
use linkstash::application::workspaces::WorkspaceService;
use linkstash::cache::{CacheConfig, CacheTrigger, CollectionCache};
use linkstash::domain::links::{Link, LinkRecord};
use linkstash::domain::types::LinkScope;
use linkstash::domain::workspaces::{WorkspaceRecord, WorkspaceWithCount};
use linkstash::infra::memory::InMemoryRepositories;
use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

pub const EPOCH: OffsetDateTime = datetime!(2024-03-01 09:00 UTC);

/// A stored link row created `minutes` after [`EPOCH`].
pub fn record(workspace_id: Uuid, minutes: i64, url: &str) -> LinkRecord {
    let created = EPOCH + Duration::minutes(minutes);
    LinkRecord {
        id: Uuid::new_v4(),
        workspace_id,
        url: url.to_string(),
        title: None,
        description: None,
        image: None,
        author: None,
        publisher: None,
        logo: None,
        is_favorite: false,
        is_deleted: false,
        created_at: created,
        updated_at: created,
    }
}

pub fn workspace(name: &str, slug: &str) -> WorkspaceRecord {
    WorkspaceRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: slug.to_string(),
        created_at: EPOCH,
    }
}

pub fn ids(links: &[Link]) -> Vec<Uuid> {
    links.iter().map(|link| link.id).collect()
}

/// Wraps the in-memory store and records every link read it serves.
pub struct CountingRepo {
    inner: InMemoryRepositories,
    id_reads: AtomicUsize,
    list_reads: AtomicUsize,
    tag_reads: AtomicUsize,
    fetched: Mutex<Vec<Vec<Uuid>>>,
    fail_after_write: AtomicBool,
}

impl CountingRepo {
    pub fn new(inner: InMemoryRepositories) -> Self {
        Self {
            inner,
            id_reads: AtomicUsize::new(0),
            list_reads: AtomicUsize::new(0),
            tag_reads: AtomicUsize::new(0),
            fetched: Mutex::new(Vec::new()),
            fail_after_write: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &InMemoryRepositories {
        &self.inner
    }

    /// Total link reads of any kind since the last reset.
    pub fn store_calls(&self) -> usize {
        self.id_reads.load(Ordering::SeqCst)
            + self.list_reads.load(Ordering::SeqCst)
            + self.tag_reads.load(Ordering::SeqCst)
            + self.fetched.lock().expect("fetched").len()
    }

    pub fn id_reads(&self) -> usize {
        self.id_reads.load(Ordering::SeqCst)
    }

    /// The id batches passed to `find_links`, in call order.
    pub fn fetched(&self) -> Vec<Vec<Uuid>> {
        self.fetched.lock().expect("fetched").clone()
    }

    pub fn reset(&self) {
        self.id_reads.store(0, Ordering::SeqCst);
        self.list_reads.store(0, Ordering::SeqCst);
        self.tag_reads.store(0, Ordering::SeqCst);
        self.fetched.lock().expect("fetched").clear();
    }

    /// Link writes still commit but report a timeout, so the caller cannot
    /// tell whether they happened.
    pub fn fail_after_write(&self, fail: bool) {
        self.fail_after_write.store(fail, Ordering::SeqCst);
    }

    fn write_outcome<T>(&self, result: Result<T, RepoError>) -> Result<T, RepoError> {
        if self.fail_after_write.load(Ordering::SeqCst) {
            result.and(Err(RepoError::Timeout))
        } else {
            result
        }
    }
}

#[async_trait]
impl LinksRepo for CountingRepo {
    async fn list_link_ids(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<Uuid>, RepoError> {
        self.id_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list_link_ids(workspace_id, scope).await
    }

    async fn list_links(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<LinkRecord>, RepoError> {
        self.list_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list_links(workspace_id, scope).await
    }

    async fn find_links(&self, ids: &[Uuid]) -> Result<Vec<LinkRecord>, RepoError> {
        self.fetched.lock().expect("fetched").push(ids.to_vec());
        self.inner.find_links(ids).await
    }

    async fn tags_for_links(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, RepoError> {
        self.tag_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.tags_for_links(ids).await
    }
}

#[async_trait]
impl LinksWriteRepo for CountingRepo {
    async fn insert_link(&self, params: CreateLinkParams) -> Result<Link, RepoError> {
        let result = self.inner.insert_link(params).await;
        self.write_outcome(result)
    }

    async fn update_link(&self, params: UpdateLinkParams) -> Result<Option<Link>, RepoError> {
        let result = self.inner.update_link(params).await;
        self.write_outcome(result)
    }

    async fn delete_link(&self, id: Uuid) -> Result<Option<LinkRecord>, RepoError> {
        let result = self.inner.delete_link(id).await;
        self.write_outcome(result)
    }
}

#[async_trait]
impl WorkspacesRepo for CountingRepo {
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceWithCount>, RepoError> {
        self.inner.list_workspaces().await
    }

    async fn find_workspace(&self, id: Uuid) -> Result<Option<WorkspaceRecord>, RepoError> {
        self.inner.find_workspace(id).await
    }
}

#[async_trait]
impl WorkspacesWriteRepo for CountingRepo {
    async fn insert_workspace(
        &self,
        params: CreateWorkspaceParams,
    ) -> Result<WorkspaceRecord, RepoError> {
        self.inner.insert_workspace(params).await
    }

    async fn update_workspace(
        &self,
        params: UpdateWorkspaceParams,
    ) -> Result<Option<WorkspaceRecord>, RepoError> {
        self.inner.update_workspace(params).await
    }

    async fn delete_workspace(&self, id: Uuid) -> Result<DeleteWorkspaceOutcome, RepoError> {
        self.inner.delete_workspace(id).await
    }
}

#[async_trait]
impl StoreHealth for CountingRepo {
    async fn health_check(&self) -> Result<(), RepoError> {
        self.inner.health_check().await
    }
}

/// Cached services over a counting store, plus an uncached reference view.
pub struct Harness {
    pub repo: Arc<CountingRepo>,
    pub cache: Arc<CollectionCache>,
    pub links: LinkService,
    pub workspaces: WorkspaceService,
    pub reference: LinkService,
}

impl Harness {
    pub fn new(inner: InMemoryRepositories) -> Self {
        Self::with_config(inner, CacheConfig::default())
    }

    pub fn with_config(inner: InMemoryRepositories, config: CacheConfig) -> Self {
        let repo = Arc::new(CountingRepo::new(inner.clone()));
        let cache = Arc::new(CollectionCache::new(&config));
        let trigger = Arc::new(CacheTrigger::new(config, cache.clone()));

        let links = LinkService::new(repo.clone(), repo.clone(), repo.clone())
            .with_cache(cache.clone())
            .with_cache_trigger(trigger.clone());
        let workspaces = WorkspaceService::new(repo.clone(), repo.clone())
            .with_cache(cache.clone())
            .with_cache_trigger(trigger);

        let plain = Arc::new(inner);
        let reference = LinkService::new(plain.clone(), plain.clone(), plain);

        Self {
            repo,
            cache,
            links,
            workspaces,
            reference,
        }
    }
}
