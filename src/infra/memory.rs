//! In-memory repositories.
//!
//! Used when no database URL is configured and by the test suite. Every
//! operation runs under one async mutex, which gives each write the same
//! all-or-nothing behavior as a store transaction.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::application::repos::{
    CreateLinkParams, CreateWorkspaceParams, DeleteWorkspaceOutcome, LinksRepo, LinksWriteRepo,
    RepoError, StoreHealth, UpdateLinkParams, UpdateWorkspaceParams, WorkspacesRepo,
    WorkspacesWriteRepo,
};
use crate::domain::links::{Link, LinkRecord, newest_first};
use crate::domain::types::LinkScope;
use crate::domain::workspaces::{WorkspaceRecord, WorkspaceWithCount};

#[derive(Debug, Default)]
struct State {
    workspaces: HashMap<Uuid, WorkspaceRecord>,
    links: HashMap<Uuid, LinkRecord>,
    tags: HashMap<Uuid, BTreeSet<String>>,
    last_tick: Option<OffsetDateTime>,
}

impl State {
    /// Strictly increasing timestamps, so insertion order is creation order.
    fn tick(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let next = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(next);
        next
    }

    fn ordered_links(&self, workspace_id: Uuid, scope: LinkScope) -> Vec<&LinkRecord> {
        let mut links: Vec<&LinkRecord> = self
            .links
            .values()
            .filter(|link| link.workspace_id == workspace_id)
            .filter(|link| scope.admits(link.is_favorite, link.is_deleted))
            .collect();
        links.sort_by(|a, b| newest_first(a.created_at, a.id, b.created_at, b.id));
        links
    }

    fn link_with_tags(&self, record: &LinkRecord) -> Link {
        let tags = self
            .tags
            .get(&record.id)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default();
        Link::from_record(record.clone(), tags)
    }

    fn slug_taken(&self, slug: &str, except: Uuid) -> bool {
        self.workspaces
            .values()
            .any(|workspace| workspace.id != except && workspace.slug == slug)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRepositories {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepositories {
    /// A store holding only the default workspace.
    pub fn new() -> Self {
        let workspace = WorkspaceRecord::default_workspace();
        let mut state = State::default();
        state.workspaces.insert(workspace.id, workspace);
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A store with no workspaces at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a fixture row as-is, bypassing validation and timestamps.
    pub async fn seed_link(&self, record: LinkRecord, tags: &[&str]) {
        let mut state = self.state.lock().await;
        state
            .tags
            .insert(record.id, tags.iter().map(|tag| tag.to_string()).collect());
        state.links.insert(record.id, record);
    }

    pub async fn seed_workspace(&self, workspace: WorkspaceRecord) {
        self.state
            .lock()
            .await
            .workspaces
            .insert(workspace.id, workspace);
    }

    pub async fn link(&self, id: Uuid) -> Option<Link> {
        let state = self.state.lock().await;
        state.links.get(&id).map(|record| state.link_with_tags(record))
    }
}

#[async_trait]
impl LinksRepo for InMemoryRepositories {
    async fn list_link_ids(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<Uuid>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .ordered_links(workspace_id, scope)
            .into_iter()
            .map(|link| link.id)
            .collect())
    }

    async fn list_links(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<LinkRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .ordered_links(workspace_id, scope)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn find_links(&self, ids: &[Uuid]) -> Result<Vec<LinkRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.links.get(id).cloned())
            .collect())
    }

    async fn tags_for_links(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, RepoError> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .tags
                    .get(id)
                    .filter(|tags| !tags.is_empty())
                    .map(|tags| (*id, tags.iter().cloned().collect()))
            })
            .collect())
    }
}

#[async_trait]
impl LinksWriteRepo for InMemoryRepositories {
    async fn insert_link(&self, params: CreateLinkParams) -> Result<Link, RepoError> {
        let mut state = self.state.lock().await;
        if !state.workspaces.contains_key(&params.workspace_id) {
            return Err(RepoError::InvalidInput {
                message: format!("workspace {} does not exist", params.workspace_id),
            });
        }
        if state.links.contains_key(&params.id) {
            return Err(RepoError::Duplicate {
                constraint: "links_pkey".to_string(),
            });
        }

        let now = state.tick();
        let record = LinkRecord {
            id: params.id,
            workspace_id: params.workspace_id,
            url: params.url,
            title: params.title,
            description: params.description,
            image: params.image,
            author: params.author,
            publisher: params.publisher,
            logo: params.logo,
            is_favorite: params.is_favorite,
            is_deleted: params.is_deleted,
            created_at: now,
            updated_at: now,
        };
        state
            .tags
            .insert(record.id, params.tags.into_iter().collect());
        state.links.insert(record.id, record.clone());
        Ok(state.link_with_tags(&record))
    }

    async fn update_link(&self, params: UpdateLinkParams) -> Result<Option<Link>, RepoError> {
        let mut state = self.state.lock().await;
        let now = state.tick();
        let Some(record) = state.links.get_mut(&params.id) else {
            return Ok(None);
        };

        if let Some(url) = params.url {
            record.url = url;
        }
        if let Some(title) = params.title {
            record.title = title;
        }
        if let Some(description) = params.description {
            record.description = description;
        }
        if let Some(image) = params.image {
            record.image = image;
        }
        if let Some(author) = params.author {
            record.author = author;
        }
        if let Some(publisher) = params.publisher {
            record.publisher = publisher;
        }
        if let Some(logo) = params.logo {
            record.logo = logo;
        }
        if let Some(is_favorite) = params.is_favorite {
            record.is_favorite = is_favorite;
        }
        if let Some(is_deleted) = params.is_deleted {
            record.is_deleted = is_deleted;
        }
        record.updated_at = record.updated_at.max(now);
        let record = record.clone();

        if let Some(tags) = params.tags {
            state.tags.insert(record.id, tags.into_iter().collect());
        }
        Ok(Some(state.link_with_tags(&record)))
    }

    async fn delete_link(&self, id: Uuid) -> Result<Option<LinkRecord>, RepoError> {
        let mut state = self.state.lock().await;
        state.tags.remove(&id);
        Ok(state.links.remove(&id))
    }
}

#[async_trait]
impl WorkspacesRepo for InMemoryRepositories {
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceWithCount>, RepoError> {
        let state = self.state.lock().await;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for link in state.links.values().filter(|link| !link.is_deleted) {
            *counts.entry(link.workspace_id).or_insert(0) += 1;
        }

        let mut entries: Vec<WorkspaceWithCount> = state
            .workspaces
            .values()
            .map(|workspace| WorkspaceWithCount {
                workspace: workspace.clone(),
                link_count: counts.get(&workspace.id).copied().unwrap_or(0),
            })
            .collect();
        entries.sort_by(|a, b| {
            newest_first(
                a.workspace.created_at,
                a.workspace.id,
                b.workspace.created_at,
                b.workspace.id,
            )
        });
        Ok(entries)
    }

    async fn find_workspace(&self, id: Uuid) -> Result<Option<WorkspaceRecord>, RepoError> {
        Ok(self.state.lock().await.workspaces.get(&id).cloned())
    }
}

#[async_trait]
impl WorkspacesWriteRepo for InMemoryRepositories {
    async fn insert_workspace(
        &self,
        params: CreateWorkspaceParams,
    ) -> Result<WorkspaceRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.workspaces.contains_key(&params.id) {
            return Err(RepoError::Duplicate {
                constraint: "workspaces_pkey".to_string(),
            });
        }
        if state.slug_taken(&params.slug, params.id) {
            return Err(RepoError::Duplicate {
                constraint: "workspaces_slug_key".to_string(),
            });
        }

        let workspace = WorkspaceRecord {
            id: params.id,
            name: params.name,
            slug: params.slug,
            created_at: state.tick(),
        };
        state.workspaces.insert(workspace.id, workspace.clone());
        Ok(workspace)
    }

    async fn update_workspace(
        &self,
        params: UpdateWorkspaceParams,
    ) -> Result<Option<WorkspaceRecord>, RepoError> {
        let mut state = self.state.lock().await;
        if state.slug_taken(&params.slug, params.id) {
            return Err(RepoError::Duplicate {
                constraint: "workspaces_slug_key".to_string(),
            });
        }
        Ok(state.workspaces.get_mut(&params.id).map(|workspace| {
            workspace.name = params.name;
            workspace.slug = params.slug;
            workspace.clone()
        }))
    }

    async fn delete_workspace(&self, id: Uuid) -> Result<DeleteWorkspaceOutcome, RepoError> {
        let mut state = self.state.lock().await;
        if !state.workspaces.contains_key(&id) {
            return Ok(DeleteWorkspaceOutcome::NotFound);
        }
        if state.workspaces.len() <= 1 {
            return Ok(DeleteWorkspaceOutcome::LastRemaining);
        }

        state.workspaces.remove(&id);
        let doomed: Vec<Uuid> = state
            .links
            .values()
            .filter(|link| link.workspace_id == id)
            .map(|link| link.id)
            .collect();
        for link_id in doomed {
            state.links.remove(&link_id);
            state.tags.remove(&link_id);
        }
        Ok(DeleteWorkspaceOutcome::Deleted)
    }
}

#[async_trait]
impl StoreHealth for InMemoryRepositories {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}
