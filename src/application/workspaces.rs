use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CreateWorkspaceParams, DeleteWorkspaceOutcome, RepoError, UpdateWorkspaceParams,
    WorkspacesRepo, WorkspacesWriteRepo,
};
use crate::cache::{CacheTrigger, CollectionCache};
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugError, slug_with_id_suffix};
use crate::domain::workspaces::{WorkspaceRecord, WorkspaceWithCount, validate_workspace_name};

#[derive(Debug, Error)]
pub enum WorkspaceServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct CreateWorkspaceCommand {
    /// Client-chosen id; generated when absent.
    pub id: Option<Uuid>,
    pub name: String,
}

#[derive(Clone)]
pub struct WorkspaceService {
    reader: Arc<dyn WorkspacesRepo>,
    writer: Arc<dyn WorkspacesWriteRepo>,
    cache: Option<Arc<CollectionCache>>,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl WorkspaceService {
    pub fn new(reader: Arc<dyn WorkspacesRepo>, writer: Arc<dyn WorkspacesWriteRepo>) -> Self {
        Self {
            reader,
            writer,
            cache: None,
            cache_trigger: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<CollectionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the cache trigger for this service.
    pub fn with_cache_trigger(mut self, trigger: Arc<CacheTrigger>) -> Self {
        self.cache_trigger = Some(trigger);
        self
    }

    /// Counts change with every link write, so listings are not cached.
    pub async fn list(&self) -> Result<Vec<WorkspaceWithCount>, WorkspaceServiceError> {
        Ok(self.reader.list_workspaces().await?)
    }

    pub async fn find(&self, id: Uuid) -> Result<WorkspaceRecord, WorkspaceServiceError> {
        if let Some(workspace) = self.cache.as_deref().and_then(|cache| cache.get_workspace(id)) {
            return Ok(workspace);
        }

        let workspace = self
            .reader
            .find_workspace(id)
            .await?
            .ok_or(DomainError::not_found("workspace"))?;

        if let Some(cache) = self.cache.as_deref() {
            cache.put_workspace(workspace.clone());
        }
        Ok(workspace)
    }

    pub async fn create(
        &self,
        command: CreateWorkspaceCommand,
    ) -> Result<WorkspaceRecord, WorkspaceServiceError> {
        let name = validate_workspace_name(&command.name)?;
        let id = command.id.unwrap_or_else(Uuid::new_v4);
        let slug = self.unique_slug(&name, id).await?;

        let workspace = self
            .writer
            .insert_workspace(CreateWorkspaceParams { id, name, slug })
            .await?;

        if let Some(trigger) = &self.cache_trigger {
            trigger.workspace_created(workspace.id);
        }
        info!(workspace_id = %workspace.id, slug = %workspace.slug, "Workspace created");
        Ok(workspace)
    }

    pub async fn rename(
        &self,
        id: Uuid,
        name: &str,
    ) -> Result<WorkspaceRecord, WorkspaceServiceError> {
        let name = validate_workspace_name(name)?;
        let slug = self.unique_slug(&name, id).await?;

        let workspace = self
            .writer
            .update_workspace(UpdateWorkspaceParams { id, name, slug })
            .await?
            .ok_or(DomainError::not_found("workspace"))?;

        if let Some(trigger) = &self.cache_trigger {
            trigger.workspace_renamed(workspace.id);
        }
        Ok(workspace)
    }

    /// Delete a workspace and its links. The last remaining workspace is kept.
    pub async fn delete(&self, id: Uuid) -> Result<(), WorkspaceServiceError> {
        match self.writer.delete_workspace(id).await? {
            DeleteWorkspaceOutcome::Deleted => {
                if let Some(trigger) = &self.cache_trigger {
                    trigger.workspace_deleted(id);
                }
                info!(workspace_id = %id, "Workspace deleted");
                Ok(())
            }
            DeleteWorkspaceOutcome::NotFound => Err(DomainError::not_found("workspace").into()),
            DeleteWorkspaceOutcome::LastRemaining => Err(DomainError::LastWorkspace.into()),
        }
    }

    /// Slugs taken by other workspaces are avoided; the unique index on the
    /// column settles any race with a concurrent create.
    async fn unique_slug(&self, name: &str, id: Uuid) -> Result<String, WorkspaceServiceError> {
        let taken: Vec<String> = self
            .reader
            .list_workspaces()
            .await?
            .into_iter()
            .filter(|entry| entry.workspace.id != id)
            .map(|entry| entry.workspace.slug)
            .collect();

        Ok(slug_with_id_suffix(name, id, |candidate| {
            !taken.iter().any(|slug| slug == candidate)
        })?)
    }
}
