//! Repository traits describing persistence adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::links::{Link, LinkRecord};
use crate::domain::types::LinkScope;
use crate::domain::workspaces::{WorkspaceRecord, WorkspaceWithCount};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Whether the write may have committed even though an error came back.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, RepoError::Persistence(_) | RepoError::Timeout)
    }
}

#[derive(Debug, Clone)]
pub struct CreateLinkParams {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub logo: Option<String>,
    pub is_favorite: bool,
    pub is_deleted: bool,
    pub tags: Vec<String>,
}

/// Partial update. `None` leaves a field untouched; for optional text fields
/// `Some(None)` clears the value. `tags`, when present, replaces the set.
#[derive(Debug, Clone, Default)]
pub struct UpdateLinkParams {
    pub id: Uuid,
    pub url: Option<String>,
    pub title: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub author: Option<Option<String>>,
    pub publisher: Option<Option<String>>,
    pub logo: Option<Option<String>>,
    pub is_favorite: Option<bool>,
    pub is_deleted: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct CreateWorkspaceParams {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct UpdateWorkspaceParams {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteWorkspaceOutcome {
    Deleted,
    NotFound,
    /// Refused: the workspace is the only one left.
    LastRemaining,
}

#[async_trait]
pub trait LinksRepo: Send + Sync {
    /// Ids of the workspace's links within `scope`, newest first, ties by id.
    async fn list_link_ids(&self, workspace_id: Uuid, scope: LinkScope)
    -> Result<Vec<Uuid>, RepoError>;

    /// Rows of the workspace's links within `scope`, in `list_link_ids` order.
    async fn list_links(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<LinkRecord>, RepoError>;

    /// Rows for the given ids in no particular order; unknown ids are skipped.
    async fn find_links(&self, ids: &[Uuid]) -> Result<Vec<LinkRecord>, RepoError>;

    async fn tags_for_links(&self, ids: &[Uuid])
    -> Result<HashMap<Uuid, Vec<String>>, RepoError>;
}

/// Writes are transactional with the link's tag rows.
#[async_trait]
pub trait LinksWriteRepo: Send + Sync {
    async fn insert_link(&self, params: CreateLinkParams) -> Result<Link, RepoError>;

    /// `None` when no link has the id.
    async fn update_link(&self, params: UpdateLinkParams) -> Result<Option<Link>, RepoError>;

    /// Physically removes the link; returns the removed row.
    async fn delete_link(&self, id: Uuid) -> Result<Option<LinkRecord>, RepoError>;
}

#[async_trait]
pub trait WorkspacesRepo: Send + Sync {
    /// Newest first, with counts of non-deleted links.
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceWithCount>, RepoError>;

    async fn find_workspace(&self, id: Uuid) -> Result<Option<WorkspaceRecord>, RepoError>;
}

#[async_trait]
pub trait WorkspacesWriteRepo: Send + Sync {
    async fn insert_workspace(
        &self,
        params: CreateWorkspaceParams,
    ) -> Result<WorkspaceRecord, RepoError>;

    async fn update_workspace(
        &self,
        params: UpdateWorkspaceParams,
    ) -> Result<Option<WorkspaceRecord>, RepoError>;

    /// Deletes the workspace and its links unless it is the last one left.
    /// The check and the delete happen in one transaction.
    async fn delete_workspace(&self, id: Uuid) -> Result<DeleteWorkspaceOutcome, RepoError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
