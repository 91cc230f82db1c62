use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreateWorkspaceParams, DeleteWorkspaceOutcome, RepoError, UpdateWorkspaceParams,
    WorkspacesRepo, WorkspacesWriteRepo,
};
use crate::domain::workspaces::{WorkspaceRecord, WorkspaceWithCount};

use super::{PostgresRepositories, map_sqlx_error};

/// Serializes workspace deletions so two concurrent deletes cannot both pass
/// the last-workspace check.
const WORKSPACE_DELETE_LOCK: i64 = 0x6c69_6e6b_7773;

#[derive(sqlx::FromRow)]
struct WorkspaceRow {
    id: Uuid,
    name: String,
    slug: String,
    created_at: OffsetDateTime,
}

impl From<WorkspaceRow> for WorkspaceRecord {
    fn from(row: WorkspaceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WorkspaceCountRow {
    id: Uuid,
    name: String,
    slug: String,
    created_at: OffsetDateTime,
    link_count: i64,
}

#[async_trait]
impl WorkspacesRepo for PostgresRepositories {
    async fn list_workspaces(&self) -> Result<Vec<WorkspaceWithCount>, RepoError> {
        let rows = sqlx::query_as::<_, WorkspaceCountRow>(
            r#"
            SELECT
                w.id,
                w.name,
                w.slug,
                w.created_at,
                COUNT(l.id) FILTER (WHERE NOT l.is_deleted) AS link_count
            FROM workspaces w
            LEFT JOIN links l ON l.workspace_id = w.id
            GROUP BY w.id, w.name, w.slug, w.created_at
            ORDER BY w.created_at DESC, w.id ASC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| WorkspaceWithCount {
                workspace: WorkspaceRecord {
                    id: row.id,
                    name: row.name,
                    slug: row.slug,
                    created_at: row.created_at,
                },
                link_count: u64::try_from(row.link_count).unwrap_or(0),
            })
            .collect())
    }

    async fn find_workspace(&self, id: Uuid) -> Result<Option<WorkspaceRecord>, RepoError> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT id, name, slug, created_at FROM workspaces WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(WorkspaceRecord::from))
    }
}

#[async_trait]
impl WorkspacesWriteRepo for PostgresRepositories {
    async fn insert_workspace(
        &self,
        params: CreateWorkspaceParams,
    ) -> Result<WorkspaceRecord, RepoError> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            r#"
            INSERT INTO workspaces (id, name, slug)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, created_at
            "#,
        )
        .bind(params.id)
        .bind(params.name)
        .bind(params.slug)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_workspace(
        &self,
        params: UpdateWorkspaceParams,
    ) -> Result<Option<WorkspaceRecord>, RepoError> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            r#"
            UPDATE workspaces
            SET name = $2, slug = $3
            WHERE id = $1
            RETURNING id, name, slug, created_at
            "#,
        )
        .bind(params.id)
        .bind(params.name)
        .bind(params.slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(WorkspaceRecord::from))
    }

    async fn delete_workspace(&self, id: Uuid) -> Result<DeleteWorkspaceOutcome, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(WORKSPACE_DELETE_LOCK)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM workspaces WHERE id = $1)")
                .bind(id)
                .fetch_one(tx.as_mut())
                .await
                .map_err(map_sqlx_error)?;
        if !exists {
            return Ok(DeleteWorkspaceOutcome::NotFound);
        }

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workspaces")
            .fetch_one(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
        if total <= 1 {
            return Ok(DeleteWorkspaceOutcome::LastRemaining);
        }

        sqlx::query("DELETE FROM workspaces WHERE id = $1")
            .bind(id)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(DeleteWorkspaceOutcome::Deleted)
    }
}
