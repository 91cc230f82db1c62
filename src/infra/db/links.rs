use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreateLinkParams, LinksRepo, LinksWriteRepo, RepoError, UpdateLinkParams,
};
use crate::domain::links::{Link, LinkRecord};
use crate::domain::types::{Category, LinkScope};

use super::{PostgresRepositories, map_sqlx_error};

const LINK_COLUMNS: &str = "id, workspace_id, url, title, description, image, author, \
    publisher, logo, is_favorite, is_deleted, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: Uuid,
    workspace_id: Uuid,
    url: String,
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    author: Option<String>,
    publisher: Option<String>,
    logo: Option<String>,
    is_favorite: bool,
    is_deleted: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<LinkRow> for LinkRecord {
    fn from(row: LinkRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            url: row.url,
            title: row.title,
            description: row.description,
            image: row.image,
            author: row.author,
            publisher: row.publisher,
            logo: row.logo,
            is_favorite: row.is_favorite,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn scope_condition(scope: LinkScope) -> &'static str {
    match scope {
        LinkScope::All => "TRUE",
        LinkScope::Category(Category::Inbox) => "NOT is_deleted",
        LinkScope::Category(Category::Favorites) => "is_favorite AND NOT is_deleted",
        LinkScope::Category(Category::Trash) => "is_deleted",
    }
}

async fn replace_tags(
    tx: &mut Transaction<'_, Postgres>,
    link_id: Uuid,
    tags: &[String],
) -> Result<(), RepoError> {
    sqlx::query("DELETE FROM link_tags WHERE link_id = $1")
        .bind(link_id)
        .execute(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;

    if !tags.is_empty() {
        sqlx::query("INSERT INTO link_tags (link_id, tag) SELECT $1, UNNEST($2::text[])")
            .bind(link_id)
            .bind(tags)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
    }
    Ok(())
}

async fn tags_of(
    tx: &mut Transaction<'_, Postgres>,
    link_id: Uuid,
) -> Result<Vec<String>, RepoError> {
    sqlx::query_scalar::<_, String>("SELECT tag FROM link_tags WHERE link_id = $1 ORDER BY tag")
        .bind(link_id)
        .fetch_all(tx.as_mut())
        .await
        .map_err(map_sqlx_error)
}

#[async_trait]
impl LinksRepo for PostgresRepositories {
    async fn list_link_ids(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<Uuid>, RepoError> {
        let sql = format!(
            "SELECT id FROM links WHERE workspace_id = $1 AND {} \
             ORDER BY created_at DESC, id ASC",
            scope_condition(scope)
        );
        sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(workspace_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_links(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<LinkRecord>, RepoError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE workspace_id = $1 AND {} \
             ORDER BY created_at DESC, id ASC",
            scope_condition(scope)
        );
        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(workspace_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LinkRecord::from).collect())
    }

    async fn find_links(&self, ids: &[Uuid]) -> Result<Vec<LinkRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LinkRecord::from).collect())
    }

    async fn tags_for_links(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, RepoError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT link_id, tag FROM link_tags WHERE link_id = ANY($1) ORDER BY link_id, tag",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut tags: HashMap<Uuid, Vec<String>> = HashMap::new();
        for (link_id, tag) in rows {
            tags.entry(link_id).or_default().push(tag);
        }
        Ok(tags)
    }
}

#[async_trait]
impl LinksWriteRepo for PostgresRepositories {
    async fn insert_link(&self, params: CreateLinkParams) -> Result<Link, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let sql = format!(
            "INSERT INTO links (id, workspace_id, url, title, description, image, author, \
             publisher, logo, is_favorite, is_deleted) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {LINK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(params.id)
            .bind(params.workspace_id)
            .bind(&params.url)
            .bind(&params.title)
            .bind(&params.description)
            .bind(&params.image)
            .bind(&params.author)
            .bind(&params.publisher)
            .bind(&params.logo)
            .bind(params.is_favorite)
            .bind(params.is_deleted)
            .fetch_one(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        replace_tags(&mut tx, params.id, &params.tags).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Link::from_record(row.into(), params.tags))
    }

    async fn update_link(&self, params: UpdateLinkParams) -> Result<Option<Link>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let select = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1 FOR UPDATE");
        let Some(current) = sqlx::query_as::<_, LinkRow>(&select)
            .bind(params.id)
            .fetch_optional(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?
        else {
            return Ok(None);
        };

        let update = format!(
            "UPDATE links SET url = $2, title = $3, description = $4, image = $5, \
             author = $6, publisher = $7, logo = $8, is_favorite = $9, is_deleted = $10, \
             updated_at = GREATEST(now(), updated_at) \
             WHERE id = $1 RETURNING {LINK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, LinkRow>(&update)
            .bind(params.id)
            .bind(params.url.unwrap_or(current.url))
            .bind(params.title.unwrap_or(current.title))
            .bind(params.description.unwrap_or(current.description))
            .bind(params.image.unwrap_or(current.image))
            .bind(params.author.unwrap_or(current.author))
            .bind(params.publisher.unwrap_or(current.publisher))
            .bind(params.logo.unwrap_or(current.logo))
            .bind(params.is_favorite.unwrap_or(current.is_favorite))
            .bind(params.is_deleted.unwrap_or(current.is_deleted))
            .fetch_one(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        if let Some(tags) = &params.tags {
            replace_tags(&mut tx, params.id, tags).await?;
        }
        let tags = tags_of(&mut tx, params.id).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Some(Link::from_record(row.into(), tags)))
    }

    async fn delete_link(&self, id: Uuid) -> Result<Option<LinkRecord>, RepoError> {
        let sql = format!("DELETE FROM links WHERE id = $1 RETURNING {LINK_COLUMNS}");
        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(LinkRecord::from))
    }
}
