//! Link queries and mutations.
//!
//! Reads go through the collection cache when one is configured; writes go to
//! the store and then through the cache trigger, in that order.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::repos::{
    CreateLinkParams, LinksRepo, LinksWriteRepo, RepoError, UpdateLinkParams, WorkspacesRepo,
};
use crate::cache::{
    CacheTrigger, CollectionCache, METRIC_COLLECTION_HIT, METRIC_COLLECTION_MISS,
    METRIC_PARTIAL_FILL, QuerySignature,
};
use crate::domain::error::DomainError;
use crate::domain::links::{Link, LinkRecord, clean_optional, validate_link_url, validate_tags};
use crate::domain::types::LinkScope;

#[derive(Debug, Error)]
pub enum LinkServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct CreateLinkCommand {
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

/// Field-wise update; see [`UpdateLinkParams`] for the `Option` layering.
#[derive(Debug, Clone, Default)]
pub struct LinkPatch {
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

#[derive(Clone)]
pub struct LinkService {
    reader: Arc<dyn LinksRepo>,
    writer: Arc<dyn LinksWriteRepo>,
    workspaces: Arc<dyn WorkspacesRepo>,
    cache: Option<Arc<CollectionCache>>,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl LinkService {
    pub fn new(
        reader: Arc<dyn LinksRepo>,
        writer: Arc<dyn LinksWriteRepo>,
        workspaces: Arc<dyn WorkspacesRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            workspaces,
            cache: None,
            cache_trigger: None,
        }
    }

    /// Serve reads through `cache`.
    pub fn with_cache(mut self, cache: Arc<CollectionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the cache trigger for this service.
    pub fn with_cache_trigger(mut self, trigger: Arc<CacheTrigger>) -> Self {
        self.cache_trigger = Some(trigger);
        self
    }

    /// Links of a workspace within `scope`, newest first, each with its tags.
    pub async fn list(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<Link>, LinkServiceError> {
        let Some(cache) = self.cache.as_deref() else {
            let records = self.reader.list_links(workspace_id, scope).await?;
            return Ok(self.attach_tags(records).await?);
        };

        let signature = QuerySignature::new(workspace_id, scope);
        let token = cache.fill_token(workspace_id);

        let ids = match cache.get_collection(&signature) {
            Some(ids) => {
                counter!(METRIC_COLLECTION_HIT).increment(1);
                ids
            }
            None => {
                counter!(METRIC_COLLECTION_MISS).increment(1);
                let ids = self.reader.list_link_ids(workspace_id, scope).await?;
                cache.fill_collection(token, signature, ids.clone());
                ids
            }
        };

        let resolved = cache.resolve(&ids);
        let missing: Vec<Uuid> = ids
            .iter()
            .zip(&resolved)
            .filter(|(_, slot)| slot.is_none())
            .map(|(id, _)| *id)
            .collect();

        if missing.is_empty() {
            debug!(signature = %signature, count = ids.len(), "Served links from cache");
            return Ok(resolved.into_iter().flatten().collect());
        }

        counter!(METRIC_PARTIAL_FILL).increment(1);
        let fetched = self.fetch_links(&missing).await?;
        cache.fill_entities(token, &fetched);

        let mut by_id: HashMap<Uuid, Link> =
            fetched.into_iter().map(|link| (link.id, link)).collect();
        let mut links = Vec::with_capacity(ids.len());
        let mut dropped = 0_usize;
        for (id, slot) in ids.iter().zip(resolved) {
            // A write between the id query and the row fetch can move a row
            // out of the listing.
            let fetched = by_id
                .remove(id)
                .filter(|link| link.in_scope(signature.scope));
            match slot.or(fetched) {
                Some(link) => links.push(link),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            // The collection names rows the store no longer has in this scope.
            warn!(
                signature = %signature,
                dropped,
                "Collection referenced links missing from its scope; dropping entry"
            );
            cache.invalidate_collection(&signature);
        }

        debug!(
            signature = %signature,
            count = links.len(),
            filled = missing.len() - dropped,
            "Served links with read-through fill"
        );
        Ok(links)
    }

    pub async fn create(&self, command: CreateLinkCommand) -> Result<Link, LinkServiceError> {
        let url = validate_link_url(&command.url)?;
        let tags = validate_tags(&command.tags)?;
        self.ensure_workspace(command.workspace_id).await?;

        let params = CreateLinkParams {
            id: Uuid::new_v4(),
            workspace_id: command.workspace_id,
            url,
            title: clean_optional(command.title),
            description: clean_optional(command.description),
            image: clean_optional(command.image),
            author: clean_optional(command.author),
            publisher: clean_optional(command.publisher),
            logo: clean_optional(command.logo),
            is_favorite: command.is_favorite,
            is_deleted: command.is_deleted,
            tags,
        };

        let (id, workspace_id) = (params.id, params.workspace_id);
        match self.writer.insert_link(params).await {
            Ok(link) => {
                if let Some(trigger) = &self.cache_trigger {
                    trigger.link_created(link.id, link.workspace_id);
                }
                Ok(link)
            }
            Err(err) => {
                if err.outcome_unknown()
                    && let Some(trigger) = &self.cache_trigger
                {
                    trigger.link_created(id, workspace_id);
                }
                Err(err.into())
            }
        }
    }

    pub async fn update(&self, id: Uuid, patch: LinkPatch) -> Result<Link, LinkServiceError> {
        let params = UpdateLinkParams {
            id,
            url: patch.url.as_deref().map(validate_link_url).transpose()?,
            title: patch.title.map(clean_optional),
            description: patch.description.map(clean_optional),
            image: patch.image.map(clean_optional),
            author: patch.author.map(clean_optional),
            publisher: patch.publisher.map(clean_optional),
            logo: patch.logo.map(clean_optional),
            is_favorite: patch.is_favorite,
            is_deleted: patch.is_deleted,
            tags: patch.tags.as_deref().map(validate_tags).transpose()?,
        };

        let known_workspace = self.cached_workspace_of(id);
        match self.writer.update_link(params).await {
            Ok(Some(link)) => {
                if let Some(trigger) = &self.cache_trigger {
                    trigger.link_updated(id, Some(link.workspace_id));
                }
                Ok(link)
            }
            Ok(None) => Err(DomainError::not_found("link").into()),
            Err(err) => {
                if err.outcome_unknown()
                    && let Some(trigger) = &self.cache_trigger
                {
                    trigger.link_updated(id, known_workspace);
                }
                Err(err.into())
            }
        }
    }

    /// Permanently remove a link.
    pub async fn delete(&self, id: Uuid) -> Result<(), LinkServiceError> {
        let known_workspace = self.cached_workspace_of(id);
        match self.writer.delete_link(id).await {
            Ok(Some(record)) => {
                if let Some(trigger) = &self.cache_trigger {
                    trigger.link_deleted(id, Some(record.workspace_id));
                }
                Ok(())
            }
            Ok(None) => Err(DomainError::not_found("link").into()),
            Err(err) => {
                if err.outcome_unknown()
                    && let Some(trigger) = &self.cache_trigger
                {
                    trigger.link_deleted(id, known_workspace);
                }
                Err(err.into())
            }
        }
    }

    fn cached_workspace_of(&self, id: Uuid) -> Option<Uuid> {
        self.cache
            .as_deref()
            .and_then(|cache| cache.get_entity(id))
            .map(|link| link.workspace_id)
    }

    async fn ensure_workspace(&self, workspace_id: Uuid) -> Result<(), LinkServiceError> {
        if let Some(cache) = self.cache.as_deref()
            && cache.get_workspace(workspace_id).is_some()
        {
            return Ok(());
        }

        match self.workspaces.find_workspace(workspace_id).await? {
            Some(workspace) => {
                if let Some(cache) = self.cache.as_deref() {
                    cache.put_workspace(workspace);
                }
                Ok(())
            }
            None => Err(DomainError::not_found("workspace").into()),
        }
    }

    async fn fetch_links(&self, ids: &[Uuid]) -> Result<Vec<Link>, RepoError> {
        let records = self.reader.find_links(ids).await?;
        self.attach_tags(records).await
    }

    async fn attach_tags(&self, records: Vec<LinkRecord>) -> Result<Vec<Link>, RepoError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = records.iter().map(|record| record.id).collect();
        let mut tags = self.reader.tags_for_links(&ids).await?;
        Ok(records
            .into_iter()
            .map(|record| {
                let link_tags = tags.remove(&record.id).unwrap_or_default();
                Link::from_record(record, link_tags)
            })
            .collect())
    }
}
