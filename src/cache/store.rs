//! In-memory collection cache.
//!
//! Holds three maps: link snapshots keyed by id, ordered id lists keyed by
//! [`QuerySignature`], and workspace records keyed by id. All three are LRU
//! bounded; an evicted collection or snapshot is simply refilled by the next
//! read-through.
//!
//! Fills coming from a store read are guarded by a [`FillToken`]. The token is
//! taken before the store is queried; if an invalidation touching the same
//! workspace lands in between, the fill is discarded instead of caching rows
//! that may predate the write.

use std::collections::HashMap;
use std::sync::RwLock;

use lru::LruCache;
use metrics::counter;
use tracing::debug;
use uuid::Uuid;

use crate::domain::links::Link;
use crate::domain::workspaces::WorkspaceRecord;

use super::config::CacheConfig;
use super::keys::QuerySignature;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_FULL_CLEAR: &str = "linkstash_cache_full_clear_total";

#[derive(Debug, Default)]
struct Generations {
    global: u64,
    per_workspace: HashMap<Uuid, u64>,
}

impl Generations {
    fn token(&self, workspace_id: Uuid) -> FillToken {
        FillToken {
            workspace_id,
            global: self.global,
            workspace: self.per_workspace.get(&workspace_id).copied().unwrap_or(0),
        }
    }

    fn bump_workspace(&mut self, workspace_id: Uuid) {
        *self.per_workspace.entry(workspace_id).or_insert(0) += 1;
    }

    fn bump_global(&mut self) {
        self.global += 1;
    }
}

/// Snapshot of the invalidation generation for one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillToken {
    workspace_id: Uuid,
    global: u64,
    workspace: u64,
}

impl FillToken {
    pub fn workspace_id(&self) -> Uuid {
        self.workspace_id
    }
}

pub struct CollectionCache {
    // Lock order: `generations` before any of the maps.
    generations: RwLock<Generations>,
    links: RwLock<LruCache<Uuid, Link>>,
    collections: RwLock<LruCache<QuerySignature, Vec<Uuid>>>,
    workspaces: RwLock<LruCache<Uuid, WorkspaceRecord>>,
}

impl CollectionCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            generations: RwLock::new(Generations::default()),
            links: RwLock::new(LruCache::new(config.link_limit_non_zero())),
            collections: RwLock::new(LruCache::new(config.collection_limit_non_zero())),
            workspaces: RwLock::new(LruCache::new(config.workspace_limit_non_zero())),
        }
    }

    // ------------------------------------------------------------------
    // Link snapshots
    // ------------------------------------------------------------------

    pub fn get_entity(&self, id: Uuid) -> Option<Link> {
        rw_write(&self.links, SOURCE, "get_entity").get(&id).cloned()
    }

    pub fn put_entity(&self, link: Link) {
        rw_write(&self.links, SOURCE, "put_entity").put(link.id, link);
    }

    /// Resolve ids against held snapshots, preserving order. Positions that
    /// are not cached come back as `None`.
    pub fn resolve(&self, ids: &[Uuid]) -> Vec<Option<Link>> {
        let mut links = rw_write(&self.links, SOURCE, "resolve");
        ids.iter().map(|id| links.get(id).cloned()).collect()
    }

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    pub fn get_collection(&self, signature: &QuerySignature) -> Option<Vec<Uuid>> {
        rw_write(&self.collections, SOURCE, "get_collection")
            .get(signature)
            .cloned()
    }

    pub fn put_collection(&self, signature: QuerySignature, ids: Vec<Uuid>) {
        rw_write(&self.collections, SOURCE, "put_collection").put(signature, ids);
    }

    /// Drop one collection entry, typically after it was found to reference
    /// an id the store no longer has.
    pub fn invalidate_collection(&self, signature: &QuerySignature) {
        let mut generations = rw_write(&self.generations, SOURCE, "invalidate_collection");
        generations.bump_workspace(signature.workspace_id);
        rw_write(&self.collections, SOURCE, "invalidate_collection").pop(signature);
        debug!(signature = %signature, "Collection entry invalidated");
    }

    // ------------------------------------------------------------------
    // Guarded fills
    // ------------------------------------------------------------------

    pub fn fill_token(&self, workspace_id: Uuid) -> FillToken {
        rw_read(&self.generations, SOURCE, "fill_token").token(workspace_id)
    }

    /// Store snapshots read from the backing store under `token`.
    /// Returns `false` when the fill was discarded as stale.
    pub fn fill_entities(&self, token: FillToken, links: &[Link]) -> bool {
        let generations = rw_read(&self.generations, SOURCE, "fill_entities");
        if generations.token(token.workspace_id) != token {
            debug!(workspace_id = %token.workspace_id, "Stale snapshot fill discarded");
            return false;
        }
        let mut cache = rw_write(&self.links, SOURCE, "fill_entities");
        for link in links {
            cache.put(link.id, link.clone());
        }
        true
    }

    /// Store a collection read from the backing store under `token`.
    /// Returns `false` when the fill was discarded as stale.
    pub fn fill_collection(
        &self,
        token: FillToken,
        signature: QuerySignature,
        ids: Vec<Uuid>,
    ) -> bool {
        let generations = rw_read(&self.generations, SOURCE, "fill_collection");
        if generations.token(signature.workspace_id) != token {
            debug!(signature = %signature, "Stale collection fill discarded");
            return false;
        }
        rw_write(&self.collections, SOURCE, "fill_collection").put(signature, ids);
        true
    }

    // ------------------------------------------------------------------
    // Workspaces
    // ------------------------------------------------------------------

    pub fn get_workspace(&self, id: Uuid) -> Option<WorkspaceRecord> {
        rw_write(&self.workspaces, SOURCE, "get_workspace")
            .get(&id)
            .cloned()
    }

    pub fn put_workspace(&self, workspace: WorkspaceRecord) {
        rw_write(&self.workspaces, SOURCE, "put_workspace").put(workspace.id, workspace);
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Remove a link snapshot together with the collections that could list it.
    ///
    /// With a known workspace only that workspace's collections are dropped.
    /// Without one every collection goes, which is always safe but costs a
    /// rebuild of unrelated listings; it is counted separately so regressions
    /// towards the fallback show up in metrics.
    pub fn invalidate_entity(&self, id: Uuid, workspace_id: Option<Uuid>) {
        let mut generations = rw_write(&self.generations, SOURCE, "invalidate_entity");
        match workspace_id {
            Some(workspace_id) => generations.bump_workspace(workspace_id),
            None => generations.bump_global(),
        }

        rw_write(&self.links, SOURCE, "invalidate_entity.links").pop(&id);

        let mut collections = rw_write(&self.collections, SOURCE, "invalidate_entity.collections");
        match workspace_id {
            Some(workspace_id) => {
                let removed = pop_workspace_collections(&mut collections, workspace_id);
                debug!(link_id = %id, workspace_id = %workspace_id, removed, "Link invalidated");
            }
            None => {
                let removed = collections.len();
                collections.clear();
                counter!(METRIC_FULL_CLEAR).increment(1);
                debug!(link_id = %id, removed, "Link invalidated without workspace; collections cleared");
            }
        }
    }

    /// Remove a workspace record, its link snapshots and every collection
    /// scoped to it.
    pub fn invalidate_workspace(&self, workspace_id: Uuid) {
        let mut generations = rw_write(&self.generations, SOURCE, "invalidate_workspace");
        generations.bump_workspace(workspace_id);

        rw_write(&self.workspaces, SOURCE, "invalidate_workspace.record").pop(&workspace_id);

        let mut links = rw_write(&self.links, SOURCE, "invalidate_workspace.links");
        let owned: Vec<Uuid> = links
            .iter()
            .filter(|(_, link)| link.workspace_id == workspace_id)
            .map(|(id, _)| *id)
            .collect();
        for id in &owned {
            links.pop(id);
        }
        drop(links);

        let mut collections =
            rw_write(&self.collections, SOURCE, "invalidate_workspace.collections");
        let removed = pop_workspace_collections(&mut collections, workspace_id);
        debug!(
            workspace_id = %workspace_id,
            removed,
            snapshots = owned.len(),
            "Workspace invalidated"
        );
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut generations = rw_write(&self.generations, SOURCE, "clear");
        generations.bump_global();

        rw_write(&self.links, SOURCE, "clear.links").clear();
        rw_write(&self.collections, SOURCE, "clear.collections").clear();
        rw_write(&self.workspaces, SOURCE, "clear.workspaces").clear();
        debug!("Cache cleared");
    }

    pub fn link_count(&self) -> usize {
        rw_read(&self.links, SOURCE, "link_count").len()
    }

    pub fn collection_count(&self) -> usize {
        rw_read(&self.collections, SOURCE, "collection_count").len()
    }

    /// Whether any held collection of `workspace_id` lists `id`.
    pub fn workspace_lists(&self, workspace_id: Uuid, id: Uuid) -> bool {
        rw_read(&self.collections, SOURCE, "workspace_lists")
            .iter()
            .any(|(signature, ids)| signature.belongs_to(workspace_id) && ids.contains(&id))
    }
}

fn pop_workspace_collections(
    collections: &mut LruCache<QuerySignature, Vec<Uuid>>,
    workspace_id: Uuid,
) -> usize {
    let doomed: Vec<QuerySignature> = collections
        .iter()
        .filter(|(signature, _)| signature.belongs_to(workspace_id))
        .map(|(signature, _)| *signature)
        .collect();
    for signature in &doomed {
        collections.pop(signature);
    }
    doomed.len()
}
