//! Cache trigger service.
//!
//! Write paths call into the trigger after their store transaction has
//! committed. Plans run synchronously, so by the time the write returns to its
//! caller no reader can be handed an entry the write made stale.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info};
use uuid::Uuid;

use super::config::CacheConfig;
use super::events::{EpochCounter, Mutation};
use super::planner::InvalidationPlan;
use super::store::CollectionCache;

pub(crate) const METRIC_INVALIDATION: &str = "linkstash_cache_invalidation_total";

pub struct CacheTrigger {
    config: CacheConfig,
    cache: Arc<CollectionCache>,
    epochs: EpochCounter,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, cache: Arc<CollectionCache>) -> Self {
        Self {
            config,
            cache,
            epochs: EpochCounter::new(),
        }
    }

    /// Plan and apply the invalidation for a committed mutation.
    pub fn trigger(&self, mutation: Mutation) {
        if !self.config.is_enabled() {
            debug!(mutation = mutation.name(), "Cache trigger skipped: cache disabled");
            return;
        }

        let event = self.epochs.record(mutation);
        let plan = InvalidationPlan::for_mutation(&event.mutation);

        info!(
            epoch = event.epoch,
            mutation = event.mutation.name(),
            plan = %plan,
            recorded_at = %event.recorded_at,
            "Applying cache invalidation"
        );

        plan.execute(&self.cache);
        counter!(METRIC_INVALIDATION, "plan" => plan.label()).increment(1);
    }

    pub fn link_created(&self, link_id: Uuid, workspace_id: Uuid) {
        self.trigger(Mutation::LinkCreated {
            link_id,
            workspace_id,
        });
    }

    pub fn link_updated(&self, link_id: Uuid, workspace_id: Option<Uuid>) {
        self.trigger(Mutation::LinkUpdated {
            link_id,
            workspace_id,
        });
    }

    pub fn link_deleted(&self, link_id: Uuid, workspace_id: Option<Uuid>) {
        self.trigger(Mutation::LinkDeleted {
            link_id,
            workspace_id,
        });
    }

    pub fn workspace_created(&self, workspace_id: Uuid) {
        self.trigger(Mutation::WorkspaceCreated { workspace_id });
    }

    pub fn workspace_renamed(&self, workspace_id: Uuid) {
        self.trigger(Mutation::WorkspaceRenamed { workspace_id });
    }

    pub fn workspace_deleted(&self, workspace_id: Uuid) {
        self.trigger(Mutation::WorkspaceDeleted { workspace_id });
    }

    pub fn cache(&self) -> &Arc<CollectionCache> {
        &self.cache
    }

    /// Number of mutations applied since startup.
    pub fn applied(&self) -> u64 {
        self.epochs.current()
    }
}
