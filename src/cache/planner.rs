//! Invalidation policy.
//!
//! Maps each committed mutation to the cache entries it may have made wrong.

use std::fmt;

use uuid::Uuid;

use super::events::Mutation;
use super::store::CollectionCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationPlan {
    /// Drop one link snapshot and the collections that could list it:
    /// those of `workspace_id`, or all of them when the workspace is unknown.
    Entity {
        link_id: Uuid,
        workspace_id: Option<Uuid>,
    },
    /// Drop every entry.
    ClearAll,
}

impl InvalidationPlan {
    pub fn for_mutation(mutation: &Mutation) -> Self {
        match *mutation {
            Mutation::LinkCreated {
                link_id,
                workspace_id,
            } => InvalidationPlan::Entity {
                link_id,
                workspace_id: Some(workspace_id),
            },
            Mutation::LinkUpdated {
                link_id,
                workspace_id,
            }
            | Mutation::LinkDeleted {
                link_id,
                workspace_id,
            } => InvalidationPlan::Entity {
                link_id,
                workspace_id,
            },
            // Workspace changes alter counts and slugs that many entries
            // depend on; they are rare enough to drop everything.
            Mutation::WorkspaceCreated { .. }
            | Mutation::WorkspaceRenamed { .. }
            | Mutation::WorkspaceDeleted { .. } => InvalidationPlan::ClearAll,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            InvalidationPlan::Entity {
                workspace_id: Some(_),
                ..
            } => "entity_scoped",
            InvalidationPlan::Entity {
                workspace_id: None, ..
            } => "entity_unscoped",
            InvalidationPlan::ClearAll => "clear_all",
        }
    }

    pub fn execute(&self, cache: &CollectionCache) {
        match *self {
            InvalidationPlan::Entity {
                link_id,
                workspace_id,
            } => cache.invalidate_entity(link_id, workspace_id),
            InvalidationPlan::ClearAll => cache.clear(),
        }
    }
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationPlan::Entity {
                link_id,
                workspace_id: Some(workspace_id),
            } => write!(f, "entity {link_id} in {workspace_id}"),
            InvalidationPlan::Entity {
                link_id,
                workspace_id: None,
            } => write!(f, "entity {link_id} in unknown workspace"),
            InvalidationPlan::ClearAll => f.write_str("clear all"),
        }
    }
}
