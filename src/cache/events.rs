//! Mutation events that drive invalidation.

use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use uuid::Uuid;

/// Monotonic sequence number assigned to each applied mutation.
pub type Epoch = u64;

/// A committed write that may have changed what the cache holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    LinkCreated {
        link_id: Uuid,
        workspace_id: Uuid,
    },
    /// `workspace_id` is the workspace the link belonged to before the write,
    /// or `None` when the caller could not establish it.
    LinkUpdated {
        link_id: Uuid,
        workspace_id: Option<Uuid>,
    },
    LinkDeleted {
        link_id: Uuid,
        workspace_id: Option<Uuid>,
    },
    WorkspaceCreated {
        workspace_id: Uuid,
    },
    WorkspaceRenamed {
        workspace_id: Uuid,
    },
    WorkspaceDeleted {
        workspace_id: Uuid,
    },
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::LinkCreated { .. } => "link_created",
            Mutation::LinkUpdated { .. } => "link_updated",
            Mutation::LinkDeleted { .. } => "link_deleted",
            Mutation::WorkspaceCreated { .. } => "workspace_created",
            Mutation::WorkspaceRenamed { .. } => "workspace_renamed",
            Mutation::WorkspaceDeleted { .. } => "workspace_deleted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MutationEvent {
    pub epoch: Epoch,
    pub mutation: Mutation,
    pub recorded_at: OffsetDateTime,
}

/// Hands out epochs in strictly increasing order.
#[derive(Debug, Default)]
pub struct EpochCounter {
    next: AtomicU64,
}

impl EpochCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, mutation: Mutation) -> MutationEvent {
        MutationEvent {
            epoch: self.next.fetch_add(1, Ordering::SeqCst),
            mutation,
            recorded_at: OffsetDateTime::now_utc(),
        }
    }

    /// Number of mutations recorded so far.
    pub fn current(&self) -> Epoch {
        self.next.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epochs_are_monotonic() {
        let counter = EpochCounter::new();
        let mutation = Mutation::WorkspaceCreated {
            workspace_id: Uuid::nil(),
        };
        let first = counter.record(mutation);
        let second = counter.record(mutation);
        assert!(first.epoch < second.epoch);
        assert_eq!(counter.current(), 2);
    }
}
