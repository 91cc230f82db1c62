use tracing::warn;
use uuid::Uuid;

use crate::domain::links::Link;

use super::error::ClientError;

/// Hooks the optimistic store calls after its list changes.
///
/// Derived state (filtered views, tag lists) is recomputed from
/// `links_changed`. Failures are reported exactly once per rolled-back
/// mutation through `mutation_failed`.
pub trait LinkListObserver: Send + Sync {
    fn links_changed(&self, _links: &[Link]) {}

    fn mutation_failed(&self, operation: &'static str, link_id: Option<Uuid>, error: &ClientError) {
        warn!(
            target: "linkstash::client",
            operation,
            link_id = ?link_id,
            error = %error,
            "optimistic mutation rolled back"
        );
    }

    fn fetch_failed(&self, workspace_id: Uuid, error: &ClientError) {
        warn!(
            target: "linkstash::client",
            %workspace_id,
            error = %error,
            "failed to load links"
        );
    }
}

/// Logs failures and ignores list changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl LinkListObserver for LoggingObserver {}
