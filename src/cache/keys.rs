//! Cache key types.

use std::fmt;

use uuid::Uuid;

use crate::domain::types::{Category, LinkScope};

/// Identity of a link listing: workspace plus scope. Two signatures are equal
/// exactly when both components are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuerySignature {
    pub workspace_id: Uuid,
    pub scope: LinkScope,
}

impl QuerySignature {
    pub fn new(workspace_id: Uuid, scope: LinkScope) -> Self {
        Self {
            workspace_id,
            scope,
        }
    }

    pub fn category(workspace_id: Uuid, category: Category) -> Self {
        Self::new(workspace_id, LinkScope::Category(category))
    }

    pub fn all(workspace_id: Uuid) -> Self {
        Self::new(workspace_id, LinkScope::All)
    }

    pub fn belongs_to(&self, workspace_id: Uuid) -> bool {
        self.workspace_id == workspace_id
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws:{}:{}", self.workspace_id, self.scope)
    }
}
