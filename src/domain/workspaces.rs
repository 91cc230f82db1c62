//! Workspace entities.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::datetime;
use uuid::Uuid;

use super::error::DomainError;

/// Identifier of the workspace seeded on first start.
pub const DEFAULT_WORKSPACE_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001);
pub const DEFAULT_WORKSPACE_NAME: &str = "My Workspace";
pub const DEFAULT_WORKSPACE_SLUG: &str = "my-workspace";
pub const DEFAULT_WORKSPACE_CREATED_AT: OffsetDateTime = datetime!(2024-02-21 10:40 UTC);

const NAME_MAX_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl WorkspaceRecord {
    pub fn default_workspace() -> Self {
        Self {
            id: DEFAULT_WORKSPACE_ID,
            name: DEFAULT_WORKSPACE_NAME.to_string(),
            slug: DEFAULT_WORKSPACE_SLUG.to_string(),
            created_at: DEFAULT_WORKSPACE_CREATED_AT,
        }
    }
}

/// Workspace listing entry; `link_count` excludes soft-deleted links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceWithCount {
    #[serde(flatten)]
    pub workspace: WorkspaceRecord,
    pub link_count: u64,
}

pub fn validate_workspace_name(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name", "must not be empty"));
    }
    if trimmed.chars().count() > NAME_MAX_CHARS {
        return Err(DomainError::validation(
            "name",
            format!("must be at most {NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_workspace_name("  Reading  ").unwrap(), "Reading");
        assert!(validate_workspace_name("   ").is_err());
        assert!(validate_workspace_name(&"x".repeat(NAME_MAX_CHARS + 1)).is_err());
    }

    #[test]
    fn listing_entry_flattens_workspace() {
        let entry = WorkspaceWithCount {
            workspace: WorkspaceRecord::default_workspace(),
            link_count: 3,
        };
        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["slug"], serde_json::json!("my-workspace"));
        assert_eq!(value["linkCount"], serde_json::json!(3));
        assert!(value.get("workspace").is_none());
    }
}
