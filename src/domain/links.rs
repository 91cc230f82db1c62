//! Link entities and their invariants.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use super::error::DomainError;
use super::types::LinkScope;

/// Maximum number of tags a single link may carry.
pub const TAG_LIMIT: usize = 10;

/// A link row as persisted, without its tag associations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub id: Uuid,
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
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A link together with its full tag set. This is the snapshot the cache
/// holds and the shape that crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Link {
    /// Attach a tag set to a persisted row. Tags are sorted for display.
    pub fn from_record(record: LinkRecord, mut tags: Vec<String>) -> Self {
        tags.sort();
        tags.dedup();
        Self {
            id: record.id,
            workspace_id: record.workspace_id,
            url: record.url,
            title: record.title,
            description: record.description,
            image: record.image,
            author: record.author,
            publisher: record.publisher,
            logo: record.logo,
            is_favorite: record.is_favorite,
            is_deleted: record.is_deleted,
            created_at: record.created_at,
            updated_at: record.updated_at,
            tags,
        }
    }

    pub fn in_scope(&self, scope: LinkScope) -> bool {
        scope.admits(self.is_favorite, self.is_deleted)
    }

    /// Stored tags are normalized, so `tag` is compared the same way.
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim().to_lowercase();
        self.tags.iter().any(|candidate| *candidate == wanted)
    }
}

/// Newest-first ordering with the identifier as a deterministic tie breaker.
pub fn newest_first(
    a_created: OffsetDateTime,
    a_id: Uuid,
    b_created: OffsetDateTime,
    b_id: Uuid,
) -> std::cmp::Ordering {
    b_created.cmp(&a_created).then_with(|| a_id.cmp(&b_id))
}

/// Lowercase, trim and deduplicate tag labels. The result is sorted.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = tags
        .into_iter()
        .map(|tag| tag.as_ref().trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

/// Normalize and bound a tag list supplied by a caller.
pub fn validate_tags<I, S>(tags: I) -> Result<Vec<String>, DomainError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let normalized = normalize_tags(tags);
    if normalized.len() > TAG_LIMIT {
        return Err(DomainError::validation(
            "tags",
            format!("at most {TAG_LIMIT} tags are allowed"),
        ));
    }
    Ok(normalized)
}

/// Accept only absolute http(s) URLs.
pub fn validate_link_url(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("url", "must not be empty"));
    }
    let parsed =
        Url::parse(trimmed).map_err(|err| DomainError::validation("url", err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        other => Err(DomainError::validation(
            "url",
            format!("unsupported scheme `{other}`"),
        )),
    }
}

/// Collapse blank optional text to `None`.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn tags_are_case_normalized_and_deduplicated() {
        let tags = normalize_tags(["Rust", " rust ", "Infra", "", "infra"]);
        assert_eq!(tags, vec!["infra".to_string(), "rust".to_string()]);
    }

    #[test]
    fn too_many_tags_are_rejected() {
        let tags: Vec<String> = (0..=TAG_LIMIT).map(|i| format!("tag-{i}")).collect();
        assert!(matches!(
            validate_tags(tags),
            Err(DomainError::Validation { field: "tags", .. })
        ));
    }

    #[test]
    fn url_validation_requires_http_scheme() {
        assert_eq!(
            validate_link_url(" https://example.com ").expect("valid url"),
            "https://example.com/"
        );
        assert!(validate_link_url("ftp://example.com").is_err());
        assert!(validate_link_url("not a url").is_err());
        assert!(validate_link_url("   ").is_err());
    }

    #[test]
    fn newest_first_breaks_ties_by_id() {
        let at = datetime!(2024-02-21 10:00 UTC);
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        assert_eq!(newest_first(at, a, at, b), std::cmp::Ordering::Less);
        let later = datetime!(2024-02-21 11:00 UTC);
        assert_eq!(newest_first(at, a, later, b), std::cmp::Ordering::Greater);
    }

    #[test]
    fn link_serializes_camel_case() {
        let at = datetime!(2024-02-21 10:00 UTC);
        let record = LinkRecord {
            id: Uuid::nil(),
            workspace_id: Uuid::nil(),
            url: "https://example.com/".to_string(),
            title: Some("Example".to_string()),
            description: None,
            image: None,
            author: None,
            publisher: None,
            logo: None,
            is_favorite: true,
            is_deleted: false,
            created_at: at,
            updated_at: at,
        };
        let link = Link::from_record(record, vec!["b".into(), "a".into()]);
        let value = serde_json::to_value(&link).expect("serialize");
        assert_eq!(value["isFavorite"], serde_json::json!(true));
        assert_eq!(value["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(value["createdAt"], serde_json::json!("2024-02-21T10:00:00Z"));
    }
}
