use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::application::links::{CreateLinkCommand, LinkPatch};
use crate::domain::links::Link;

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkListQuery {
    pub workspace_id: Option<Uuid>,
    pub category: Option<String>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCreateRequest {
    pub workspace_id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub logo: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<LinkCreateRequest> for CreateLinkCommand {
    fn from(request: LinkCreateRequest) -> Self {
        Self {
            workspace_id: request.workspace_id,
            url: request.url,
            title: request.title,
            description: request.description,
            image: request.image,
            author: request.author,
            publisher: request.publisher,
            logo: request.logo,
            is_favorite: request.is_favorite,
            is_deleted: request.is_deleted,
            tags: request.tags,
        }
    }
}

/// Omitted fields are left untouched; `tags`, when present, replaces the set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub publisher: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub logo: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl From<LinkUpdateRequest> for LinkPatch {
    fn from(request: LinkUpdateRequest) -> Self {
        Self {
            url: request.url,
            title: request.title,
            description: request.description,
            image: request.image,
            author: request.author,
            publisher: request.publisher,
            logo: request.logo,
            is_favorite: request.is_favorite,
            is_deleted: request.is_deleted,
            tags: request.tags,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkUpdateResponse {
    pub success: bool,
    pub link: Link,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WorkspaceCreateRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WorkspaceUpdateRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
