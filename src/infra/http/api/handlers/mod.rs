//! API handlers organized by resource type.
//!
//! Error conversions shared by the resource modules live here.

mod links;
mod workspaces;

pub use links::*;
pub use workspaces::*;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::links::LinkServiceError;
use crate::application::repos::RepoError;
use crate::application::workspaces::WorkspaceServiceError;
use crate::domain::error::DomainError;
use crate::domain::slug::SlugError;

use super::error::{ApiError, codes};
use super::models::HealthResponse;
use super::state::ApiState;

pub async fn health(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    state.health.health_check().await.map_err(|err| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::UNAVAILABLE,
            "Backing store unavailable",
            Some(err.to_string()),
        )
    })?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("route not found")
}

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

pub(crate) fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::NotFound { entity } => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            format!("{entity} not found"),
            None,
        ),
        DomainError::Validation { field, message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::VALIDATION,
            format!("invalid {field}"),
            Some(message),
        ),
        DomainError::LastWorkspace => ApiError::new(
            StatusCode::CONFLICT,
            codes::LAST_WORKSPACE,
            "The last remaining workspace cannot be deleted",
            None,
        ),
    }
}

pub(crate) fn link_to_api(err: LinkServiceError) -> ApiError {
    match err {
        LinkServiceError::Domain(domain) => domain_to_api(domain),
        LinkServiceError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn workspace_to_api(err: WorkspaceServiceError) -> ApiError {
    match err {
        WorkspaceServiceError::Domain(domain) => domain_to_api(domain),
        WorkspaceServiceError::Repo(repo) => repo_to_api(repo),
        WorkspaceServiceError::Slug(SlugError::Exhausted { base }) => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Could not derive a unique slug",
            Some(base),
        ),
        WorkspaceServiceError::Slug(slug) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::VALIDATION,
            "invalid name",
            Some(slug.to_string()),
        ),
    }
}

pub(crate) fn json_rejection_to_api(rejection: JsonRejection) -> ApiError {
    ApiError::new(
        rejection.status(),
        codes::BAD_REQUEST,
        "Malformed JSON body",
        Some(rejection.body_text()),
    )
}

pub(crate) fn query_rejection_to_api(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request("Malformed query string", Some(rejection.body_text()))
}

pub(crate) fn path_rejection_to_api(rejection: PathRejection) -> ApiError {
    ApiError::bad_request("Malformed path parameter", Some(rejection.body_text()))
}
