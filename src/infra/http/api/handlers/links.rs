//! Link handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::domain::types::{Category, LinkScope};

use super::{json_rejection_to_api, link_to_api, path_rejection_to_api, query_rejection_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_links(
    State(state): State<ApiState>,
    query: Result<Query<LinkListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(query_rejection_to_api)?;
    let workspace_id = query
        .workspace_id
        .ok_or_else(|| ApiError::bad_request("workspaceId required", None))?;

    let scope = if query.all {
        LinkScope::All
    } else {
        let category = match query.category.as_deref() {
            None | Some("") => Category::default(),
            Some(raw) => raw.parse::<Category>().map_err(|_| {
                ApiError::bad_request(
                    "unknown category",
                    Some(format!("`{raw}` is not one of inbox, favorites, trash")),
                )
            })?,
        };
        LinkScope::Category(category)
    };

    let links = state
        .links
        .list(workspace_id, scope)
        .await
        .map_err(link_to_api)?;

    Ok(Json(links))
}

pub async fn create_link(
    State(state): State<ApiState>,
    payload: Result<Json<LinkCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_rejection_to_api)?;
    let link = state
        .links
        .create(payload.into())
        .await
        .map_err(link_to_api)?;

    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn update_link(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<LinkUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_rejection_to_api)?;
    let Json(payload) = payload.map_err(json_rejection_to_api)?;
    let link = state
        .links
        .update(id, payload.into())
        .await
        .map_err(link_to_api)?;

    Ok(Json(LinkUpdateResponse {
        success: true,
        link,
    }))
}

pub async fn delete_link(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_rejection_to_api)?;
    state.links.delete(id).await.map_err(link_to_api)?;

    Ok(Json(SuccessResponse::ok()))
}
