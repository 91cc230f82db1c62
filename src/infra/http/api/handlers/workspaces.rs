//! Workspace handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::workspaces::CreateWorkspaceCommand;

use super::{json_rejection_to_api, path_rejection_to_api, workspace_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_workspaces(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let workspaces = state.workspaces.list().await.map_err(workspace_to_api)?;
    Ok(Json(workspaces))
}

pub async fn create_workspace(
    State(state): State<ApiState>,
    payload: Result<Json<WorkspaceCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(json_rejection_to_api)?;
    let workspace = state
        .workspaces
        .create(CreateWorkspaceCommand {
            id: payload.id,
            name: payload.name,
        })
        .await
        .map_err(workspace_to_api)?;

    Ok((StatusCode::CREATED, Json(workspace)))
}

pub async fn rename_workspace(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<WorkspaceUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_rejection_to_api)?;
    let Json(payload) = payload.map_err(json_rejection_to_api)?;
    let workspace = state
        .workspaces
        .rename(id, &payload.name)
        .await
        .map_err(workspace_to_api)?;

    Ok(Json(workspace))
}

pub async fn delete_workspace(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id.map_err(path_rejection_to_api)?;
    state
        .workspaces
        .delete(id)
        .await
        .map_err(workspace_to_api)?;

    Ok(Json(SuccessResponse::ok()))
}
