pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch},
};

use crate::infra::http::middleware::log_responses;

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/links",
            get(handlers::list_links).post(handlers::create_link),
        )
        .route(
            "/api/links/{id}",
            patch(handlers::update_link).delete(handlers::delete_link),
        )
        .route(
            "/api/workspaces",
            get(handlers::list_workspaces).post(handlers::create_workspace),
        )
        .route(
            "/api/workspaces/{id}",
            patch(handlers::rename_workspace).delete(handlers::delete_workspace),
        )
        .route("/api/health", get(handlers::health))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
}
