pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::RequestContext;

use axum::{Router, middleware as axum_middleware};

/// The complete HTTP surface: API routes plus request-id stamping.
pub fn build_router(state: ApiState) -> Router {
    build_api_router(state).layer(axum_middleware::from_fn(middleware::set_request_context))
}
