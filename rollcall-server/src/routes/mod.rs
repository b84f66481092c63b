pub mod v1;

use axum::{Router, routing::get};
use rollcall_model::api::routes;

use crate::{handlers::health_handler, infra::app_state::AppState};

/// Create the main API router with all versions
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health_handler))
        .merge(v1::create_v1_router())
        .with_state(state)
}
