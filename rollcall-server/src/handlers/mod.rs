pub mod accounts;
pub mod auth;

use axum::{Json, extract::State};
use rollcall_model::api::ApiResponse;
use serde::Serialize;

use crate::infra::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub backend: &'static str,
}

/// Liveness only; the backend is not contacted.
pub async fn health_handler(
    State(state): State<AppState>,
) -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        backend: state.accounts.store().backend_name(),
    }))
}
