//! # Rollcall Server
//!
//! JSON RPC surface of the Rollcall account directory.
//!
//! Every route is a thin adapter over [`rollcall_core::AccountService`];
//! responses use the `ApiResponse` envelope and errors are mapped to HTTP
//! statuses in [`infra::errors`].

pub mod handlers;
pub mod infra;
pub mod routes;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use infra::app_state::AppState;

/// Full application router with tracing and CORS layers applied.
pub fn create_app(state: AppState) -> Router {
    routes::create_api_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}
