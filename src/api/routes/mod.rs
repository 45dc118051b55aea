//! API route modules.

pub mod health;
pub mod video;

use axum::Router;

use crate::api::server::AppState;

/// Create the API router; everything lives under `/api`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", video::router().merge(health::router()))
        .with_state(state)
}
