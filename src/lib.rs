//! Annota Server
//!
//! PDF annotation editor backend: sticky notes, freehand ink and text labels
//! are collected per session over HTTP and composited into page 1 of the
//! uploaded PDF on export.

pub mod annotations;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod overlay;
pub mod routes;
pub mod session;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use state::AppState;

/// Build the application router (without the HTTP layers `main` adds)
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config().server.max_upload_bytes();

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1/health", routes::health::router())
        .nest("/api/v1/sessions", routes::sessions_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
