//! Route modules for Annota Server

pub mod annotations;
pub mod export;
pub mod health;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

/// Everything under `/api/v1/sessions`
pub fn sessions_router() -> Router<AppState> {
    sessions::router()
        .merge(annotations::router())
        .merge(export::router())
}
