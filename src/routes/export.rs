//! Export Routes
//!
//! - POST /api/v1/sessions/:id/export - Composite annotations and download

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::geometry::RenderedLayout;
use crate::state::AppState;

/// Optional export body.
///
/// `layout` carries the sizes the client measured for page 1; without it the
/// overlay surface size is used.
#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub layout: Option<RenderedLayout>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/export", post(export_pdf))
}

/// POST /api/v1/sessions/:id/export
async fn export_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<ExportRequest>>,
) -> Result<impl IntoResponse> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let bytes = state
        .sessions()
        .export(id, request.layout, state.fonts(), state.export_options())
        .await?;

    let file_name = state.config().export.file_name.replace('"', "");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    ))
}
