//! Session Routes
//!
//! Endpoints:
//! - POST /api/v1/sessions - Create an empty session
//! - POST /api/v1/sessions/upload - Multipart upload into a new session
//! - GET /api/v1/sessions/:id - Session summary
//! - DELETE /api/v1/sessions/:id - Drop a session
//! - PUT /api/v1/sessions/:id/document - Load a file (raw body)
//! - GET /api/v1/sessions/:id/document - Original document bytes
//! - DELETE /api/v1/sessions/:id/document - Clear document and annotations
//! - PUT /api/v1/sessions/:id/mode - Set the active tool
//! - PUT /api/v1/sessions/:id/surface - Size the overlay surface
//! - GET /api/v1/sessions/:id/notifications - Drain pending notifications

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::geometry::Size;
use crate::overlay::OverlaySurface;
use crate::session::{Mode, Notification, SessionError, SessionSummary};
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    /// False when the file was ignored because it is not a PDF
    pub accepted: bool,
    pub session: SessionSummary,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: Mode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceRequest {
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_dpr")]
    pub device_pixel_ratio: f32,
}

fn default_dpr() -> f32 {
    1.0
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/upload", post(upload_document))
        .route("/:id", get(get_session).delete(delete_session))
        .route(
            "/:id/document",
            put(load_document).get(get_document).delete(clear_document),
        )
        .route("/:id/mode", put(set_mode))
        .route("/:id/surface", put(resize_surface))
        .route("/:id/notifications", get(drain_notifications))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/sessions
async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionSummary>) {
    let summary = state.sessions().create_session().await;
    (StatusCode::CREATED, Json(summary))
}

/// POST /api/v1/sessions/upload
///
/// Multipart upload (field `file` or `pdf`). Creates a session and loads the
/// file into it; a non-PDF part still creates the session but is ignored.
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<LoadResponse>)> {
    tracing::debug!("Starting document upload processing");

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read upload: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" && name != "pdf" {
            tracing::debug!("Skipping multipart field '{}'", name);
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().unwrap_or("").to_string();
        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read file data: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        tracing::debug!(
            "Read {} bytes of file data, content_type={}",
            data.len(),
            content_type
        );

        let id = state.sessions().create_session().await.id;
        let (accepted, session) = state
            .sessions()
            .with_session(id, |s| {
                let accepted = s.load_file(&content_type, file_name, data.to_vec());
                (accepted, s.summary())
            })
            .await?;

        return Ok((StatusCode::CREATED, Json(LoadResponse { accepted, session })));
    }

    tracing::warn!("No file field found in multipart upload");
    Err(AppError::BadRequest(
        "No file provided. Use field name 'file' or 'pdf'".to_string(),
    ))
}

/// GET /api/v1/sessions/:id
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    let summary = state.sessions().read_session(id, |s| s.summary()).await?;
    Ok(Json(summary))
}

/// DELETE /api/v1/sessions/:id
async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.sessions().remove_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/sessions/:id/document
///
/// The raw body is the file; its `Content-Type` decides whether it is taken.
async fn load_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<LoadResponse>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let file_name = headers
        .get("X-File-Name")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let (accepted, session) = state
        .sessions()
        .with_session(id, |s| {
            let accepted = s.load_file(&content_type, file_name, body.to_vec());
            (accepted, s.summary())
        })
        .await?;

    Ok(Json(LoadResponse { accepted, session }))
}

/// GET /api/v1/sessions/:id/document
async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response> {
    let document = state
        .sessions()
        .read_session(id, |s| s.document().cloned())
        .await?
        .ok_or(SessionError::NoDocument)?;

    let etag = format!("\"{}\"", document.info().sha256);
    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == etag)
        .unwrap_or(false);
    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    let disposition = match &document.info().file_name {
        Some(name) => format!("inline; filename=\"{}\"", name.replace('"', "")),
        None => "inline".to_string(),
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::ETAG, etag),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes().to_vec(),
    )
        .into_response())
}

/// DELETE /api/v1/sessions/:id/document
async fn clear_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>> {
    let summary = state
        .sessions()
        .with_session(id, |s| {
            s.clear();
            s.summary()
        })
        .await?;
    Ok(Json(summary))
}

/// PUT /api/v1/sessions/:id/mode
async fn set_mode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ModeRequest>,
) -> Result<Json<SessionSummary>> {
    let summary = state
        .sessions()
        .with_session(id, |s| {
            s.set_mode(request.mode);
            s.summary()
        })
        .await?;
    Ok(Json(summary))
}

/// PUT /api/v1/sessions/:id/surface
async fn resize_surface(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SurfaceRequest>,
) -> Result<Json<OverlaySurface>> {
    let container = Size::new(request.width, request.height);
    let surface = state
        .sessions()
        .with_session(id, |s| s.resize_surface(container, request.device_pixel_ratio))
        .await??;
    Ok(Json(surface))
}

/// GET /api/v1/sessions/:id/notifications
async fn drain_notifications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationsResponse>> {
    let notifications = state
        .sessions()
        .with_session(id, |s| s.drain_notifications())
        .await?;
    Ok(Json(NotificationsResponse { notifications }))
}
