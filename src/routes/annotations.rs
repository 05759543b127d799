//! Annotation Routes
//!
//! Overlay input: clicks, pointer events and text editing, plus the
//! annotation snapshot and the rendered ink layer.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotations::{AnnotationId, AnnotationSnapshot};
use crate::error::Result;
use crate::session::{ClickInput, ClickOutcome, EditEnd, EditingState, PointerInput};
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeResponse {
    /// Id of the stroke started or committed, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_id: Option<AnnotationId>,
    pub accepted: bool,
    pub revision: u64,
}

#[derive(Debug, Deserialize)]
pub struct TextUpdateRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct EndEditRequest {
    pub how: EditEnd,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditingResponse {
    pub editing: EditingState,
    /// The element whose editing just ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended: Option<AnnotationId>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/annotations", get(get_annotations))
        .route("/:id/clicks", post(click))
        .route("/:id/notes/:note_id", delete(delete_note))
        .route("/:id/pointer/down", post(pointer_down))
        .route("/:id/pointer/move", post(pointer_move))
        .route("/:id/pointer/up", post(pointer_up))
        .route("/:id/pointer/leave", post(pointer_leave))
        .route("/:id/texts/:text_id/edit", post(begin_edit))
        .route("/:id/texts/:text_id", put(update_text).delete(delete_text))
        .route("/:id/editing/end", post(end_edit))
        .route("/:id/overlay.png", get(overlay_png))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/sessions/:id/annotations
async fn get_annotations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnnotationSnapshot>> {
    let snapshot = state
        .sessions()
        .read_session(id, |s| s.store().snapshot())
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/v1/sessions/:id/clicks
async fn click(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ClickInput>,
) -> Result<(StatusCode, Json<ClickOutcome>)> {
    let outcome = state.sessions().with_session(id, |s| s.click(&input)).await??;
    let status = match outcome {
        ClickOutcome::Ignored => StatusCode::OK,
        _ => StatusCode::CREATED,
    };
    Ok((status, Json(outcome)))
}

/// DELETE /api/v1/sessions/:id/notes/:note_id
async fn delete_note(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(Uuid, AnnotationId)>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state
        .sessions()
        .with_session(id, |s| s.delete_note(note_id))
        .await?;
    Ok(Json(DeleteResponse { deleted }))
}

/// POST /api/v1/sessions/:id/pointer/down
async fn pointer_down(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<PointerInput>,
) -> Result<Json<StrokeResponse>> {
    let response = state
        .sessions()
        .with_session(id, |s| {
            s.pointer_down(&input).map(|stroke_id| StrokeResponse {
                stroke_id,
                accepted: stroke_id.is_some(),
                revision: s.store().revision(),
            })
        })
        .await??;
    Ok(Json(response))
}

/// POST /api/v1/sessions/:id/pointer/move
async fn pointer_move(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<PointerInput>,
) -> Result<Json<StrokeResponse>> {
    let response = state
        .sessions()
        .with_session(id, |s| {
            s.pointer_move(&input).map(|accepted| StrokeResponse {
                stroke_id: s.store().in_progress().map(|d| d.id),
                accepted,
                revision: s.store().revision(),
            })
        })
        .await??;
    Ok(Json(response))
}

/// POST /api/v1/sessions/:id/pointer/up
async fn pointer_up(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StrokeResponse>> {
    let response = state
        .sessions()
        .with_session(id, |s| {
            let stroke_id = s.pointer_up();
            StrokeResponse {
                stroke_id,
                accepted: stroke_id.is_some(),
                revision: s.store().revision(),
            }
        })
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/sessions/:id/pointer/leave
async fn pointer_leave(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StrokeResponse>> {
    let response = state
        .sessions()
        .with_session(id, |s| {
            let stroke_id = s.pointer_leave();
            StrokeResponse {
                stroke_id,
                accepted: stroke_id.is_some(),
                revision: s.store().revision(),
            }
        })
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/sessions/:id/texts/:text_id/edit
async fn begin_edit(
    State(state): State<AppState>,
    Path((id, text_id)): Path<(Uuid, AnnotationId)>,
) -> Result<Json<EditingResponse>> {
    let editing = state
        .sessions()
        .with_session(id, |s| s.begin_edit(text_id).map(|_| s.editing()))
        .await??;
    Ok(Json(EditingResponse {
        editing,
        ended: None,
    }))
}

/// PUT /api/v1/sessions/:id/texts/:text_id
async fn update_text(
    State(state): State<AppState>,
    Path((id, text_id)): Path<(Uuid, AnnotationId)>,
    Json(request): Json<TextUpdateRequest>,
) -> Result<StatusCode> {
    state
        .sessions()
        .with_session(id, |s| s.update_text(text_id, &request.text))
        .await??;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/editing/end
async fn end_edit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EndEditRequest>,
) -> Result<Json<EditingResponse>> {
    let (ended, editing) = state
        .sessions()
        .with_session(id, |s| {
            let ended = s.end_edit(request.how, request.text.as_deref());
            (ended, s.editing())
        })
        .await?;
    Ok(Json(EditingResponse { editing, ended }))
}

/// DELETE /api/v1/sessions/:id/texts/:text_id
async fn delete_text(
    State(state): State<AppState>,
    Path((id, text_id)): Path<(Uuid, AnnotationId)>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state
        .sessions()
        .with_session(id, |s| s.delete_text(text_id))
        .await??;
    Ok(Json(DeleteResponse { deleted }))
}

/// GET /api/v1/sessions/:id/overlay.png
async fn overlay_png(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let png = state.sessions().render_overlay(id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    ))
}
