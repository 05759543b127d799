//! Session types: tool modes, editing state, notifications, summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::annotations::{AnnotationId, Note, TextElement};
use crate::export::ExportError;
use crate::geometry::{ClientRect, GeometryError, Point};
use crate::overlay::{OverlaySurface, RenderError};

// ============================================================================
// Constants
// ============================================================================

/// The only content type accepted as a document
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Notification text for a finished export
pub const EXPORT_SUCCESS_MESSAGE: &str = "Successful export";

/// Notification text for any failed export
pub const EXPORT_FAILURE_MESSAGE: &str = "Error while exporting PDF";

// ============================================================================
// Tool & Editing State
// ============================================================================

/// The active editor tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Clicks place sticky notes
    #[default]
    Note,
    /// Pointer drags draw ink
    Pencil,
    /// Clicks place text labels; labels can be edited and deleted
    Text,
}

/// Which text element, if any, is being edited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "textId", rename_all = "lowercase")]
pub enum EditingState {
    #[default]
    None,
    Editing(AnnotationId),
}

impl EditingState {
    pub fn text_id(&self) -> Option<AnnotationId> {
        match self {
            EditingState::None => None,
            EditingState::Editing(id) => Some(*id),
        }
    }
}

/// How an editing session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditEnd {
    Blur,
    Enter,
    Escape,
}

// ============================================================================
// Input Types
// ============================================================================

/// A click on the overlay container
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickInput {
    pub client_x: f32,
    pub client_y: f32,
    /// The container's bounding rect at the time of the click
    pub container: ClientRect,
    /// Content the user typed into the prompt; missing or blank creates nothing
    #[serde(default)]
    pub text: Option<String>,
}

impl ClickInput {
    pub fn client(&self) -> Point {
        Point::new(self.client_x, self.client_y)
    }
}

/// A pointer event on the drawing canvas
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerInput {
    pub client_x: f32,
    pub client_y: f32,
    /// The canvas element's bounding rect at the time of the event
    pub canvas: ClientRect,
}

impl PointerInput {
    pub fn client(&self) -> Point {
        Point::new(self.client_x, self.client_y)
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// What a click produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "annotation", rename_all = "camelCase")]
pub enum ClickOutcome {
    Note(Note),
    Text(TextElement),
    /// Wrong tool, or no text was entered
    Ignored,
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient message for the notification surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Metadata of the loaded document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub size: usize,
    /// Hex SHA-256 of the original bytes
    pub sha256: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationCounts {
    pub notes: usize,
    pub drawings: usize,
    pub text_elements: usize,
}

/// Session state as reported to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub mode: Mode,
    pub editing: EditingState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentInfo>,
    pub counts: AnnotationCounts,
    pub revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<OverlaySurface>,
    pub exporting: bool,
    pub pending_notifications: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

// ============================================================================
// Errors
// ============================================================================

/// Session-level failures
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("No document loaded")]
    NoDocument,

    #[error("Overlay surface has not been sized yet")]
    NoSurface,

    #[error("Operation requires {expected:?} mode, current mode is {actual:?}")]
    WrongMode { expected: Mode, actual: Mode },

    #[error("Text element not found: {0}")]
    TextNotFound(AnnotationId),

    #[error("Text element {0} is not being edited")]
    NotEditing(AnnotationId),

    #[error("An export is already in progress")]
    ExportBusy,

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
