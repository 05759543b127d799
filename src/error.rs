//! Error types for the Annota server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::session::{SessionError, EXPORT_FAILURE_MESSAGE};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn session_status(e: &SessionError) -> (StatusCode, &'static str, String) {
    match e {
        SessionError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", e.to_string()),
        SessionError::TextNotFound(_) => (StatusCode::NOT_FOUND, "not_found", e.to_string()),
        SessionError::NoDocument => (StatusCode::CONFLICT, "no_document", e.to_string()),
        SessionError::NoSurface => (StatusCode::CONFLICT, "no_surface", e.to_string()),
        SessionError::WrongMode { .. } => (StatusCode::CONFLICT, "wrong_mode", e.to_string()),
        SessionError::NotEditing(_) => (StatusCode::CONFLICT, "not_editing", e.to_string()),
        SessionError::ExportBusy => (StatusCode::CONFLICT, "export_busy", e.to_string()),
        SessionError::Geometry(_) => (StatusCode::BAD_REQUEST, "invalid_geometry", e.to_string()),
        SessionError::Render(err) => {
            tracing::error!("Overlay render error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "render_error",
                "Failed to render overlay".to_string(),
            )
        }
        // Already logged by the session manager
        SessionError::Export(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "export_failed",
            EXPORT_FAILURE_MESSAGE.to_string(),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Session(e) => session_status(e),
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportError;

    #[test]
    fn test_session_errors_map_to_status() {
        let cases = [
            (SessionError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (SessionError::ExportBusy, StatusCode::CONFLICT),
            (SessionError::NoDocument, StatusCode::CONFLICT),
            (
                SessionError::Export(ExportError::NoPages),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_bad_request_status() {
        let response = AppError::BadRequest("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
