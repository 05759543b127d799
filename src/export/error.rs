//! Export error types

use thiserror::Error;

use crate::geometry::GeometryError;

/// Everything that can stop an export.
///
/// All variants are handled the same way by the session layer: logged,
/// reported once, no file produced.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The source bytes are not a readable PDF
    #[error("Failed to load PDF: {0}")]
    Load(String),

    /// The PDF has no page to annotate
    #[error("Document has no pages")]
    NoPages,

    /// The page tree is missing something we need (MediaBox, page dictionary)
    #[error("Invalid PDF structure: {0}")]
    Structure(String),

    /// The font could not be fetched
    #[error("Font fetch failed: {0}")]
    FontFetch(String),

    /// The fetched font could not be parsed or embedded
    #[error("Font error: {0}")]
    Font(String),

    /// The page or overlay size cannot be used for projection
    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    /// Writing the content stream or the document failed
    #[error("Failed to serialize PDF: {0}")]
    Serialize(String),

    /// The blocking export task panicked or was cancelled
    #[error("Export task failed: {0}")]
    Task(String),
}

impl From<lopdf::Error> for ExportError {
    fn from(err: lopdf::Error) -> Self {
        ExportError::Structure(err.to_string())
    }
}

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;
