//! Editor sessions
//!
//! A session is one browser tab's worth of state: the loaded PDF, its
//! annotations, the active tool, the text element being edited, the overlay
//! surface size and the queue of notifications waiting to be shown.
//! Nothing is persisted; idle sessions are dropped by a background task.

mod editor;
mod manager;
mod types;

pub use editor::{is_pdf_content_type, Document, EditorSession, ExportJob};
pub use manager::{SessionManager, DEFAULT_IDLE_MINUTES};
pub use types::*;
