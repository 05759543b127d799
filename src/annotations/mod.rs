//! Annotation model
//!
//! The in-memory collections behind the editor overlay:
//!
//! - Notes: sticky notes placed in overlay space, fixed text
//! - Drawings: freehand ink strokes in canvas-pixel space
//! - Text elements: editable labels placed in overlay space
//!
//! The store is the single source of truth for both the live overlay and the
//! export compositor, which only ever see snapshots.

mod store;
mod types;

pub use store::{AnnotationSnapshot, AnnotationStore};
pub use types::{
    AnnotationId, Color, ColorParseError, Drawing, Note, StrokeStyle, TextElement, TextStyle,
};
