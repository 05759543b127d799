//! In-memory annotation store
//!
//! Mutations are append or filter-by-id removal. The only in-place edit is a
//! text element's content, and only through [`AnnotationStore::set_text_content`].

use chrono::Utc;
use serde::Serialize;

use super::types::{AnnotationId, Drawing, Note, StrokeStyle, TextElement, TextStyle};
use crate::geometry::Point;

/// Hands out ids that never repeat within one store.
///
/// Ids are millisecond timestamps bumped past the previous id, so they stay
/// monotonic even when several entities are created within the same
/// millisecond or the clock steps backwards.
#[derive(Debug, Default)]
struct IdGenerator {
    last: AnnotationId,
}

impl IdGenerator {
    fn next(&mut self) -> AnnotationId {
        let now = Utc::now().timestamp_millis().max(0) as AnnotationId;
        let id = now.max(self.last + 1);
        self.last = id;
        id
    }
}

/// Read-only copy of every collection, handed to the renderer and exporter
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSnapshot {
    pub notes: Vec<Note>,
    pub drawings: Vec<Drawing>,
    pub text_elements: Vec<TextElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_progress: Option<Drawing>,
    pub revision: u64,
}

impl AnnotationSnapshot {
    /// Number of committed annotations of all kinds
    pub fn len(&self) -> usize {
        self.notes.len() + self.drawings.len() + self.text_elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owner of the notes, strokes and text elements of one document session
#[derive(Debug, Default)]
pub struct AnnotationStore {
    notes: Vec<Note>,
    drawings: Vec<Drawing>,
    texts: Vec<TextElement>,
    in_progress: Option<Drawing>,
    ids: IdGenerator,
    revision: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Incremented on every mutation; clients redraw when it changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn drawings(&self) -> &[Drawing] {
        &self.drawings
    }

    pub fn texts(&self) -> &[TextElement] {
        &self.texts
    }

    pub fn in_progress(&self) -> Option<&Drawing> {
        self.in_progress.as_ref()
    }

    pub fn text(&self, id: AnnotationId) -> Option<&TextElement> {
        self.texts.iter().find(|t| t.id == id)
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    /// Add a note. Empty text creates nothing.
    pub fn add_note(&mut self, position: Point, text: &str) -> Option<&Note> {
        if text.is_empty() {
            return None;
        }
        let note = Note {
            id: self.ids.next(),
            x: position.x,
            y: position.y,
            text: text.to_string(),
        };
        self.notes.push(note);
        self.touch();
        self.notes.last()
    }

    /// Remove a note by id. Deleting an unknown id is a no-op.
    pub fn delete_note(&mut self, id: AnnotationId) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        let removed = self.notes.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    // ------------------------------------------------------------------
    // Strokes
    // ------------------------------------------------------------------

    /// Start a new in-progress stroke, replacing any stroke still live
    pub fn begin_stroke(
        &mut self,
        start: Point,
        style: StrokeStyle,
        pixel_ratio: f32,
    ) -> AnnotationId {
        let id = self.ids.next();
        self.in_progress = Some(Drawing {
            id,
            points: vec![start],
            color: style.color,
            stroke_width: style.stroke_width,
            pixel_ratio,
        });
        self.touch();
        id
    }

    /// Append a point to the in-progress stroke. Returns false when no stroke is live.
    pub fn extend_stroke(&mut self, point: Point) -> bool {
        match self.in_progress.as_mut() {
            Some(drawing) => {
                drawing.points.push(point);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Freeze the in-progress stroke into the committed collection.
    ///
    /// Strokes with fewer than two points are dropped; returns the id only
    /// when a stroke was actually committed.
    pub fn commit_stroke(&mut self) -> Option<AnnotationId> {
        let drawing = self.in_progress.take()?;
        self.touch();
        if !drawing.is_drawable() {
            tracing::debug!(stroke_id = drawing.id, "Dropped single-point stroke");
            return None;
        }
        let id = drawing.id;
        self.drawings.push(drawing);
        Some(id)
    }

    /// Throw away the in-progress stroke, if any
    pub fn discard_stroke(&mut self) {
        if self.in_progress.take().is_some() {
            self.touch();
        }
    }

    // ------------------------------------------------------------------
    // Text elements
    // ------------------------------------------------------------------

    /// Add a text element. Empty text creates nothing.
    pub fn add_text(&mut self, position: Point, text: &str, style: TextStyle) -> Option<&TextElement> {
        if text.is_empty() {
            return None;
        }
        let element = TextElement {
            id: self.ids.next(),
            x: position.x,
            y: position.y,
            text: text.to_string(),
            font_size: style.font_size,
            color: style.color,
        };
        self.texts.push(element);
        self.touch();
        self.texts.last()
    }

    /// Rewrite a text element's content
    pub fn set_text_content(&mut self, id: AnnotationId, text: &str) -> bool {
        let Some(element) = self.texts.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        element.text = text.to_string();
        self.touch();
        true
    }

    pub fn delete_text(&mut self, id: AnnotationId) -> bool {
        let before = self.texts.len();
        self.texts.retain(|t| t.id != id);
        let removed = self.texts.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    // ------------------------------------------------------------------
    // Whole store
    // ------------------------------------------------------------------

    /// Empty every collection. The id generator keeps counting.
    pub fn reset(&mut self) {
        self.notes.clear();
        self.drawings.clear();
        self.texts.clear();
        self.in_progress = None;
        self.touch();
    }

    pub fn snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot {
            notes: self.notes.clone(),
            drawings: self.drawings.clone(),
            text_elements: self.texts.clone(),
            in_progress: self.in_progress.clone(),
            revision: self.revision,
        }
    }
}
