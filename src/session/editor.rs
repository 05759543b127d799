//! One editor session: a document, its annotations and the tool state
//!
//! Everything here is synchronous; the manager serializes access.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::types::{
    AnnotationCounts, ClickInput, ClickOutcome, DocumentInfo, EditEnd, EditingState, Mode,
    Notification, PointerInput, SessionError, SessionSummary, EXPORT_FAILURE_MESSAGE,
    EXPORT_SUCCESS_MESSAGE, PDF_CONTENT_TYPE,
};
use crate::annotations::{AnnotationId, AnnotationSnapshot, AnnotationStore, StrokeStyle, TextStyle};
use crate::export::ExportError;
use crate::geometry::{overlay_point, RenderedLayout, Size};
use crate::overlay::{OverlayFrame, OverlaySurface};

/// The uploaded file
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Arc<[u8]>,
    info: DocumentInfo,
}

impl Document {
    fn new(file_name: Option<String>, bytes: Vec<u8>) -> Self {
        let sha256 = hex::encode(Sha256::digest(&bytes));
        Self {
            info: DocumentInfo {
                file_name,
                size: bytes.len(),
                sha256,
                loaded_at: Utc::now(),
            },
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }
}

/// Whether a declared content type names a PDF (parameters are ignored)
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Everything the blocking export needs, detached from the session
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub pdf: Arc<[u8]>,
    pub snapshot: AnnotationSnapshot,
    pub layout: RenderedLayout,
}

#[derive(Debug)]
pub struct EditorSession {
    id: Uuid,
    document: Option<Document>,
    store: AnnotationStore,
    mode: Mode,
    editing: EditingState,
    surface: Option<OverlaySurface>,
    stroke_style: StrokeStyle,
    text_style: TextStyle,
    exporting: bool,
    notifications: VecDeque<Notification>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl EditorSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            document: None,
            store: AnnotationStore::new(),
            mode: Mode::default(),
            editing: EditingState::None,
            surface: None,
            stroke_style: StrokeStyle::default(),
            text_style: TextStyle::default(),
            exporting: false,
            notifications: VecDeque::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn editing(&self) -> EditingState {
        self.editing
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn surface(&self) -> Option<&OverlaySurface> {
        self.surface.as_ref()
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    #[cfg(test)]
    pub(crate) fn set_last_activity(&mut self, at: DateTime<Utc>) {
        self.last_activity = at;
    }

    /// Idle sessions are purged, but never while an export is running
    pub fn is_idle(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        !self.exporting && now - self.last_activity > ttl
    }

    // ========================================================================
    // Document
    // ========================================================================

    /// Load a new file.
    ///
    /// Anything that is not `application/pdf` is ignored without touching the
    /// session. An accepted file replaces the previous one and empties every
    /// annotation collection.
    pub fn load_file(
        &mut self,
        content_type: &str,
        file_name: Option<String>,
        bytes: Vec<u8>,
    ) -> bool {
        if !is_pdf_content_type(content_type) {
            tracing::warn!(
                session_id = %self.id,
                content_type = %content_type,
                "Ignored non-PDF file"
            );
            return false;
        }

        let document = Document::new(file_name, bytes);
        tracing::info!(
            session_id = %self.id,
            size = document.info.size,
            sha256 = %document.info.sha256,
            "Loaded document"
        );
        self.document = Some(document);
        self.reset_annotations();
        true
    }

    /// Drop the document and all annotations ("choose another PDF")
    pub fn clear(&mut self) {
        self.document = None;
        self.reset_annotations();
        tracing::info!(session_id = %self.id, "Cleared document");
    }

    fn reset_annotations(&mut self) {
        self.store.reset();
        self.editing = EditingState::None;
    }

    fn require_document(&self) -> Result<(), SessionError> {
        match self.document {
            Some(_) => Ok(()),
            None => Err(SessionError::NoDocument),
        }
    }

    // ========================================================================
    // Tools & Surface
    // ========================================================================

    /// Switch tools. Leaving the pencil drops a stroke still being drawn.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == Mode::Pencil && mode != Mode::Pencil {
            self.store.discard_stroke();
        }
        self.mode = mode;
    }

    /// Size the overlay for a container of `container` CSS pixels
    pub fn resize_surface(
        &mut self,
        container: Size,
        device_pixel_ratio: f32,
    ) -> Result<OverlaySurface, SessionError> {
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(container, device_pixel_ratio)?;
        } else {
            self.surface = Some(OverlaySurface::new(container, device_pixel_ratio)?);
        }
        let surface = self.surface.ok_or(SessionError::NoSurface)?;
        tracing::debug!(
            session_id = %self.id,
            width = surface.backing_size().0,
            height = surface.backing_size().1,
            "Resized overlay surface"
        );
        Ok(surface)
    }

    /// Copy out what an overlay render needs, so it can run off the lock
    pub fn overlay_frame(&self) -> Result<OverlayFrame, SessionError> {
        let surface = self.surface.ok_or(SessionError::NoSurface)?;
        Ok(OverlayFrame {
            strokes: self.store.drawings().to_vec(),
            in_progress: self.store.in_progress().cloned(),
            surface,
        })
    }

    // ========================================================================
    // Notes & Text Placement
    // ========================================================================

    /// A click on the overlay: places a note or a text label depending on the tool
    pub fn click(&mut self, input: &ClickInput) -> Result<ClickOutcome, SessionError> {
        self.require_document()?;
        let position = overlay_point(input.client(), input.container)?;
        let text = input.text.as_deref().unwrap_or("");

        let outcome = match self.mode {
            Mode::Note => self
                .store
                .add_note(position, text)
                .cloned()
                .map(ClickOutcome::Note),
            Mode::Text => {
                let created = self.store.add_text(position, text, self.text_style).cloned();
                if let Some(element) = &created {
                    self.editing = EditingState::Editing(element.id);
                }
                created.map(ClickOutcome::Text)
            }
            Mode::Pencil => None,
        };
        Ok(outcome.unwrap_or(ClickOutcome::Ignored))
    }

    pub fn delete_note(&mut self, id: AnnotationId) -> bool {
        self.store.delete_note(id)
    }

    // ========================================================================
    // Ink
    // ========================================================================

    /// Start a stroke. Only the pencil tool draws, and only on a sized surface.
    pub fn pointer_down(&mut self, input: &PointerInput) -> Result<Option<AnnotationId>, SessionError> {
        if self.mode != Mode::Pencil {
            tracing::debug!(session_id = %self.id, mode = ?self.mode, "Pointer down outside pencil mode");
            return Ok(None);
        }
        let Some(surface) = self.surface else {
            tracing::warn!(session_id = %self.id, "Pointer down before the overlay was sized");
            return Ok(None);
        };
        let start = surface.to_canvas(input.client(), input.canvas)?;
        let id = self
            .store
            .begin_stroke(start, self.stroke_style, surface.pixel_ratio());
        Ok(Some(id))
    }

    /// Extend the live stroke; ignored when no stroke is live
    pub fn pointer_move(&mut self, input: &PointerInput) -> Result<bool, SessionError> {
        let Some(surface) = self.surface else {
            return Ok(false);
        };
        if self.store.in_progress().is_none() {
            return Ok(false);
        }
        let point = surface.to_canvas(input.client(), input.canvas)?;
        Ok(self.store.extend_stroke(point))
    }

    /// Pointer up: commit the live stroke if it has at least two points
    pub fn pointer_up(&mut self) -> Option<AnnotationId> {
        self.store.commit_stroke()
    }

    /// Leaving the canvas ends the stroke exactly like releasing the pointer
    pub fn pointer_leave(&mut self) -> Option<AnnotationId> {
        self.pointer_up()
    }

    // ========================================================================
    // Text Editing
    // ========================================================================

    fn require_mode(&self, expected: Mode) -> Result<(), SessionError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(SessionError::WrongMode {
                expected,
                actual: self.mode,
            })
        }
    }

    /// Make `id` the one text element being edited
    pub fn begin_edit(&mut self, id: AnnotationId) -> Result<(), SessionError> {
        self.require_mode(Mode::Text)?;
        if self.store.text(id).is_none() {
            return Err(SessionError::TextNotFound(id));
        }
        self.editing = EditingState::Editing(id);
        Ok(())
    }

    /// Rewrite the content of the element being edited
    pub fn update_text(&mut self, id: AnnotationId, text: &str) -> Result<(), SessionError> {
        if self.editing != EditingState::Editing(id) {
            return Err(SessionError::NotEditing(id));
        }
        if !self.store.set_text_content(id, text) {
            self.editing = EditingState::None;
            return Err(SessionError::TextNotFound(id));
        }
        Ok(())
    }

    /// End editing. Blur and Enter keep `text` when given; Escape keeps
    /// whatever was already written.
    pub fn end_edit(&mut self, how: EditEnd, text: Option<&str>) -> Option<AnnotationId> {
        let id = self.editing.text_id()?;
        if let (EditEnd::Blur | EditEnd::Enter, Some(text)) = (how, text) {
            self.store.set_text_content(id, text);
        }
        self.editing = EditingState::None;
        tracing::debug!(session_id = %self.id, text_id = id, how = ?how, "Ended text editing");
        Some(id)
    }

    /// Delete a text label. The delete control only exists in text mode.
    pub fn delete_text(&mut self, id: AnnotationId) -> Result<bool, SessionError> {
        self.require_mode(Mode::Text)?;
        if self.editing == EditingState::Editing(id) {
            self.editing = EditingState::None;
        }
        Ok(self.store.delete_text(id))
    }

    // ========================================================================
    // Export Bookkeeping
    // ========================================================================

    /// Claim the export slot and detach what the export needs.
    ///
    /// `layout` is what the client measured; without one the overlay
    /// surface's container size is used.
    pub fn begin_export(&mut self, layout: Option<RenderedLayout>) -> Result<ExportJob, SessionError> {
        let pdf = self
            .document
            .as_ref()
            .map(Document::bytes)
            .ok_or(SessionError::NoDocument)?;
        if self.exporting {
            return Err(SessionError::ExportBusy);
        }
        let layout = match layout {
            Some(layout) => layout,
            None => RenderedLayout {
                container: self.surface.ok_or(SessionError::NoSurface)?.displayed(),
                page_canvas: None,
            },
        };

        self.exporting = true;
        Ok(ExportJob {
            pdf,
            snapshot: self.store.snapshot(),
            layout,
        })
    }

    /// Release the export slot and queue exactly one notification
    pub fn finish_export(&mut self, result: &Result<Vec<u8>, ExportError>) {
        self.exporting = false;
        let notification = match result {
            Ok(_) => Notification::success(EXPORT_SUCCESS_MESSAGE),
            Err(_) => Notification::error(EXPORT_FAILURE_MESSAGE),
        };
        self.notifications.push_back(notification);
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            mode: self.mode,
            editing: self.editing,
            document: self.document.as_ref().map(|d| d.info.clone()),
            counts: AnnotationCounts {
                notes: self.store.notes().len(),
                drawings: self.store.drawings().len(),
                text_elements: self.store.texts().len(),
            },
            revision: self.store.revision(),
            surface: self.surface,
            exporting: self.exporting,
            pending_notifications: self.notifications.len(),
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ClientRect;
    use crate::session::types::NotificationLevel;

    fn loaded() -> EditorSession {
        let mut session = EditorSession::new();
        assert!(session.load_file("application/pdf", Some("a.pdf".into()), b"%PDF-1.7".to_vec()));
        session
    }

    fn click(x: f32, y: f32, text: &str) -> ClickInput {
        ClickInput {
            client_x: x,
            client_y: y,
            container: ClientRect::new(10.0, 20.0, 400.0, 800.0),
            text: Some(text.to_string()),
        }
    }

    fn pointer(x: f32, y: f32) -> PointerInput {
        PointerInput {
            client_x: x,
            client_y: y,
            canvas: ClientRect::new(0.0, 0.0, 400.0, 200.0),
        }
    }

    #[test]
    fn test_content_type_check() {
        assert!(is_pdf_content_type("application/pdf"));
        assert!(is_pdf_content_type("Application/PDF; charset=binary"));
        assert!(!is_pdf_content_type("image/png"));
        assert!(!is_pdf_content_type(""));
    }

    #[test]
    fn test_non_pdf_is_ignored() {
        let mut session = loaded();
        session.click(&click(50.0, 50.0, "keep me")).unwrap();
        let before = session.document().unwrap().info().sha256.clone();

        assert!(!session.load_file("text/plain", None, b"hello".to_vec()));
        assert_eq!(session.document().unwrap().info().sha256, before);
        assert_eq!(session.store().notes().len(), 1);
    }

    #[test]
    fn test_new_file_resets_collections() {
        let mut session = loaded();
        session.click(&click(50.0, 50.0, "note")).unwrap();
        session.set_mode(Mode::Text);
        session.click(&click(60.0, 60.0, "label")).unwrap();
        session.resize_surface(Size::new(400.0, 200.0), 1.0).unwrap();
        session.set_mode(Mode::Pencil);
        session.pointer_down(&pointer(1.0, 1.0)).unwrap();
        session.pointer_move(&pointer(5.0, 5.0)).unwrap();
        session.pointer_up();

        assert!(session.load_file("application/pdf", None, b"%PDF-2.0".to_vec()));
        let snapshot = session.store().snapshot();
        assert!(snapshot.is_empty());
        assert!(snapshot.in_progress.is_none());
        assert_eq!(session.editing(), EditingState::None);
    }

    #[test]
    fn test_click_without_document_rejected() {
        let mut session = EditorSession::new();
        let result = session.click(&click(0.0, 0.0, "x"));
        assert!(matches!(result, Err(SessionError::NoDocument)));
    }

    #[test]
    fn test_note_click_uses_container_offset() {
        let mut session = loaded();
        match session.click(&click(110.0, 120.0, "hi")).unwrap() {
            ClickOutcome::Note(note) => {
                assert_eq!((note.x, note.y), (100.0, 100.0));
                assert_eq!(note.text, "hi");
            }
            other => panic!("expected a note, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_prompt_creates_nothing() {
        let mut session = loaded();
        assert_eq!(session.click(&click(0.0, 0.0, "")).unwrap(), ClickOutcome::Ignored);
        assert_eq!(session.store().notes().len(), 0);

        assert!(matches!(
            session.click(&click(0.0, 0.0, "  ")).unwrap(),
            ClickOutcome::Note(_)
        ));
    }

    #[test]
    fn test_text_click_starts_editing() {
        let mut session = loaded();
        session.set_mode(Mode::Text);
        let ClickOutcome::Text(element) = session.click(&click(10.0, 20.0, "label")).unwrap() else {
            panic!("expected a text element");
        };
        assert_eq!(session.editing(), EditingState::Editing(element.id));
        assert_eq!(element.font_size, 14.0);
    }

    #[test]
    fn test_pencil_click_ignored() {
        let mut session = loaded();
        session.set_mode(Mode::Pencil);
        assert_eq!(session.click(&click(0.0, 0.0, "x")).unwrap(), ClickOutcome::Ignored);
    }

    #[test]
    fn test_stroke_in_canvas_space() {
        let mut session = loaded();
        session.resize_surface(Size::new(400.0, 200.0), 2.0).unwrap();
        session.set_mode(Mode::Pencil);

        session.pointer_down(&pointer(100.0, 50.0)).unwrap().unwrap();
        assert!(session.pointer_move(&pointer(150.0, 75.0)).unwrap());
        let id = session.pointer_up().unwrap();

        let drawing = &session.store().drawings()[0];
        assert_eq!(drawing.id, id);
        assert_eq!(drawing.points[0].x, 200.0);
        assert_eq!(drawing.points[0].y, 100.0);
        assert_eq!(drawing.pixel_ratio, 2.0);
    }

    #[test]
    fn test_far_pointer_move_rejected() {
        let mut session = loaded();
        session.resize_surface(Size::new(400.0, 200.0), 1.0).unwrap();
        session.set_mode(Mode::Pencil);
        session.pointer_down(&pointer(10.0, 10.0)).unwrap();

        let far = session.pointer_move(&pointer(1.0e9, 10.0));
        assert!(matches!(far, Err(SessionError::Geometry(_))));
        assert!(session.pointer_move(&pointer(f32::NAN, 10.0)).is_err());

        // The stroke survives and keeps only the accepted points
        assert!(session.pointer_move(&pointer(20.0, 10.0)).unwrap());
        session.pointer_up();
        assert_eq!(session.store().drawings()[0].points.len(), 2);

        session.set_mode(Mode::Pencil);
        assert!(session.pointer_down(&pointer(-1.0e7, 0.0)).is_err());
        assert!(session.store().in_progress().is_none());
    }

    #[test]
    fn test_overlay_frame_is_detached_copy() {
        let mut session = loaded();
        assert!(matches!(session.overlay_frame(), Err(SessionError::NoSurface)));

        session.resize_surface(Size::new(400.0, 200.0), 1.0).unwrap();
        session.set_mode(Mode::Pencil);
        session.pointer_down(&pointer(10.0, 10.0)).unwrap();
        session.pointer_move(&pointer(30.0, 30.0)).unwrap();
        session.pointer_up();
        session.pointer_down(&pointer(50.0, 50.0)).unwrap();

        let frame = session.overlay_frame().unwrap();
        assert_eq!(frame.strokes.len(), 1);
        assert!(frame.in_progress.is_some());
        assert_eq!(frame.surface.backing_size(), (400, 200));

        session.clear();
        assert_eq!(frame.strokes.len(), 1);
        assert!(frame.to_png().unwrap().starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_single_point_stroke_dropped_on_leave() {
        let mut session = loaded();
        session.resize_surface(Size::new(400.0, 200.0), 1.0).unwrap();
        session.set_mode(Mode::Pencil);
        session.pointer_down(&pointer(10.0, 10.0)).unwrap();
        assert_eq!(session.pointer_leave(), None);
        assert!(session.store().drawings().is_empty());
    }

    #[test]
    fn test_pointer_ignored_outside_pencil_or_unsized() {
        let mut session = loaded();
        session.set_mode(Mode::Pencil);
        assert_eq!(session.pointer_down(&pointer(1.0, 1.0)).unwrap(), None);

        session.resize_surface(Size::new(400.0, 200.0), 1.0).unwrap();
        session.set_mode(Mode::Note);
        assert_eq!(session.pointer_down(&pointer(1.0, 1.0)).unwrap(), None);
        assert!(!session.pointer_move(&pointer(2.0, 2.0)).unwrap());
    }

    #[test]
    fn test_leaving_pencil_discards_live_stroke() {
        let mut session = loaded();
        session.resize_surface(Size::new(400.0, 200.0), 1.0).unwrap();
        session.set_mode(Mode::Pencil);
        session.pointer_down(&pointer(1.0, 1.0)).unwrap();
        session.pointer_move(&pointer(2.0, 2.0)).unwrap();
        session.set_mode(Mode::Text);
        assert!(session.store().in_progress().is_none());
        assert_eq!(session.pointer_up(), None);
    }

    #[test]
    fn test_editing_is_exclusive_and_mode_gated() {
        let mut session = loaded();
        session.set_mode(Mode::Text);
        let ClickOutcome::Text(a) = session.click(&click(0.0, 0.0, "a")).unwrap() else {
            panic!("expected text");
        };
        let ClickOutcome::Text(b) = session.click(&click(5.0, 5.0, "b")).unwrap() else {
            panic!("expected text");
        };
        assert_eq!(session.editing(), EditingState::Editing(b.id));

        session.begin_edit(a.id).unwrap();
        assert!(matches!(session.update_text(b.id, "x"), Err(SessionError::NotEditing(_))));
        session.update_text(a.id, "a2").unwrap();
        assert_eq!(session.store().text(a.id).unwrap().text, "a2");

        session.set_mode(Mode::Note);
        assert!(matches!(session.begin_edit(b.id), Err(SessionError::WrongMode { .. })));
        assert!(matches!(session.delete_text(b.id), Err(SessionError::WrongMode { .. })));
    }

    #[test]
    fn test_end_edit_variants() {
        let mut session = loaded();
        session.set_mode(Mode::Text);
        let ClickOutcome::Text(element) = session.click(&click(0.0, 0.0, "start")).unwrap() else {
            panic!("expected text");
        };

        assert_eq!(session.end_edit(EditEnd::Enter, Some("entered")), Some(element.id));
        assert_eq!(session.store().text(element.id).unwrap().text, "entered");
        assert_eq!(session.end_edit(EditEnd::Blur, None), None);

        session.begin_edit(element.id).unwrap();
        session.update_text(element.id, "typed").unwrap();
        session.end_edit(EditEnd::Escape, Some("ignored"));
        assert_eq!(session.store().text(element.id).unwrap().text, "typed");
        assert_eq!(session.editing(), EditingState::None);
    }

    #[test]
    fn test_delete_text_ends_its_editing() {
        let mut session = loaded();
        session.set_mode(Mode::Text);
        let ClickOutcome::Text(element) = session.click(&click(0.0, 0.0, "bye")).unwrap() else {
            panic!("expected text");
        };
        assert!(session.delete_text(element.id).unwrap());
        assert_eq!(session.editing(), EditingState::None);
        assert!(!session.delete_text(element.id).unwrap());
    }

    #[test]
    fn test_export_slot_and_notifications() {
        let mut session = loaded();
        let layout = RenderedLayout {
            container: Size::new(612.0, 792.0),
            page_canvas: None,
        };
        session.begin_export(Some(layout)).unwrap();
        assert!(matches!(session.begin_export(Some(layout)), Err(SessionError::ExportBusy)));

        session.finish_export(&Err(ExportError::FontFetch("offline".into())));
        assert!(!session.is_exporting());
        let drained = session.drain_notifications();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].level, NotificationLevel::Error);
        assert_eq!(drained[0].message, EXPORT_FAILURE_MESSAGE);
        assert!(session.drain_notifications().is_empty());
    }

    #[test]
    fn test_export_layout_falls_back_to_surface() {
        let mut session = loaded();
        assert!(matches!(session.begin_export(None), Err(SessionError::NoSurface)));
        session.resize_surface(Size::new(300.0, 400.0), 2.0).unwrap();
        let job = session.begin_export(None).unwrap();
        assert_eq!(job.layout.container, Size::new(300.0, 400.0));
    }

    #[test]
    fn test_export_requires_document() {
        let mut session = EditorSession::new();
        assert!(matches!(session.begin_export(None), Err(SessionError::NoDocument)));
        assert!(!session.is_exporting());
    }
}
