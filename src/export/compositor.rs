//! Burn an annotation snapshot into page 1 of a PDF

use std::str::FromStr;

use lopdf::{dictionary, Document, Object};
use serde::{Deserialize, Serialize};

use super::content::ContentBuilder;
use super::error::{ExportError, Result};
use super::font::{FontData, PdfFont};
use super::page::{add_resource, append_content, first_page, page_box, page_resources};
use crate::annotations::{AnnotationSnapshot, Color, Drawing, Note, TextElement};
use crate::geometry::{PageProjection, Point, RenderedLayout};

const NOTE_FONT_SIZE: f32 = 12.0;
const NOTE_PADDING: f32 = 8.0;
const NOTE_RADIUS: f32 = 6.0;
const NOTE_FILL: Color = Color::rgb(99, 105, 242);
const NOTE_OPACITY: f32 = 0.9;

const MIN_STROKE_WIDTH: f32 = 1.0;
const MIN_DOT_STEPS: usize = 3;
/// Hard ceiling on dots per segment, whatever the page size
const MAX_DOT_STEPS: usize = 4096;
const MIN_TEXT_SIZE: f32 = 8.0;

/// How ink strokes are written into the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeMode {
    /// Overlapping filled circles along every segment
    #[default]
    Dots,
    /// One stroked path per drawing with round caps and joins
    Polyline,
}

impl FromStr for StrokeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dots" => Ok(StrokeMode::Dots),
            "polyline" => Ok(StrokeMode::Polyline),
            other => Err(format!("unknown stroke mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub stroke_mode: StrokeMode,
}

/// Composite `snapshot` onto the first page of `pdf_bytes`.
///
/// Overlay coordinates are projected against `layout`; ink points are first
/// brought back from canvas pixels using each drawing's pixel ratio. Other
/// pages are left untouched.
pub fn composite(
    pdf_bytes: &[u8],
    snapshot: &AnnotationSnapshot,
    layout: RenderedLayout,
    font: FontData,
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(pdf_bytes).map_err(|e| ExportError::Load(e.to_string()))?;
    let page_id = first_page(&doc)?;
    let projection = PageProjection::new(page_box(&doc, page_id)?, layout.projection_basis())?;
    let mut font = PdfFont::load(font)?;

    let mut resources = page_resources(&doc, page_id)?;
    let font_name = add_resource(&mut resources, b"Font", "FAnnota", Object::Null)?;
    let gs_name = add_resource(
        &mut resources,
        b"ExtGState",
        "GSAnnota",
        Object::Dictionary(dictionary! {
            "Type" => "ExtGState",
            "ca" => NOTE_OPACITY,
            "CA" => NOTE_OPACITY,
        }),
    )?;

    let mut content = ContentBuilder::new();
    for note in &snapshot.notes {
        draw_note(&mut content, &mut font, &font_name, &gs_name, &projection, note)?;
    }
    for drawing in snapshot.drawings.iter().filter(|d| d.is_drawable()) {
        draw_stroke(&mut content, &projection, drawing, options.stroke_mode);
    }
    for text in &snapshot.text_elements {
        draw_text(&mut content, &mut font, &font_name, &projection, text)?;
    }

    if content.is_empty() {
        tracing::debug!("Nothing to composite, page left as-is");
    } else {
        // Embedded after drawing: widths and ToUnicode cover only used glyphs
        let embedded = font.embed(&mut doc)?;
        set_font_reference(&mut resources, &font_name, embedded)?;
        append_content(&mut doc, page_id, resources, content.encode()?)?;
    }

    let mut out = Vec::with_capacity(pdf_bytes.len() + 4096);
    doc.save_to(&mut out)
        .map_err(|e| ExportError::Serialize(e.to_string()))?;
    tracing::debug!(
        notes = snapshot.notes.len(),
        drawings = snapshot.drawings.len(),
        texts = snapshot.text_elements.len(),
        size = out.len(),
        "Composited annotations"
    );
    Ok(out)
}

fn set_font_reference(
    resources: &mut lopdf::Dictionary,
    font_name: &str,
    font_id: lopdf::ObjectId,
) -> Result<()> {
    resources
        .get_mut(b"Font")?
        .as_dict_mut()?
        .set(font_name.as_bytes().to_vec(), Object::Reference(font_id));
    Ok(())
}

fn draw_note(
    content: &mut ContentBuilder,
    font: &mut PdfFont,
    font_name: &str,
    gs_name: &str,
    projection: &PageProjection,
    note: &Note,
) -> Result<()> {
    let top_left = projection.to_page(note.position());
    let text_width = font.width_of_text_at_size(&note.text, NOTE_FONT_SIZE)?;
    let box_w = text_width + NOTE_PADDING * 2.0;
    let box_h = NOTE_FONT_SIZE + NOTE_PADDING * 2.0;
    let bottom = top_left.y - box_h;

    content
        .save()
        .graphics_state(gs_name)
        .fill_color(NOTE_FILL)
        .fill_rounded_rect(top_left.x, bottom, box_w, box_h, NOTE_RADIUS)
        .restore();

    let baseline = Point::new(
        top_left.x + NOTE_PADDING,
        bottom + NOTE_PADDING + NOTE_FONT_SIZE * 0.25,
    );
    let encoded = font.encode(&note.text)?;
    content
        .save()
        .fill_color(Color::BLACK)
        .text(font_name, NOTE_FONT_SIZE, baseline, encoded)
        .restore();
    Ok(())
}

/// Number of dots stamped along one segment, not counting the first.
///
/// `max_steps` bounds segments that run far off the page; past it the dots
/// simply spread out.
fn dot_steps(distance: f32, radius: f32, max_steps: usize) -> usize {
    let steps = if radius > 0.0 && distance.is_finite() {
        (distance / radius).floor().min(max_steps as f32) as usize
    } else {
        0
    };
    steps.min(max_steps).max(MIN_DOT_STEPS)
}

/// Dots needed to cross the whole page once
fn page_dot_budget(projection: &PageProjection, radius: f32) -> usize {
    let per_page = if radius > 0.0 {
        (projection.page_diagonal() / radius).ceil()
    } else {
        0.0
    };
    if per_page.is_finite() {
        (per_page.min(MAX_DOT_STEPS as f32) as usize).max(MIN_DOT_STEPS)
    } else {
        MAX_DOT_STEPS
    }
}

fn draw_stroke(
    content: &mut ContentBuilder,
    projection: &PageProjection,
    drawing: &Drawing,
    mode: StrokeMode,
) {
    let width = (drawing.stroke_width * projection.scale_x()).max(MIN_STROKE_WIDTH);
    let points: Vec<Point> = drawing
        .overlay_points()
        .map(|p| projection.to_page(p))
        .collect();

    content.save();
    match mode {
        StrokeMode::Dots => {
            let radius = width / 2.0;
            let max_steps = page_dot_budget(projection, radius);
            content.fill_color(drawing.color);
            for segment in points.windows(2) {
                let (start, end) = (segment[0], segment[1]);
                let steps = dot_steps(start.distance_to(end), radius, max_steps);
                for step in 0..=steps {
                    let t = step as f32 / steps as f32;
                    content.fill_circle(start.lerp(end, t), radius);
                }
            }
        }
        StrokeMode::Polyline => {
            content
                .stroke_color(drawing.color)
                .stroke_polyline(&points, width);
        }
    }
    content.restore();
}

fn draw_text(
    content: &mut ContentBuilder,
    font: &mut PdfFont,
    font_name: &str,
    projection: &PageProjection,
    text: &TextElement,
) -> Result<()> {
    let origin = projection.to_page(text.position());
    let size = (text.font_size * projection.scale_x()).max(MIN_TEXT_SIZE);
    let encoded = font.encode(&text.text)?;
    content
        .save()
        .fill_color(Color::BLACK)
        .text(font_name, size, origin, encoded)
        .restore();
    Ok(())
}
