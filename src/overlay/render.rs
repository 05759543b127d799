//! Snapshot renderer for ink strokes

use std::io::Cursor;

use image::RgbaImage;
use thiserror::Error;
use tiny_skia::{LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::surface::OverlaySurface;
use crate::annotations::Drawing;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot allocate a {0}x{1} overlay")]
    Allocation(u32, u32),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Render task failed: {0}")]
    Task(String),
}

/// A copy of everything one overlay render reads, detached from the session
#[derive(Debug, Clone)]
pub struct OverlayFrame {
    pub strokes: Vec<Drawing>,
    pub in_progress: Option<Drawing>,
    pub surface: OverlaySurface,
}

impl OverlayFrame {
    /// Render and encode as PNG
    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        let pixmap = render(&self.strokes, self.in_progress.as_ref(), &self.surface)?;
        encode_png(&pixmap)
    }
}

/// Draw one stroke as a connected polyline with round caps and joins
fn draw_stroke(pixmap: &mut Pixmap, drawing: &Drawing) {
    if !drawing.is_drawable() {
        return;
    }

    let mut pb = PathBuilder::new();
    let first = drawing.points[0];
    pb.move_to(first.x, first.y);
    for point in &drawing.points[1..] {
        pb.line_to(point.x, point.y);
    }
    let Some(path) = pb.finish() else {
        return;
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(drawing.color.r, drawing.color.g, drawing.color.b, 255);
    paint.anti_alias = true;

    // Points are in backing pixels, widths in CSS pixels
    let ratio = if drawing.pixel_ratio > 0.0 { drawing.pixel_ratio } else { 1.0 };
    let stroke = Stroke {
        width: drawing.stroke_width * ratio,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

/// Render the committed strokes followed by the in-progress stroke.
///
/// Pure function of its inputs: the result depends only on the snapshot and
/// the surface size, never on a previous frame.
pub fn render(
    strokes: &[Drawing],
    in_progress: Option<&Drawing>,
    surface: &OverlaySurface,
) -> Result<Pixmap, RenderError> {
    let (w, h) = surface.backing_size();
    let mut pixmap = Pixmap::new(w, h).ok_or(RenderError::Allocation(w, h))?;

    for drawing in strokes.iter().chain(in_progress) {
        draw_stroke(&mut pixmap, drawing);
    }

    Ok(pixmap)
}

/// Encode a rendered overlay as PNG with straight (non-premultiplied) alpha
pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, RenderError> {
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    let img = RgbaImage::from_raw(pixmap.width(), pixmap.height(), rgba)
        .ok_or(RenderError::Allocation(pixmap.width(), pixmap.height()))?;

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Color;
    use crate::geometry::{Point, Size};

    fn surface() -> OverlaySurface {
        OverlaySurface::new(Size::new(100.0, 50.0), 1.0).unwrap()
    }

    fn stroke(points: &[(f32, f32)]) -> Drawing {
        Drawing {
            id: 1,
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            color: Color::rgb(255, 0, 0),
            stroke_width: 4.0,
            pixel_ratio: 1.0,
        }
    }

    fn alpha_at(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
        pixmap.pixel(x, y).map(|p| p.alpha()).unwrap_or(0)
    }

    #[test]
    fn test_empty_snapshot_is_transparent() {
        let pixmap = render(&[], None, &surface()).unwrap();
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn test_committed_stroke_is_drawn() {
        let strokes = vec![stroke(&[(10.0, 25.0), (90.0, 25.0)])];
        let pixmap = render(&strokes, None, &surface()).unwrap();
        assert_eq!(alpha_at(&pixmap, 50, 25), 255);
        assert_eq!(alpha_at(&pixmap, 50, 5), 0);
        let px = pixmap.pixel(50, 25).unwrap().demultiply();
        assert_eq!((px.red(), px.green(), px.blue()), (255, 0, 0));
    }

    #[test]
    fn test_in_progress_stroke_is_drawn_on_top() {
        let live = stroke(&[(50.0, 0.0), (50.0, 50.0)]);
        let pixmap = render(&[], Some(&live), &surface()).unwrap();
        assert_eq!(alpha_at(&pixmap, 50, 25), 255);
    }

    #[test]
    fn test_single_point_stroke_is_skipped() {
        let dot = stroke(&[(50.0, 25.0)]);
        let pixmap = render(&[], Some(&dot), &surface()).unwrap();
        assert_eq!(alpha_at(&pixmap, 50, 25), 0);
    }

    #[test]
    fn test_render_is_full_redraw() {
        let first = vec![stroke(&[(10.0, 10.0), (90.0, 10.0)])];
        let _ = render(&first, None, &surface()).unwrap();
        // A later render without that stroke must not contain it
        let pixmap = render(&[], None, &surface()).unwrap();
        assert_eq!(alpha_at(&pixmap, 50, 10), 0);
    }

    #[test]
    fn test_encode_png_signature() {
        let strokes = vec![stroke(&[(10.0, 25.0), (90.0, 25.0)])];
        let pixmap = render(&strokes, None, &surface()).unwrap();
        let png = encode_png(&pixmap).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
