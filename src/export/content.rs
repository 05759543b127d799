//! Content stream builder for annotation drawing

use lopdf::content::{Content, Operation};
use lopdf::Object;

use super::error::{ExportError, Result};
use crate::annotations::Color;
use crate::geometry::Point;

/// Cubic bezier control distance for a quarter circle
const BEZIER_K: f32 = 0.552_284_8;

fn real(v: f32) -> Object {
    Object::Real(v)
}

fn name(v: &str) -> Object {
    Object::Name(v.as_bytes().to_vec())
}

/// Accumulates page content operators
#[derive(Debug, Default)]
pub struct ContentBuilder {
    ops: Vec<Operation>,
}

impl ContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) -> &mut Self {
        self.ops.push(Operation::new(operator, operands));
        self
    }

    pub fn save(&mut self) -> &mut Self {
        self.op("q", vec![])
    }

    pub fn restore(&mut self) -> &mut Self {
        self.op("Q", vec![])
    }

    /// Apply a named ExtGState resource
    pub fn graphics_state(&mut self, resource: &str) -> &mut Self {
        self.op("gs", vec![name(resource)])
    }

    pub fn fill_color(&mut self, color: Color) -> &mut Self {
        let [r, g, b] = color.to_unit_rgb();
        self.op("rg", vec![real(r), real(g), real(b)])
    }

    pub fn stroke_color(&mut self, color: Color) -> &mut Self {
        let [r, g, b] = color.to_unit_rgb();
        self.op("RG", vec![real(r), real(g), real(b)])
    }

    fn move_to(&mut self, p: Point) -> &mut Self {
        self.op("m", vec![real(p.x), real(p.y)])
    }

    fn line_to(&mut self, p: Point) -> &mut Self {
        self.op("l", vec![real(p.x), real(p.y)])
    }

    fn curve_to(&mut self, c1: Point, c2: Point, end: Point) -> &mut Self {
        self.op(
            "c",
            vec![
                real(c1.x),
                real(c1.y),
                real(c2.x),
                real(c2.y),
                real(end.x),
                real(end.y),
            ],
        )
    }

    /// Filled rectangle with rounded corners; `(x, y)` is the lower-left corner
    pub fn fill_rounded_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32) -> &mut Self {
        let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
        let k = r * BEZIER_K;
        let (x1, y1) = (x + w, y + h);

        self.move_to(Point::new(x + r, y))
            .line_to(Point::new(x1 - r, y))
            .curve_to(Point::new(x1 - r + k, y), Point::new(x1, y + r - k), Point::new(x1, y + r))
            .line_to(Point::new(x1, y1 - r))
            .curve_to(Point::new(x1, y1 - r + k), Point::new(x1 - r + k, y1), Point::new(x1 - r, y1))
            .line_to(Point::new(x + r, y1))
            .curve_to(Point::new(x + r - k, y1), Point::new(x, y1 - r + k), Point::new(x, y1 - r))
            .line_to(Point::new(x, y + r))
            .curve_to(Point::new(x, y + r - k), Point::new(x + r - k, y), Point::new(x + r, y))
            .op("h", vec![])
            .op("f", vec![])
    }

    /// Filled circle built from four bezier arcs
    pub fn fill_circle(&mut self, center: Point, radius: f32) -> &mut Self {
        let (cx, cy, r) = (center.x, center.y, radius);
        let k = r * BEZIER_K;

        self.move_to(Point::new(cx + r, cy))
            .curve_to(Point::new(cx + r, cy + k), Point::new(cx + k, cy + r), Point::new(cx, cy + r))
            .curve_to(Point::new(cx - k, cy + r), Point::new(cx - r, cy + k), Point::new(cx - r, cy))
            .curve_to(Point::new(cx - r, cy - k), Point::new(cx - k, cy - r), Point::new(cx, cy - r))
            .curve_to(Point::new(cx + k, cy - r), Point::new(cx + r, cy - k), Point::new(cx + r, cy))
            .op("h", vec![])
            .op("f", vec![])
    }

    /// Stroked polyline with round caps and joins
    pub fn stroke_polyline(&mut self, points: &[Point], width: f32) -> &mut Self {
        let Some((first, rest)) = points.split_first() else {
            return self;
        };
        self.op("w", vec![real(width)])
            .op("J", vec![Object::Integer(1)])
            .op("j", vec![Object::Integer(1)])
            .move_to(*first);
        for p in rest {
            self.line_to(*p);
        }
        self.op("S", vec![])
    }

    /// One line of text with its baseline starting at `origin`
    pub fn text(&mut self, font: &str, size: f32, origin: Point, encoded: Object) -> &mut Self {
        self.op("BT", vec![])
            .op("Tf", vec![name(font), real(size)])
            .op("Td", vec![real(origin.x), real(origin.y)])
            .op("Tj", vec![encoded])
            .op("ET", vec![])
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn encode(self) -> Result<Vec<u8>> {
        Content {
            operations: self.ops,
        }
        .encode()
        .map_err(|e| ExportError::Serialize(e.to_string()))
    }
}
