//! Geometric primitives shared by the overlay and the export path

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when a size cannot be used as a scaling basis
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Degenerate {what}: {width}x{height}")]
    DegenerateSize {
        what: &'static str,
        width: f32,
        height: f32,
    },

    #[error("Surface backing store of {width}x{height} pixels exceeds the limit")]
    SurfaceTooLarge { width: f32, height: f32 },

    #[error("Non-finite point ({x}, {y})")]
    NonFinitePoint { x: f32, y: f32 },

    #[error("Point ({x}, {y}) is too far outside the {what}")]
    OutOfBounds { what: &'static str, x: f32, y: f32 },
}

/// A point in any of the editor's coordinate spaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: Point) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    /// Linear interpolation towards `other` at parameter `t` (0.0..=1.0)
    pub fn lerp(&self, other: Point, t: f32) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Width and height of a surface, container or page
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the size unchanged if both sides are finite and positive
    pub fn validated(self, what: &'static str) -> Result<Self, GeometryError> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(self)
        } else {
            Err(GeometryError::DegenerateSize {
                what,
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Bounding box of an element as reported by the browser
/// (`getBoundingClientRect`), in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ClientRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Accept `p` if it lies within the rect grown by its own size on every
    /// side. Pointer events keep arriving a little past the element's edge;
    /// anything beyond that margin is not a real pointer position.
    pub fn admit(&self, p: Point, what: &'static str) -> Result<Point, GeometryError> {
        if !p.is_finite() {
            return Err(GeometryError::NonFinitePoint { x: p.x, y: p.y });
        }
        let margin_x = self.width.abs();
        let margin_y = self.height.abs();
        let inside_x = p.x >= self.left - margin_x && p.x <= self.left + self.width + margin_x;
        let inside_y = p.y >= self.top - margin_y && p.y <= self.top + self.height + margin_y;
        if inside_x && inside_y {
            Ok(p)
        } else {
            Err(GeometryError::OutOfBounds { what, x: p.x, y: p.y })
        }
    }
}

/// A page's MediaBox in PDF points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    /// Lower-left corner
    pub origin: Point,
    pub size: Size,
}

impl PageBox {
    /// Build from a MediaBox array `[llx lly urx ury]`
    pub fn from_corners(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        let (x0, x1) = if llx <= urx { (llx, urx) } else { (urx, llx) };
        let (y0, y1) = if lly <= ury { (lly, ury) } else { (ury, lly) };
        Self {
            origin: Point::new(x0, y0),
            size: Size::new(x1 - x0, y1 - y0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_validation() {
        assert!(Size::new(10.0, 5.0).validated("container").is_ok());
        assert!(Size::new(0.0, 5.0).validated("container").is_err());
        assert!(Size::new(10.0, f32::NAN).validated("container").is_err());
        assert!(Size::new(-1.0, 5.0).validated("container").is_err());
    }

    #[test]
    fn test_page_box_normalizes_corners() {
        let page = PageBox::from_corners(612.0, 792.0, 0.0, 0.0);
        assert_eq!(page.origin, Point::new(0.0, 0.0));
        assert_eq!(page.size, Size::new(612.0, 792.0));
    }

    #[test]
    fn test_admit_allows_small_overshoot() {
        let rect = ClientRect::new(10.0, 20.0, 100.0, 50.0);
        assert!(rect.admit(Point::new(50.0, 40.0), "canvas").is_ok());
        assert!(rect.admit(Point::new(-80.0, 110.0), "canvas").is_ok());
        assert!(matches!(
            rect.admit(Point::new(200_000.0, 40.0), "canvas"),
            Err(GeometryError::OutOfBounds { .. })
        ));
        assert!(matches!(
            rect.admit(Point::new(f32::INFINITY, 40.0), "canvas"),
            Err(GeometryError::NonFinitePoint { .. })
        ));
        assert!(rect.admit(Point::new(f32::NAN, 40.0), "canvas").is_err());
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, -4.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Point::new(5.0, -2.0));
    }
}
