//! Drawing surface sizing

use serde::Serialize;

use crate::geometry::{ClientRect, GeometryError, Point, Size};

/// Largest backing store side, in device pixels
const MAX_BACKING_SIDE: u32 = 16_384;

/// Largest backing store area (256 MiB of RGBA)
const MAX_BACKING_PIXELS: u64 = 1 << 26;

/// The overlay canvas: displayed CSS size plus backing-store resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySurface {
    displayed: Size,
    device_pixel_ratio: f32,
    backing_width: u32,
    backing_height: u32,
}

impl OverlaySurface {
    /// Size a surface for a container of `displayed` CSS pixels
    pub fn new(displayed: Size, device_pixel_ratio: f32) -> Result<Self, GeometryError> {
        let displayed = displayed.validated("overlay container")?;
        // Same fallback as `window.devicePixelRatio || 1`
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        let width = (displayed.width * dpr).round().max(1.0);
        let height = (displayed.height * dpr).round().max(1.0);
        let side = MAX_BACKING_SIDE as f32;
        if width > side || height > side || (width as f64) * (height as f64) > MAX_BACKING_PIXELS as f64 {
            return Err(GeometryError::SurfaceTooLarge { width, height });
        }
        Ok(Self {
            displayed,
            device_pixel_ratio: dpr,
            backing_width: width as u32,
            backing_height: height as u32,
        })
    }

    /// Recompute the backing store for a new container size.
    ///
    /// Bitmap content is not carried over; the next render redraws from the
    /// stroke model.
    pub fn resize(&mut self, displayed: Size, device_pixel_ratio: f32) -> Result<(), GeometryError> {
        *self = Self::new(displayed, device_pixel_ratio)?;
        Ok(())
    }

    pub fn displayed(&self) -> Size {
        self.displayed
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    pub fn backing_size(&self) -> (u32, u32) {
        (self.backing_width, self.backing_height)
    }

    /// Backing pixels per displayed pixel along x
    pub fn pixel_ratio(&self) -> f32 {
        self.backing_width as f32 / self.displayed.width
    }

    /// Map a pointer position onto this surface's backing store.
    ///
    /// `displayed` is the canvas rect the browser reported with the event; it
    /// may differ from the last resize when CSS transforms are in play.
    pub fn to_canvas(&self, client: Point, displayed: ClientRect) -> Result<Point, GeometryError> {
        let backing = Size::new(self.backing_width as f32, self.backing_height as f32);
        crate::geometry::canvas_point(client, displayed, backing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_size_follows_dpr() {
        let surface = OverlaySurface::new(Size::new(400.0, 200.0), 2.0).unwrap();
        assert_eq!(surface.backing_size(), (800, 400));
        assert_eq!(surface.pixel_ratio(), 2.0);
    }

    #[test]
    fn test_invalid_dpr_falls_back_to_one() {
        let surface = OverlaySurface::new(Size::new(300.0, 150.0), 0.0).unwrap();
        assert_eq!(surface.device_pixel_ratio(), 1.0);
        assert_eq!(surface.backing_size(), (300, 150));
    }

    #[test]
    fn test_fractional_dpr_rounds() {
        let surface = OverlaySurface::new(Size::new(333.0, 101.0), 1.5).unwrap();
        assert_eq!(surface.backing_size(), (500, 152));
    }

    #[test]
    fn test_oversized_backing_rejected() {
        let result = OverlaySurface::new(Size::new(1.0e6, 1.0e6), 4.0);
        assert!(matches!(result, Err(GeometryError::SurfaceTooLarge { .. })));

        // Each side fits, the area does not
        let result = OverlaySurface::new(Size::new(16_000.0, 16_000.0), 1.0);
        assert!(matches!(result, Err(GeometryError::SurfaceTooLarge { .. })));

        let result = OverlaySurface::new(Size::new(8_192.0, 4_096.0), 2.0);
        assert!(matches!(result, Err(GeometryError::SurfaceTooLarge { .. })));

        let surface = OverlaySurface::new(Size::new(4_096.0, 4_096.0), 2.0).unwrap();
        assert_eq!(surface.backing_size(), (8_192, 8_192));
    }

    #[test]
    fn test_resize_replaces_dimensions() {
        let mut surface = OverlaySurface::new(Size::new(400.0, 200.0), 1.0).unwrap();
        surface.resize(Size::new(1000.0, 500.0), 2.0).unwrap();
        assert_eq!(surface.backing_size(), (2000, 1000));
        assert!(surface.resize(Size::new(0.0, 500.0), 2.0).is_err());
        // A failed resize leaves the surface untouched
        assert_eq!(surface.backing_size(), (2000, 1000));
    }

    #[test]
    fn test_to_canvas_uses_backing_store() {
        let surface = OverlaySurface::new(Size::new(400.0, 200.0), 2.0).unwrap();
        let rect = ClientRect::new(0.0, 0.0, 400.0, 200.0);
        let p = surface.to_canvas(Point::new(100.0, 50.0), rect).unwrap();
        assert_eq!(p, Point::new(200.0, 100.0));
    }
}
