//! Screen → canvas → PDF page mapping

use serde::{Deserialize, Serialize};

use super::types::{ClientRect, GeometryError, PageBox, Point, Size};

/// Map a pointer position to overlay space (container-relative CSS pixels)
pub fn overlay_point(client: Point, container: ClientRect) -> Result<Point, GeometryError> {
    let client = container.admit(client, "container")?;
    Ok(Point::new(client.x - container.left, client.y - container.top))
}

/// Map a pointer position to canvas backing-store pixels.
///
/// `displayed` is the canvas element's client rect; `backing` is its pixel
/// buffer size. Each axis is scaled independently by `backing / displayed`,
/// which absorbs both the device pixel ratio and CSS scaling.
pub fn canvas_point(
    client: Point,
    displayed: ClientRect,
    backing: Size,
) -> Result<Point, GeometryError> {
    let shown = displayed.size().validated("displayed canvas")?;
    let client = displayed.admit(client, "canvas")?;
    let scale_x = backing.width / shown.width;
    let scale_y = backing.height / shown.height;
    Ok(Point::new(
        (client.x - displayed.left) * scale_x,
        (client.y - displayed.top) * scale_y,
    ))
}

/// Sizes the client reports for the on-screen rendering of page 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedLayout {
    /// The editor container's displayed size
    pub container: Size,
    /// The PDF viewer's rendering canvas, when one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_canvas: Option<Size>,
}

impl RenderedLayout {
    /// The size overlay coordinates are measured against.
    ///
    /// The page canvas reflects the viewer's fit-to-width/zoom, so it wins
    /// over the container whenever it is present.
    pub fn projection_basis(&self) -> Size {
        self.page_canvas.unwrap_or(self.container)
    }
}

/// Projection from overlay space onto a PDF page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageProjection {
    page: PageBox,
    scale_x: f32,
    scale_y: f32,
}

impl PageProjection {
    pub fn new(page: PageBox, overlay: Size) -> Result<Self, GeometryError> {
        let overlay = overlay.validated("overlay")?;
        let page_size = page.size.validated("page")?;
        Ok(Self {
            page,
            scale_x: page_size.width / overlay.width,
            scale_y: page_size.height / overlay.height,
        })
    }

    /// Overlay → PDF points, flipping the Y axis
    pub fn to_page(&self, p: Point) -> Point {
        Point::new(
            self.page.origin.x + p.x * self.scale_x,
            self.page.origin.y + self.page.size.height - p.y * self.scale_y,
        )
    }

    /// Horizontal points-per-overlay-pixel; used to scale widths and font sizes
    pub fn scale_x(&self) -> f32 {
        self.scale_x
    }

    /// Length of the page diagonal in points
    pub fn page_diagonal(&self) -> f32 {
        self.page.size.width.hypot(self.page.size.height)
    }
}
