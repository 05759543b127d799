//! Coordinate mapping
//!
//! Three coordinate spaces meet in the editor:
//!
//! - **Overlay space**: CSS pixels relative to the editor container, origin
//!   top-left. Notes and text labels live here.
//! - **Canvas space**: backing-store pixels of the drawing canvas. Ink strokes
//!   live here. Differs from overlay space by the device pixel ratio and any
//!   CSS scaling of the canvas element.
//! - **PDF page space**: points, origin bottom-left.

mod mapper;
mod types;

pub use mapper::{canvas_point, overlay_point, PageProjection, RenderedLayout};
pub use types::{ClientRect, GeometryError, PageBox, Point, Size};
