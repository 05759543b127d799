//! Ink overlay rendering using tiny-skia
//!
//! The overlay is a transparent raster layered above the PDF view. It is
//! always redrawn in full from the stroke model: a bitmap has no memory of
//! which pixels belong to which stroke, so the point lists in the
//! annotation store are the only persistent representation.

mod render;
mod surface;

pub use render::{OverlayFrame, RenderError};
pub use surface::OverlaySurface;
