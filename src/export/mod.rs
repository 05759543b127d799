//! PDF export
//!
//! Annotations are burned into the first page of the original document:
//!
//! - Notes become a translucent rounded box with black text
//! - Ink strokes become stamped dots (or a native path, see [`StrokeMode`])
//! - Text elements become plain black text
//!
//! The original page content is kept as-is and wrapped in `q … Q`; the
//! annotation drawing goes into a new content stream appended after it.
//! Everything here is synchronous and runs on a blocking thread; the async
//! part is limited to fetching the font.

mod compositor;
mod content;
mod error;
mod font;
mod page;

#[cfg(test)]
pub(crate) mod test_support;

pub use compositor::{composite, ExportOptions, StrokeMode};
pub use error::{ExportError, Result};
pub use font::{FileFontSource, FontData, FontSource, StandardFontSource};
