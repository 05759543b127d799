//! Annotation entity types

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point;

/// Identity of a note, drawing or text element.
///
/// Monotonic within a session and never reused after deletion.
pub type AnnotationId = u64;

/// Failed to parse a `#rrggbb` color
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid color '{0}', expected #rrggbb")]
pub struct ColorParseError(pub String);

/// An sRGB color, serialized as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Default ink color (indigo)
    pub const INK: Color = Color::rgb(0x63, 0x66, 0xf1);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(value: &str) -> Result<Self, ColorParseError> {
        let hex = value.trim().trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| ColorParseError(value.to_string()))
        };
        if hex.len() != 6 {
            return Err(ColorParseError(value.to_string()));
        }
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Channels as 0.0-1.0 floats, the form PDF color operators take
    pub fn to_unit_rgb(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// A sticky note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: AnnotationId,
    /// Top-left corner in overlay space
    pub x: f32,
    pub y: f32,
    pub text: String,
}

impl Note {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Stroke appearance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStyle {
    pub color: Color,
    /// Width in CSS pixels
    pub stroke_width: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color::INK,
            stroke_width: 2.0,
        }
    }
}

/// A freehand ink stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    pub id: AnnotationId,
    /// Points in canvas backing-store pixels
    pub points: Vec<Point>,
    pub color: Color,
    pub stroke_width: f32,
    /// Canvas backing/displayed ratio when the stroke began
    pub pixel_ratio: f32,
}

impl Drawing {
    /// Whether the stroke has enough points to be drawn or exported
    pub fn is_drawable(&self) -> bool {
        self.points.len() >= 2
    }

    /// Points converted back to overlay space
    pub fn overlay_points(&self) -> impl Iterator<Item = Point> + '_ {
        let ratio = if self.pixel_ratio > 0.0 { self.pixel_ratio } else { 1.0 };
        self.points
            .iter()
            .map(move |p| Point::new(p.x / ratio, p.y / ratio))
    }
}

/// Text label appearance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_size: f32,
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            color: Color::WHITE,
        }
    }
}

/// An editable text label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: AnnotationId,
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub color: Color,
}

impl TextElement {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}
