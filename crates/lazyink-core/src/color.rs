//! CSS color strings.
//!
//! Brush and interface colors are stored exactly as the host supplied them so
//! that save data round-trips unchanged. They are only resolved to a
//! [`peniko::Color`] when something is painted.

use peniko::Color;
use peniko::color::{Srgb, parse_color};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A color as written in CSS (`#444`, `#0a0302`, `rgba(150,150,150,0.17)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrushColor(String);

impl BrushColor {
    pub fn new(css: impl Into<String>) -> Self {
        Self(css.into())
    }

    /// The color string as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve to a paint color. Unparseable strings resolve to opaque black.
    pub fn to_color(&self) -> Color {
        parse_css_color(&self.0).unwrap_or(Color::BLACK)
    }

    /// Resolve to RGBA bytes, if the string is a color we understand.
    pub fn to_rgba8(&self) -> Option<[u8; 4]> {
        let rgba = parse_css_color(&self.0)?.to_rgba8();
        Some([rgba.r, rgba.g, rgba.b, rgba.a])
    }
}

impl Default for BrushColor {
    fn default() -> Self {
        Self::new("#444")
    }
}

impl fmt::Display for BrushColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BrushColor {
    fn from(css: &str) -> Self {
        Self::new(css)
    }
}

impl From<String> for BrushColor {
    fn from(css: String) -> Self {
        Self(css)
    }
}

fn parse_css_color(css: &str) -> Option<Color> {
    parse_color(css.trim())
        .map(|color| color.to_alpha_color::<Srgb>())
        .ok()
}
