//! Parameter types for image operations.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between the planner (which decides which variants exist) and the
//! [`backend`](super::backend) (which does the pixel work). Every field of
//! [`TransformArgs`] feeds the args digest, so two variants with equal args
//! always land on the same output path.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`ImageFormat`]: Output format with its extension and MIME type.
//! - [`Fit`] / [`CropFocus`]: How a source is fitted into a target box.
//! - [`Color`]: Parsed CSS-ish color used for backgrounds and duotone.
//! - [`Duotone`]: Two-color gradient map applied after resizing.
//! - [`TransformArgs`]: Everything needed to render one variant.
//! - [`RenderParams`]: A [`TransformArgs`] bound to a source and output path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(50)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Output formats the backend can encode.
///
/// The MIME mapping is a closed table: adding a format means adding a row
/// to both [`extension`](Self::extension) and [`mime_type`](Self::mime_type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpg,
    Webp,
    Tif,
    Avif,
    Gif,
}

impl ImageFormat {
    /// Parse a format name or file extension. `jpeg` and `tiff` are aliases.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "webp" => Some(Self::Webp),
            "tif" | "tiff" => Some(Self::Tif),
            "avif" => Some(Self::Avif),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
            Self::Tif => "tif",
            Self::Avif => "avif",
            Self::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Tif => "image/tiff",
            Self::Avif => "image/avif",
            Self::Gif => "image/gif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How the source is fitted into a `width × height` box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    /// Fill the box, cropping the overflow (at [`CropFocus`]).
    #[default]
    Cover,
    /// Fit inside the box, letterboxing with the background color.
    Contain,
    /// Stretch to the exact box, ignoring aspect ratio.
    Fill,
    /// Fit inside the box without letterboxing.
    Inside,
    /// Cover the box without cropping.
    Outside,
}

/// Which part of the image survives a [`Fit::Cover`] crop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropFocus {
    Center,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    /// Content-aware strategies; rendered as [`CropFocus::Center`].
    Entropy,
    #[default]
    Attention,
}

/// An RGBA color parsed from `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()`,
/// `rgba()` or a handful of named colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim().to_ascii_lowercase();
        match s.as_str() {
            "transparent" => return Some(Self([0, 0, 0, 0])),
            "black" => return Some(Self([0, 0, 0, 255])),
            "white" => return Some(Self([255, 255, 255, 255])),
            "gray" | "grey" => return Some(Self([128, 128, 128, 255])),
            "lightgray" | "lightgrey" => return Some(Self([211, 211, 211, 255])),
            "darkgray" | "darkgrey" => return Some(Self([169, 169, 169, 255])),
            _ => {}
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(body) = s.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
            return parse_rgb_fn(body, true);
        }
        if let Some(body) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            return parse_rgb_fn(body, false);
        }
        None
    }

    pub fn rgba(self) -> [u8; 4] {
        self.0
    }

    pub fn is_transparent(self) -> bool {
        self.0[3] == 0
    }

    /// `#rrggbb` without the alpha channel, for SVG `fill` attributes.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }

    pub fn opacity(self) -> f32 {
        self.0[3] as f32 / 255.0
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some(Color([
            digit(0)? * 17,
            digit(1)? * 17,
            digit(2)? * 17,
            255,
        ])),
        6 => Some(Color([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Color([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

fn parse_rgb_fn(body: &str, with_alpha: bool) -> Option<Color> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }
    let r = parts[0].parse::<u8>().ok()?;
    let g = parts[1].parse::<u8>().ok()?;
    let b = parts[2].parse::<u8>().ok()?;
    let a = if with_alpha {
        let alpha = parts[3].parse::<f32>().ok()?;
        if !(0.0..=1.0).contains(&alpha) {
            return None;
        }
        (alpha * 255.0).round() as u8
    } else {
        255
    };
    Some(Color([r, g, b, a]))
}

/// Duotone gradient map: luminance 0 maps to `shadow`, 1 to `highlight`.
///
/// `opacity` (0–100) blends the toned image over the original; `None`
/// replaces the original entirely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Duotone {
    pub highlight: String,
    pub shadow: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<u8>,
}

/// Resolved arguments for rendering a single variant.
///
/// This is the unit hashed into the args digest; `path_prefix` is
/// deliberately absent so that re-hosting a site does not re-render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformArgs {
    pub width: u32,
    pub height: u32,
    pub fit: Fit,
    pub crop_focus: CropFocus,
    pub background: String,
    pub to_format: ImageFormat,
    pub quality: Quality,
    pub png_compression_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jpeg_quality: Option<Quality>,
    pub jpeg_progressive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webp_quality: Option<Quality>,
    pub grayscale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duotone: Option<Duotone>,
    pub rotate: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<f64>,
}

impl TransformArgs {
    /// Quality actually handed to the encoder for `to_format`.
    pub fn effective_quality(&self) -> Quality {
        match self.to_format {
            ImageFormat::Jpg => self.jpeg_quality.unwrap_or(self.quality),
            ImageFormat::Webp => self.webp_quality.unwrap_or(self.quality),
            _ => self.quality,
        }
    }
}

/// Parameters for one render: source file, absolute output path, args.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub args: TransformArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_deserialize_clamps() {
        let q: Quality = serde_json::from_str("250").unwrap();
        assert_eq!(q.value(), 100);
    }

    #[test]
    fn format_aliases() {
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpg));
        assert_eq!(ImageFormat::from_extension("tiff"), Some(ImageFormat::Tif));
        assert_eq!(ImageFormat::from_extension("svg"), None);
        assert_eq!(ImageFormat::from_extension(""), None);
    }

    #[test]
    fn mime_table() {
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
        assert_eq!(ImageFormat::Jpg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::Webp.mime_type(), "image/webp");
        assert_eq!(ImageFormat::Avif.mime_type(), "image/avif");
    }

    #[test]
    fn color_parses_hex_forms() {
        assert_eq!(Color::parse("#fff"), Some(Color([255, 255, 255, 255])));
        assert_eq!(Color::parse("#1a2B3c"), Some(Color([26, 43, 60, 255])));
        assert_eq!(Color::parse("#00000080"), Some(Color([0, 0, 0, 128])));
        assert_eq!(Color::parse("#12"), None);
    }

    #[test]
    fn color_parses_functions_and_names() {
        assert_eq!(Color::parse("rgba(0,0,0,1)"), Some(Color([0, 0, 0, 255])));
        assert_eq!(
            Color::parse("rgb(10, 20, 30)"),
            Some(Color([10, 20, 30, 255]))
        );
        assert_eq!(Color::parse("rgba(0,0,0,2)"), None);
        assert!(Color::parse("transparent").unwrap().is_transparent());
        assert_eq!(Color::parse("lightgray").unwrap().to_hex(), "#d3d3d3");
        assert_eq!(Color::parse("chartreuse"), None);
    }

    #[test]
    fn effective_quality_prefers_format_specific() {
        let mut args = TransformArgs {
            width: 10,
            height: 10,
            fit: Fit::Cover,
            crop_focus: CropFocus::Center,
            background: "black".into(),
            to_format: ImageFormat::Jpg,
            quality: Quality::new(50),
            png_compression_level: 9,
            jpeg_quality: Some(Quality::new(80)),
            jpeg_progressive: true,
            webp_quality: None,
            grayscale: false,
            duotone: None,
            rotate: 0,
            trim: None,
        };
        assert_eq!(args.effective_quality().value(), 80);
        args.to_format = ImageFormat::Webp;
        assert_eq!(args.effective_quality().value(), 50);
    }
}
