//! Traced vector placeholders.
//!
//! A coarse silhouette of the image as a single SVG path: the source is
//! downsampled to a small luminance raster, thresholded, and every horizontal
//! run of dark cells becomes a one-cell-tall rectangle. The result paints
//! instantly and scales to the final box via `viewBox`.

use super::params::Color;
use image::DynamicImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Options for a traced placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceOptions {
    /// Fill color of the traced shape.
    pub color: String,
    /// Background fill; `transparent` omits the background rect.
    pub background: String,
    /// Luminance cut-off (0–255). `None` uses the mean luminance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u8>,
    /// Runs shorter than this many cells are dropped as speckles.
    pub speckle: u32,
    /// Raster columns sampled across the image width.
    pub resolution: u32,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            color: "lightgray".to_string(),
            background: "transparent".to_string(),
            threshold: None,
            speckle: 2,
            resolution: 64,
        }
    }
}

/// Trace `img` into an SVG document.
///
/// `width`/`height` are the presentation dimensions written on the root
/// element; the path itself lives in raster coordinates.
pub fn trace_image(img: &DynamicImage, options: &TraceOptions, width: u32, height: u32) -> String {
    let cols = options.resolution.clamp(1, img.width().max(1));
    let rows = ((cols as f64 * img.height() as f64 / img.width().max(1) as f64).round() as u32)
        .max(1);
    let raster = img.resize_exact(cols, rows, FilterType::Triangle).to_luma8();

    let threshold = options.threshold.unwrap_or_else(|| {
        let total: u64 = raster.pixels().map(|p| p.0[0] as u64).sum();
        (total / (cols as u64 * rows as u64)) as u8
    });

    let mut path = String::new();
    for y in 0..rows {
        let mut x = 0;
        while x < cols {
            if raster.get_pixel(x, y).0[0] >= threshold {
                x += 1;
                continue;
            }
            let start = x;
            while x < cols && raster.get_pixel(x, y).0[0] < threshold {
                x += 1;
            }
            let run = x - start;
            if run >= options.speckle.max(1) {
                let _ = write!(path, "M{start} {y}h{run}v1h-{run}z");
            }
        }
    }

    let fill = Color::parse(&options.color).unwrap_or(Color([211, 211, 211, 255]));
    let background = Color::parse(&options.background).unwrap_or(Color([0, 0, 0, 0]));

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {cols} {rows}" preserveAspectRatio="none">"#
    );
    if !background.is_transparent() {
        let _ = write!(
            svg,
            r#"<rect width="100%" height="100%" fill="{}" fill-opacity="{:.2}"/>"#,
            background.to_hex(),
            background.opacity()
        );
    }
    if !path.is_empty() {
        let _ = write!(
            svg,
            r#"<path fill="{}" fill-opacity="{:.2}" d="{path}"/>"#,
            fill.to_hex(),
            fill.opacity()
        );
    }
    svg.push_str("</svg>");
    svg
}

/// Wrap an SVG document as a `data:` URI suitable for `src` attributes.
pub fn svg_data_uri(svg: &str) -> String {
    format!(
        "data:image/svg+xml,{}",
        crate::naming::url_encode(svg)
    )
}
