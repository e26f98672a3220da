//! Options healing: from sparse argument layers to one resolved record.
//!
//! Image options arrive in up to three layers, each of which may set any
//! subset of keys:
//!
//! ```text
//! plugin defaults  <  call arguments  <  overrides
//! ```
//!
//! Layers are merged key by key with [`merge_toml`](crate::config::merge_toml),
//! the same recursive merge the config loader uses.
//!
//! Healing then fills stock fallbacks, derives the output format from the
//! source extension, and checks every sizing dimension. Options that cannot
//! apply (a WebP quality when encoding PNG, the deprecated
//! `size_by_pixel_density`) are dropped with a warning instead of failing.
//!
//! [`heal`] is pure: no I/O, and identical inputs give identical output.

use crate::config::{PluginConfig, merge_toml};
use crate::imaging::{
    Color, CropFocus, Duotone, Fit, ImageFormat, Quality, TraceOptions, TransformArgs,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width used by fixed plans when neither width nor height is given.
pub const DEFAULT_WIDTH: i64 = 400;
/// Max width used by fluid plans when neither max dimension is given.
pub const DEFAULT_MAX_WIDTH: i64 = 800;
pub const DEFAULT_PNG_COMPRESSION_LEVEL: u8 = 9;
pub const DEFAULT_BACKGROUND: &str = "rgba(0,0,0,1)";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    #[error("Invalid option {option}: {reason}")]
    InvalidOption { option: String, reason: String },
    #[error("Invalid {dimension}: {value} (must be at least 1)")]
    InvalidDimension { dimension: String, value: i64 },
    #[error("Invalid breakpoint: {0} (must be greater than 0)")]
    InvalidBreakpoint(f64),
    #[error("Could not merge option layers: {0}")]
    Merge(String),
    #[error("Could not serialize render arguments: {0}")]
    Args(String),
}

impl OptionsError {
    fn invalid(option: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.to_string(),
            reason: reason.into(),
        }
    }
}

/// One sparse layer of image arguments.
///
/// Every key is optional; absent keys fall through to the layer below.
/// Sizes are signed so that a zero or negative request can be reported
/// instead of silently wrapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<Fit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_focus: Option<CropFocus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Output format name; empty or absent derives it from the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_format_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png_compression_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jpeg_quality: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jpeg_progressive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webp_quality: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grayscale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duotone: Option<Duotone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_set_breakpoints: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traced_svg: Option<TraceOptions>,
    /// Deprecated; accepted and ignored with a warning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_by_pixel_density: Option<bool>,
}

/// Fully resolved options for one planning call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub fit: Fit,
    pub crop_focus: CropFocus,
    pub background: String,
    pub to_format: ImageFormat,
    pub to_format_base64: ImageFormat,
    pub quality: Quality,
    pub png_compression_level: u8,
    pub jpeg_quality: Option<Quality>,
    pub jpeg_progressive: bool,
    pub webp_quality: Option<Quality>,
    pub grayscale: bool,
    pub duotone: Option<Duotone>,
    pub rotate: i32,
    pub trim: Option<f64>,
    pub base64: bool,
    pub base64_width: u32,
    pub src_set_breakpoints: Vec<f64>,
    pub path_prefix: String,
    pub sizes: Option<String>,
    pub traced_svg: Option<TraceOptions>,
}

impl ImageOptions {
    /// Per-variant render arguments at `width × height`.
    pub fn transform_args(&self, width: u32, height: u32) -> TransformArgs {
        TransformArgs {
            width,
            height,
            fit: self.fit,
            crop_focus: self.crop_focus,
            background: self.background.clone(),
            to_format: self.to_format,
            quality: self.quality,
            png_compression_level: self.png_compression_level,
            jpeg_quality: self.jpeg_quality,
            jpeg_progressive: self.jpeg_progressive,
            webp_quality: self.webp_quality,
            grayscale: self.grayscale,
            duotone: self.duotone.clone(),
            rotate: self.rotate,
            trim: self.trim,
        }
    }

    /// Render arguments for the base64 placeholder.
    pub fn base64_args(&self, width: u32, height: u32) -> TransformArgs {
        TransformArgs {
            to_format: self.to_format_base64,
            ..self.transform_args(width, height)
        }
    }
}

/// Healed options plus the non-fatal warnings produced along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Healed {
    pub options: ImageOptions,
    pub warnings: Vec<String>,
}

/// The plugin-wide layer implied by the config: its top-level knobs first,
/// then its `[defaults]` table on top.
fn plugin_layer(config: &PluginConfig) -> ImageArgs {
    let top = ImageArgs {
        quality: Some(config.default_quality),
        base64_width: Some(config.base64_width),
        to_format_base64: config.force_base64_format.clone(),
        path_prefix: Some(config.path_prefix.clone()),
        ..ImageArgs::default()
    };
    // defaults wins over the top-level knobs, key by key
    ImageArgs {
        quality: config.defaults.quality.or(top.quality),
        base64_width: config.defaults.base64_width.or(top.base64_width),
        to_format_base64: config.defaults.to_format_base64.clone().or(top.to_format_base64),
        path_prefix: config.defaults.path_prefix.clone().or(top.path_prefix),
        ..config.defaults.clone()
    }
}

/// Merge argument layers, lowest first.
pub fn merge_layers(layers: &[&ImageArgs]) -> Result<ImageArgs, OptionsError> {
    let mut merged = toml::Value::Table(Default::default());
    for layer in layers {
        let value =
            toml::Value::try_from(*layer).map_err(|e| OptionsError::Merge(e.to_string()))?;
        merged = merge_toml(merged, value);
    }
    merged
        .try_into()
        .map_err(|e: toml::de::Error| OptionsError::Merge(e.to_string()))
}

/// Heal `args` against the plugin `config` for a source with `extension`.
///
/// Merge order is `config < args < overrides`. Fails on a present sizing
/// dimension below 1, an output format that is unknown or cannot be
/// inferred, and malformed colors or qualities.
pub fn heal(
    config: &PluginConfig,
    args: &ImageArgs,
    extension: &str,
    overrides: Option<&ImageArgs>,
) -> Result<Healed, OptionsError> {
    let plugin = plugin_layer(config);
    let empty = ImageArgs::default();
    let overrides = overrides.unwrap_or(&empty);
    let merged = merge_layers(&[&plugin, args, overrides])?;
    // Only what the caller asked for can be "ignored"; plugin-wide defaults
    // are allowed to carry options the current format does not use.
    let requested = merge_layers(&[args, overrides])?;

    let mut warnings = Vec::new();
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    let is_vector = extension == "svg";

    let to_format = resolve_format("to_format", merged.to_format.as_deref(), &extension)?;
    let to_format_base64 = match merged.to_format_base64.as_deref() {
        Some(name) if !name.trim().is_empty() => parse_format("to_format_base64", name)?,
        _ => to_format,
    };

    let (width, height) = match (merged.width, merged.height) {
        (None, None) => (Some(DEFAULT_WIDTH), None),
        dims => dims,
    };
    let (max_width, max_height) = match (merged.max_width, merged.max_height) {
        (None, None) => (Some(DEFAULT_MAX_WIDTH), None),
        dims => dims,
    };

    let background = merged
        .background
        .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string());
    if Color::parse(&background).is_none() {
        return Err(OptionsError::invalid(
            "background",
            format!("unrecognized color {background:?}"),
        ));
    }
    if let Some(duotone) = &merged.duotone {
        for (key, value) in [("highlight", &duotone.highlight), ("shadow", &duotone.shadow)] {
            if Color::parse(value).is_none() {
                return Err(OptionsError::invalid(
                    &format!("duotone.{key}"),
                    format!("unrecognized color {value:?}"),
                ));
            }
        }
        if duotone.opacity.is_some_and(|o| o > 100) {
            return Err(OptionsError::invalid("duotone.opacity", "must be 0-100"));
        }
    }

    let png_compression_level = merged
        .png_compression_level
        .unwrap_or(DEFAULT_PNG_COMPRESSION_LEVEL);
    if png_compression_level > 9 {
        return Err(OptionsError::invalid(
            "png_compression_level",
            format!("{png_compression_level} (must be 0-9)"),
        ));
    }

    if requested.size_by_pixel_density.is_some() {
        warnings.push(
            "size_by_pixel_density is deprecated and has no effect; pixel density is always \
             taken into account"
                .to_string(),
        );
    }
    let mut jpeg_quality = quality("jpeg_quality", merged.jpeg_quality)?;
    if requested.jpeg_quality.is_some() && to_format != ImageFormat::Jpg {
        warnings.push(format!("jpeg_quality is ignored when encoding {to_format}"));
        jpeg_quality = None;
    }
    let mut webp_quality = quality("webp_quality", merged.webp_quality)?;
    if requested.webp_quality.is_some() && to_format != ImageFormat::Webp {
        warnings.push(format!("webp_quality is ignored when encoding {to_format}"));
        webp_quality = None;
    }
    if requested.png_compression_level.is_some() && to_format != ImageFormat::Png {
        warnings.push(format!(
            "png_compression_level is ignored when encoding {to_format}"
        ));
    }
    if requested.jpeg_progressive.is_some() && to_format != ImageFormat::Jpg {
        warnings.push(format!(
            "jpeg_progressive is ignored when encoding {to_format}"
        ));
    }

    let mut src_set_breakpoints = merged.src_set_breakpoints.unwrap_or_default();
    if is_vector && !src_set_breakpoints.is_empty() {
        warnings.push("src_set_breakpoints are ignored for vector sources".to_string());
        src_set_breakpoints.clear();
    }

    let base64_width = merged.base64_width.unwrap_or(config.base64_width);
    if base64_width < 1 {
        return Err(OptionsError::invalid("base64_width", "must be at least 1"));
    }

    let options = ImageOptions {
        width: dimension("width", width)?,
        height: dimension("height", height)?,
        max_width: dimension("max_width", max_width)?,
        max_height: dimension("max_height", max_height)?,
        fit: merged.fit.unwrap_or_default(),
        crop_focus: merged.crop_focus.unwrap_or_default(),
        background,
        to_format,
        to_format_base64,
        quality: quality("quality", merged.quality)?.unwrap_or_default(),
        png_compression_level,
        jpeg_quality,
        jpeg_progressive: merged.jpeg_progressive.unwrap_or(true),
        webp_quality,
        grayscale: merged.grayscale.unwrap_or(false),
        duotone: merged.duotone,
        rotate: merged.rotate.unwrap_or(0),
        trim: merged.trim,
        base64: merged.base64.unwrap_or(true),
        base64_width,
        src_set_breakpoints,
        path_prefix: merged.path_prefix.unwrap_or_default(),
        sizes: merged.sizes.filter(|s| !s.trim().is_empty()),
        traced_svg: merged.traced_svg,
    };

    Ok(Healed { options, warnings })
}

fn parse_format(option: &str, name: &str) -> Result<ImageFormat, OptionsError> {
    ImageFormat::from_extension(name)
        .ok_or_else(|| OptionsError::invalid(option, format!("unsupported format {name:?}")))
}

/// Explicit format if given, otherwise the source extension's format.
fn resolve_format(
    option: &str,
    requested: Option<&str>,
    extension: &str,
) -> Result<ImageFormat, OptionsError> {
    match requested {
        Some(name) if !name.trim().is_empty() => parse_format(option, name),
        _ if extension.is_empty() => Err(OptionsError::invalid(
            option,
            "not set and the source has no file extension",
        )),
        _ => ImageFormat::from_extension(extension).ok_or_else(|| {
            OptionsError::invalid(
                option,
                format!("not set and cannot be inferred from extension {extension:?}"),
            )
        }),
    }
}

fn dimension(option: &str, value: Option<i64>) -> Result<Option<u32>, OptionsError> {
    match value {
        None => Ok(None),
        Some(v) if v < 1 => Err(OptionsError::invalid(
            option,
            format!("{v} (must be at least 1)"),
        )),
        Some(v) => u32::try_from(v)
            .map(Some)
            .map_err(|_| OptionsError::invalid(option, format!("{v} is too large"))),
    }
}

fn quality(option: &str, value: Option<u32>) -> Result<Option<Quality>, OptionsError> {
    match value {
        Some(q) if !(1..=100).contains(&q) => Err(OptionsError::invalid(
            option,
            format!("{q} (must be 1-100)"),
        )),
        other => Ok(other.map(Quality::new)),
    }
}
