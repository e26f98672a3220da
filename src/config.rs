//! Plugin configuration module.
//!
//! Handles loading, validating, and merging `simple-srcset.toml`. Stock
//! defaults are overridden by the user's config file, key by key.
//!
//! ## Config File Location
//!
//! Place `simple-srcset.toml` in the project root (or pass `--config`):
//!
//! ```text
//! site/
//! ├── simple-srcset.toml      # Overrides stock defaults
//! ├── photos/
//! │   └── ...
//! └── public/                 # Rendered variants land in public/static/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! default_quality = 50        # Lossy quality when a call sets none (1-100)
//! base64_width = 20           # Width of base64 placeholders in pixels
//! # force_base64_format = "png"
//! public_dir = "public"       # Where rendered variants are written
//! path_prefix = ""            # Prepended to every public src
//!
//! [defaults]                  # Any image option, applied to every call
//! fit = "cover"
//! src_set_breakpoints = [480, 960]
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::ImageFormat;
use crate::options::ImageArgs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the project root.
pub const CONFIG_FILENAME: &str = "simple-srcset.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Plugin configuration loaded from `simple-srcset.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginConfig {
    /// Lossy encoding quality used when no call sets one.
    pub default_quality: u32,
    /// Width of base64 placeholders in pixels.
    pub base64_width: u32,
    /// Encode every base64 placeholder in this format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_base64_format: Option<String>,
    /// Directory that receives `static/{contentDigest}/...`.
    pub public_dir: String,
    /// Prefix for public URLs, e.g. `/blog` when the site is not at the root.
    pub path_prefix: String,
    /// Image options applied to every call, below call arguments.
    pub defaults: ImageArgs,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            default_quality: 50,
            base64_width: 20,
            force_base64_format: None,
            public_dir: "public".to_string(),
            path_prefix: String::new(),
            defaults: ImageArgs::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl PluginConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.default_quality) {
            return Err(ConfigError::Validation(
                "default_quality must be 1-100".into(),
            ));
        }
        if self.base64_width == 0 {
            return Err(ConfigError::Validation(
                "base64_width must be at least 1".into(),
            ));
        }
        if let Some(format) = &self.force_base64_format
            && ImageFormat::from_extension(format).is_none()
        {
            return Err(ConfigError::Validation(format!(
                "force_base64_format: unsupported format {format:?}"
            )));
        }
        if self.public_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "public_dir must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PluginConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PluginConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PluginConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `simple-srcset.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<PluginConfig, ConfigError> {
    load_config_file(&root.join(CONFIG_FILENAME))
}

/// Like [`load_config`], for an explicit file path. A missing file yields
/// the stock defaults.
pub fn load_config_file(path: &Path) -> Result<PluginConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `simple-srcset.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# simple-srcset Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Lossy encoding quality used when a call sets none (1 = worst, 100 = best).
default_quality = 50

# Width in pixels of the blurred base64 placeholder embedded in the page.
base64_width = 20

# Encode every base64 placeholder in one format regardless of the output
# format (png, jpg, webp, tif, avif, gif).
# force_base64_format = "png"

# Directory that receives rendered variants under static/{contentDigest}/.
public_dir = "public"

# Prefix for every public src, e.g. "/blog" for a site served below the root.
path_prefix = ""

# ---------------------------------------------------------------------------
# Image option defaults
# ---------------------------------------------------------------------------
# Any per-call image option can be given a project-wide default here.
# Call arguments override these, key by key.
[defaults]
# fit = "cover"                  # cover, contain, fill, inside, outside
# crop_focus = "attention"       # center, north, ..., northwest, entropy, attention
# background = "rgba(0,0,0,1)"   # letterbox color for fit = "contain"
# png_compression_level = 9      # 0-9
# jpeg_progressive = true
# grayscale = false
# rotate = 0
# base64 = true
# src_set_breakpoints = [480, 960, 1440]
#
# [defaults.traced_svg]
# color = "lightgray"
# background = "transparent"
# speckle = 2
# resolution = 64

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Fit;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = PluginConfig::default();
        assert_eq!(config.default_quality, 50);
        assert_eq!(config.base64_width, 20);
        assert_eq!(config.force_base64_format, None);
        assert_eq!(config.public_dir, "public");
        assert_eq!(config.path_prefix, "");
        assert_eq!(config.defaults, ImageArgs::default());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
path_prefix = "/blog"

[defaults]
fit = "contain"
src_set_breakpoints = [480, 960]
"#;
        let config: PluginConfig = toml::from_str(toml).unwrap();
        // Overridden values
        assert_eq!(config.path_prefix, "/blog");
        assert_eq!(config.defaults.fit, Some(Fit::Contain));
        assert_eq!(
            config.defaults.src_set_breakpoints,
            Some(vec![480.0, 960.0])
        );
        // Default values preserved
        assert_eq!(config.default_quality, 50);
        assert_eq!(config.public_dir, "public");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, PluginConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
default_quality = 80
force_base64_format = "png"

[defaults]
grayscale = true
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.default_quality, 80);
        assert_eq!(config.force_base64_format.as_deref(), Some("png"));
        assert_eq!(config.defaults.grayscale, Some(true));
        assert_eq!(config.base64_width, 20);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "this is not = [valid").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_file_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "base64_width = 32\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.base64_width, 32);
    }

    // =========================================================================
    // effective_threads tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let threads = effective_threads(&config);
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(threads, cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let threads = effective_threads(&config);
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(threads, cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"default_quality = 90"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"default_quality = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(
            merged.get("default_quality").unwrap().as_integer(),
            Some(70)
        );
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[defaults]
src_set_breakpoints = [480, 960]
quality = 90
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[defaults]
quality = 70
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let defaults = merged.get("defaults").unwrap();
        assert_eq!(defaults.get("quality").unwrap().as_integer(), Some(70));
        // breakpoints preserved from base
        assert_eq!(
            defaults
                .get("src_set_breakpoints")
                .unwrap()
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn merge_toml_arrays_replace_not_append() {
        let base: toml::Value = toml::from_str(r#"src_set_breakpoints = [1, 2, 3]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"src_set_breakpoints = [9]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(
            merged
                .get("src_set_breakpoints")
                .unwrap()
                .as_array()
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value = toml::from_str(
            r##"
[defaults.traced_svg]
color = "#fff"
background = "#000"
"##,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r##"
[defaults.traced_svg]
color = "#fafafa"
"##,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let trace = merged.get("defaults").unwrap().get("traced_svg").unwrap();
        assert_eq!(trace.get("color").unwrap().as_str(), Some("#fafafa"));
        assert_eq!(trace.get("background").unwrap().as_str(), Some("#000"));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"default_qualty = 90"#;
        let result: Result<PluginConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[defualts]
quality = 90
"#;
        let result: Result<PluginConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let toml_str = r#"
[defaults]
maxwidth = 800
"#;
        let result: Result<PluginConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[processing]
max_proceses = 2
"#,
        )
        .unwrap();

        let result = load_config(tmp.path());
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_quality_boundaries() {
        let mut config = PluginConfig::default();
        config.default_quality = 100;
        assert!(config.validate().is_ok());

        config.default_quality = 1;
        assert!(config.validate().is_ok());

        config.default_quality = 0;
        assert!(config.validate().is_err());

        config.default_quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_quality"));
    }

    #[test]
    fn validate_base64_width_zero() {
        let config = PluginConfig {
            base64_width: 0,
            ..PluginConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_unknown_base64_format() {
        let config = PluginConfig {
            force_base64_format: Some("bmp".into()),
            ..PluginConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bmp"));
    }

    #[test]
    fn validate_zero_processes() {
        let config = PluginConfig {
            processing: ProcessingConfig {
                max_processes: Some(0),
            },
            ..PluginConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(PluginConfig::default().validate().is_ok());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "default_quality = 200\n").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // resolve_config / load_raw_config tests
    // =========================================================================

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let result = load_raw_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn resolve_config_with_no_overlay() {
        let config = resolve_config(stock_defaults_value(), None).unwrap();
        assert_eq!(config, PluginConfig::default());
    }

    #[test]
    fn resolve_config_with_overlay() {
        let overlay: toml::Value = toml::from_str(
            r#"
[defaults]
max_width = 640
"#,
        )
        .unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(config.defaults.max_width, Some(640));
        // Other fields preserved from defaults
        assert_eq!(config.base64_width, 20);
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let content = stock_config_toml();
        let _: toml::Value = toml::from_str(content).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: PluginConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, PluginConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[defaults]"));
        assert!(content.contains("[processing]"));
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        assert!(val.is_table());
        assert!(val.get("defaults").is_some());
        assert!(val.get("processing").is_some());
        assert!(val.get("force_base64_format").is_none());
    }
}
