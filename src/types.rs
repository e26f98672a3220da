//! Shared types used across the planner, the pipeline and the CLI.
//!
//! These types are serialized to JSON by `--json` output and must stay
//! stable across releases.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Intrinsic facts about a source image, read once per planning call.
///
/// Immutable for the duration of the call; the planner never touches the
/// file itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceImage {
    pub width: u32,
    pub height: u32,
    /// Pixels per inch.
    pub density: u32,
    /// Detected container format, lowercase.
    pub format: String,
    /// SHA-256 of the file contents, hex.
    pub content_digest: String,
    pub absolute_path: PathBuf,
    /// File stem, e.g. `sunset` for `photos/sunset.jpg`.
    pub name: String,
    /// Lowercase extension without the dot, empty when absent.
    pub extension: String,
}

impl SourceImage {
    /// Intrinsic size on an axis.
    pub fn size_on(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Width => self.width,
            Axis::Height => self.height,
        }
    }

    /// Whether the source is a vector format with no intrinsic pixel density.
    pub fn is_vector(&self) -> bool {
        self.extension == "svg"
    }
}

/// The dimension a plan is computed along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Width,
    Height,
}
