//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations every backend must
//! support: identify, render, encode (in memory) and trace.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust on top of
//! the `image` crate. Tests use the recording `MockBackend` below.

use super::params::{RenderParams, TransformArgs};
use super::trace::TraceOptions;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Pixel density assumed when a source carries no resolution metadata.
pub const DEFAULT_DENSITY: u32 = 72;

/// Result of an identify operation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Identified {
    pub width: u32,
    pub height: u32,
    /// Detected container format, lowercase (`jpeg`, `png`, ...).
    pub format: String,
    /// Pixels per inch.
    pub density: u32,
}

/// Trait for image processing backends.
///
/// Every backend must implement all four operations so the planner and the
/// dispatchers stay backend-agnostic. `Send + Sync` because renders run on
/// the blocking pool and fan out with rayon.
pub trait ImageBackend: Send + Sync {
    /// Read intrinsic dimensions and format without a full decode.
    fn identify(&self, path: &Path) -> Result<Identified, BackendError>;

    /// Render one variant to `params.output`.
    fn render(&self, params: &RenderParams) -> Result<(), BackendError>;

    /// Render one variant into memory (used for base64 placeholders).
    fn encode(&self, source: &Path, args: &TransformArgs) -> Result<Vec<u8>, BackendError>;

    /// Produce a traced SVG placeholder document.
    fn trace(
        &self,
        source: &Path,
        args: &TransformArgs,
        options: &TraceOptions,
    ) -> Result<String, BackendError>;
}
