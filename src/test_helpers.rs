//! Shared test utilities for the simple-srcset test suite.
//!
//! Provides fixture builders (synthetic JPEGs, source records, healed
//! options) and recording collaborators that stand in for the reporter and
//! the render dispatcher.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let source = source_image(1600, 900);
//! let plan = plan_fluid(&source, &image_options()).unwrap();
//!
//! let reporter = Arc::new(RecordingReporter::default());
//! let dispatcher = Arc::new(RecordingDispatcher::default());
//! // ... run the pipeline ...
//! assert!(reporter.warnings().is_empty());
//! assert_eq!(dispatcher.requests().len(), 1);
//! ```

use async_trait::async_trait;
use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::PluginConfig;
use crate::dispatch::{
    DispatchError, RenderDispatcher, RenderMetadata, RenderOperation, RenderRequest,
};
use crate::imaging::backend::DEFAULT_DENSITY;
use crate::imaging::{
    BackendError, CropFocus, Fit, ImageFormat, Quality, TransformArgs,
};
use crate::options::{ImageArgs, ImageOptions, heal};
use crate::report::Reporter;
use crate::types::SourceImage;

// =========================================================================
// Fixtures
// =========================================================================

/// Write a gradient JPEG of `width × height` to `path`.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Plain JPEG render arguments at `width × height`.
pub fn transform_args(width: u32, height: u32) -> TransformArgs {
    TransformArgs {
        width,
        height,
        fit: Fit::Cover,
        crop_focus: CropFocus::Center,
        background: "rgba(0,0,0,1)".to_string(),
        to_format: ImageFormat::Jpg,
        quality: Quality::new(50),
        png_compression_level: 9,
        jpeg_quality: None,
        jpeg_progressive: true,
        webp_quality: None,
        grayscale: false,
        duotone: None,
        rotate: 0,
        trim: None,
    }
}

/// A `photo.jpg` source record with a fixed content digest.
pub fn source_image(width: u32, height: u32) -> SourceImage {
    SourceImage {
        width,
        height,
        density: DEFAULT_DENSITY,
        format: "jpg".to_string(),
        content_digest: "abc123".to_string(),
        absolute_path: PathBuf::from("/content/photo.jpg"),
        name: "photo".to_string(),
        extension: "jpg".to_string(),
    }
}

/// Stock-healed options for a JPEG source (`width 400`, `max_width 800`).
pub fn image_options() -> ImageOptions {
    heal(&PluginConfig::default(), &ImageArgs::default(), "jpg", None)
        .unwrap()
        .options
}

/// A request for `photo.jpg` with one operation per `(width, height)`.
pub fn render_request_for(output_dir: &Path, sizes: &[(u32, u32)]) -> RenderRequest {
    RenderRequest {
        input_path: PathBuf::from("/content/photo.jpg"),
        output_dir: output_dir.to_path_buf(),
        operations: sizes
            .iter()
            .map(|&(w, h)| RenderOperation {
                output_path: format!("{w}x{h}/photo.jpg"),
                args: transform_args(w, h),
            })
            .collect(),
        metadata: RenderMetadata {
            content_digest: "abc123".to_string(),
            name: "photo".to_string(),
            format: "jpg".to_string(),
        },
    }
}

// =========================================================================
// Recording collaborators
// =========================================================================

/// Reporter that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Dispatcher that records requests without rendering.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    requests: Mutex<Vec<RenderRequest>>,
    fail: bool,
}

impl RecordingDispatcher {
    /// A dispatcher whose every request fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderDispatcher for RecordingDispatcher {
    async fn dispatch(&self, request: RenderRequest) -> Result<(), DispatchError> {
        self.requests.lock().unwrap().push(request);
        if self.fail {
            return Err(BackendError::ProcessingFailed("render refused".into()).into());
        }
        Ok(())
    }
}
