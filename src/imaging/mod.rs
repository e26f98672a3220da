//! Image processing: pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Render** | trim → rotate → fit (Lanczos3) → grayscale → duotone → encode |
//! | **Encode** | same pipeline, kept in memory for base64 placeholders |
//! | **Trace** | luminance threshold → SVG path runs |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for size and dimension math (unit testable)
//! - **Parameters**: Data structures describing one render
//! - **Trace**: Vector placeholder generation
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
pub mod calculations;
pub mod params;
pub mod rust_backend;
pub mod trace;

pub use backend::{BackendError, Identified, ImageBackend};
pub use params::{
    Color, CropFocus, Duotone, Fit, ImageFormat, Quality, RenderParams, TransformArgs,
};
pub use rust_backend::RustBackend;
pub use trace::TraceOptions;
