//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image` crate (pure Rust decoders) |
//! | Identify | `ImageReader::into_dimensions` (header only) |
//! | Resize | `image::imageops` with `Lanczos3` filter |
//! | Encode → JPEG / PNG / WebP / TIFF / GIF | `image::codecs::*` |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Trace | [`trace_image`](super::trace::trace_image) on the transformed image |
//!
//! WebP output is lossless: the `image` crate ships no lossy WebP encoder, so
//! `webp_quality` has no effect here. `jpeg_progressive` is likewise ignored
//! because the JPEG encoder is baseline-only.

use super::backend::{BackendError, DEFAULT_DENSITY, Identified, ImageBackend};
use super::calculations::{
    calculate_contain_dimensions, calculate_fill_dimensions, crop_offset, quarter_turns,
};
use super::params::{Color, Duotone, Fit, ImageFormat, RenderParams, TransformArgs};
use super::trace::{TraceOptions, trace_image};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn open_reader(path: &Path) -> Result<ImageReader<std::io::BufReader<std::fs::File>>, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    open_reader(path)?.decode().map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })
}

/// Apply every transform in `args`, in a fixed order: trim, rotate, fit,
/// grayscale, duotone.
fn transform(img: DynamicImage, args: &TransformArgs) -> Result<DynamicImage, BackendError> {
    let img = match args.trim {
        Some(threshold) => trim(img, threshold),
        None => img,
    };

    let img = match quarter_turns(args.rotate) {
        1 => img.rotate90(),
        2 => img.rotate180(),
        3 => img.rotate270(),
        _ => img,
    };

    let img = fit(img, args)?;
    let img = if args.grayscale { img.grayscale() } else { img };

    match &args.duotone {
        Some(duotone) => apply_duotone(img, duotone),
        None => Ok(img),
    }
}

/// Resize `img` into the `args.width × args.height` box according to `args.fit`.
fn fit(img: DynamicImage, args: &TransformArgs) -> Result<DynamicImage, BackendError> {
    let source = (img.width().max(1), img.height().max(1));
    let target = (args.width.max(1), args.height.max(1));

    let fitted = match args.fit {
        Fit::Cover => {
            let fill = calculate_fill_dimensions(source, target);
            let (x, y) = crop_offset(fill, target, args.crop_focus);
            img.resize_exact(fill.0, fill.1, FilterType::Lanczos3)
                .crop_imm(x, y, target.0, target.1)
        }
        Fit::Contain => {
            let inner = calculate_contain_dimensions(source, target);
            let resized = img.resize_exact(inner.0, inner.1, FilterType::Lanczos3);
            let background = Color::parse(&args.background).ok_or_else(|| {
                BackendError::ProcessingFailed(format!("Invalid background: {}", args.background))
            })?;
            let mut canvas = RgbaImage::from_pixel(target.0, target.1, Rgba(background.rgba()));
            let x = (target.0 - inner.0) / 2;
            let y = (target.1 - inner.1) / 2;
            image::imageops::overlay(&mut canvas, &resized.to_rgba8(), x as i64, y as i64);
            DynamicImage::ImageRgba8(canvas)
        }
        Fit::Fill => img.resize_exact(target.0, target.1, FilterType::Lanczos3),
        Fit::Inside => img.resize(target.0, target.1, FilterType::Lanczos3),
        Fit::Outside => {
            let fill = calculate_fill_dimensions(source, target);
            img.resize_exact(fill.0, fill.1, FilterType::Lanczos3)
        }
    };
    Ok(fitted)
}

/// Crop away a uniform border matching the top-left pixel.
///
/// `threshold` is the largest per-channel difference still counted as border.
fn trim(img: DynamicImage, threshold: f64) -> DynamicImage {
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return img;
    }
    let corner = *rgba.get_pixel(0, 0);
    let differs = |p: &Rgba<u8>| {
        p.0.iter()
            .zip(corner.0.iter())
            .any(|(a, b)| (*a as f64 - *b as f64).abs() > threshold)
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (w, h, 0, 0);
    for (x, y, p) in rgba.enumerate_pixels() {
        if differs(p) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x > max_x || min_y > max_y {
        // Entirely border: nothing sensible to keep
        return img;
    }
    img.crop_imm(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

fn apply_duotone(img: DynamicImage, duotone: &Duotone) -> Result<DynamicImage, BackendError> {
    let parse = |value: &str| {
        Color::parse(value)
            .ok_or_else(|| BackendError::ProcessingFailed(format!("Invalid duotone color: {value}")))
    };
    let highlight = parse(&duotone.highlight)?.rgba();
    let shadow = parse(&duotone.shadow)?.rgba();
    let blend = duotone.opacity.map(|o| o.min(100) as f64 / 100.0).unwrap_or(1.0);

    let mut rgba = img.to_rgba8();
    for pixel in rgba.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let luminance = (0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64) / 255.0;
        let mut toned = [0u8; 4];
        for c in 0..3 {
            let mapped = shadow[c] as f64 + (highlight[c] as f64 - shadow[c] as f64) * luminance;
            let original = pixel.0[c] as f64;
            toned[c] = (mapped * blend + original * (1.0 - blend)).round().clamp(0.0, 255.0) as u8;
        }
        toned[3] = a;
        *pixel = Rgba(toned);
    }
    Ok(DynamicImage::ImageRgba8(rgba))
}

/// Encode an already-transformed image to `args.to_format`.
fn encode_image(img: &DynamicImage, args: &TransformArgs) -> Result<Vec<u8>, BackendError> {
    let quality = args.effective_quality().value();
    let failed =
        |e: image::ImageError| BackendError::ProcessingFailed(format!("{} encode failed: {e}", args.to_format));

    let mut buf = Vec::new();
    match args.to_format {
        ImageFormat::Jpg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality as u8);
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(failed)?;
        }
        ImageFormat::Png => {
            let compression = match args.png_compression_level {
                0..=3 => CompressionType::Fast,
                4..=6 => CompressionType::Default,
                _ => CompressionType::Best,
            };
            let encoder = PngEncoder::new_with_quality(&mut buf, compression, PngFilter::Adaptive);
            img.write_with_encoder(encoder).map_err(failed)?;
        }
        ImageFormat::Webp => {
            let encoder = WebPEncoder::new_lossless(&mut buf);
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_with_encoder(encoder)
                .map_err(failed)?;
        }
        ImageFormat::Avif => {
            let encoder = AvifEncoder::new_with_speed_quality(&mut buf, 6, quality as u8);
            img.write_with_encoder(encoder).map_err(failed)?;
        }
        ImageFormat::Tif => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Tiff)
                .map_err(failed)?;
        }
        ImageFormat::Gif => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Gif)
                .map_err(failed)?;
        }
    }
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Identified, BackendError> {
        let reader = open_reader(path)?;
        let format = reader
            .format()
            .and_then(|f| f.extensions_str().first().copied())
            .ok_or_else(|| {
                BackendError::UnsupportedFormat(format!("Unrecognized image: {}", path.display()))
            })?
            .to_string();
        let (width, height) = reader.into_dimensions().map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Identified {
            width,
            height,
            format,
            density: DEFAULT_DENSITY,
        })
    }

    fn render(&self, params: &RenderParams) -> Result<(), BackendError> {
        let img = transform(load_image(&params.source)?, &params.args)?;
        let bytes = encode_image(&img, &params.args)?;
        if let Some(parent) = params.output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&params.output, bytes)?;
        Ok(())
    }

    fn encode(&self, source: &Path, args: &TransformArgs) -> Result<Vec<u8>, BackendError> {
        let img = transform(load_image(source)?, args)?;
        encode_image(&img, args)
    }

    fn trace(
        &self,
        source: &Path,
        args: &TransformArgs,
        options: &TraceOptions,
    ) -> Result<String, BackendError> {
        let img = transform(load_image(source)?, args)?;
        Ok(trace_image(&img, options, args.width, args.height))
    }
}
