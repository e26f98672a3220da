//! Variant planning: which renditions of a source exist, and how to refer
//! to them.
//!
//! The planner is pure and synchronous. Given a [`SourceImage`] and resolved
//! [`ImageOptions`] it decides every variant's dimensions, output path and
//! public URL, and builds the `srcset`/`sizes` attribute strings. Nothing is
//! rendered here; the pipeline hands [`VariantSpec`]s to a dispatcher and
//! fulfils the [`PlaceholderRequest`] itself.
//!
//! ## Modes
//!
//! | Mode | Axis from | Candidates | `srcset` descriptor |
//! |------|-----------|------------|---------------------|
//! | [`plan_fluid`] | `max_width`, else `max_height` | base, ¼, ½, 1.5×, 2× (or breakpoints) + original | `{width}w` |
//! | [`plan_fixed`] | `width`, else `height` | 1×, 1.5×, 2× that fit the source | `1x`, `1.5x`, `2x` |
//! | [`plan_resize`] | `width` and/or `height` | exactly one | none |
//!
//! Candidate sizes come from [`calculations`](crate::imaging::calculations);
//! this module only adds the orthogonal dimension, naming and attributes.

use crate::cache::args_digest;
use crate::imaging::calculations::{
    density_label, derive_other, fixed_sizes, fluid_sizes, placeholder_height,
};
use crate::imaging::{TraceOptions, TransformArgs};
use crate::naming::{output_relative_path, static_src};
use crate::options::{ImageOptions, OptionsError};
use crate::types::{Axis, SourceImage};
use serde::Serialize;

/// One rendition to be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantSpec {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    /// `srcset` descriptor: `800w` for fluid, `1.5x` for fixed.
    pub descriptor: String,
    /// Public URL.
    pub src: String,
    /// Path below the source's output root: `{argsDigest}/{name}.{ext}`.
    pub output_relative_path: String,
    pub args: TransformArgs,
}

/// Placeholder renders a plan needs but does not perform.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaceholderRequest {
    pub base64: Option<TransformArgs>,
    pub traced: Option<TracedRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracedRequest {
    pub args: TransformArgs,
    pub options: TraceOptions,
}

/// Responsive variants selected by width (or height).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluidPlan {
    pub axis: Axis,
    pub variants: Vec<VariantSpec>,
    pub aspect_ratio: f64,
    /// Fallback `src`: the variant closest to the requested size.
    pub src: String,
    pub src_set: String,
    pub src_set_type: String,
    pub sizes: String,
    /// The widest variant.
    pub original_img: String,
    pub original_name: String,
    pub density: u32,
    pub presentation_width: u32,
    pub presentation_height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traced_svg: Option<String>,
    #[serde(skip)]
    pub placeholders: PlaceholderRequest,
}

/// Fixed-size variants at 1x / 1.5x / 2x pixel density.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedPlan {
    pub axis: Axis,
    pub variants: Vec<VariantSpec>,
    /// Presentation size: the 1x variant.
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    pub src: String,
    pub src_set: String,
    pub src_set_type: String,
    pub original_name: String,
    pub density: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traced_svg: Option<String>,
    /// Non-fatal problems, e.g. a request larger than the source.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub placeholders: PlaceholderRequest,
}

/// A single resized rendition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizePlan {
    pub variant: VariantSpec,
    pub src: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    pub original_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(skip)]
    pub placeholders: PlaceholderRequest,
}

/// Access shared by every plan kind, used by the pipeline to dispatch renders
/// and attach placeholders.
pub trait Plan {
    fn variants(&self) -> &[VariantSpec];
    fn placeholders(&self) -> &PlaceholderRequest;
    fn set_base64(&mut self, data_uri: String);
    fn set_traced_svg(&mut self, data_uri: String);

    /// Non-fatal problems found while planning.
    fn warnings(&self) -> &[String] {
        &[]
    }
}

impl Plan for FluidPlan {
    fn variants(&self) -> &[VariantSpec] {
        &self.variants
    }

    fn placeholders(&self) -> &PlaceholderRequest {
        &self.placeholders
    }

    fn set_base64(&mut self, data_uri: String) {
        self.base64 = Some(data_uri);
    }

    fn set_traced_svg(&mut self, data_uri: String) {
        self.traced_svg = Some(data_uri);
    }
}

impl Plan for FixedPlan {
    fn variants(&self) -> &[VariantSpec] {
        &self.variants
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn placeholders(&self) -> &PlaceholderRequest {
        &self.placeholders
    }

    fn set_base64(&mut self, data_uri: String) {
        self.base64 = Some(data_uri);
    }

    fn set_traced_svg(&mut self, data_uri: String) {
        self.traced_svg = Some(data_uri);
    }
}

impl Plan for ResizePlan {
    fn variants(&self) -> &[VariantSpec] {
        std::slice::from_ref(&self.variant)
    }

    fn placeholders(&self) -> &PlaceholderRequest {
        &self.placeholders
    }

    fn set_base64(&mut self, data_uri: String) {
        self.base64 = Some(data_uri);
    }

    // Resize never requests a traced placeholder
    fn set_traced_svg(&mut self, _data_uri: String) {}
}

// ============================================================================
// Shared helpers
// ============================================================================

fn check_source(source: &SourceImage) -> Result<(), OptionsError> {
    for (dimension, value) in [("source width", source.width), ("source height", source.height)] {
        if value < 1 {
            return Err(OptionsError::InvalidDimension {
                dimension: dimension.to_string(),
                value: value as i64,
            });
        }
    }
    Ok(())
}

/// Pick the fixed axis and its requested size from a pair of options.
fn pick_axis(
    (width_name, width): (&str, Option<u32>),
    (height_name, height): (&str, Option<u32>),
) -> Result<(Axis, u32), OptionsError> {
    let (axis, name, value) = match (width, height) {
        (Some(w), _) => (Axis::Width, width_name, w),
        (None, Some(h)) => (Axis::Height, height_name, h),
        (None, None) => (Axis::Width, width_name, 0),
    };
    if value < 1 {
        return Err(OptionsError::InvalidDimension {
            dimension: name.to_string(),
            value: value as i64,
        });
    }
    Ok((axis, value))
}

/// Ratio `other / fixed` used to derive the orthogonal dimension.
///
/// When both dimensions were requested explicitly their ratio wins over the
/// source's intrinsic one.
fn other_ratio(
    axis: Axis,
    source: &SourceImage,
    explicit: (Option<u32>, Option<u32>),
) -> f64 {
    let (width, height) = match explicit {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => (source.width, source.height),
    };
    match axis {
        Axis::Width => height as f64 / width as f64,
        Axis::Height => width as f64 / height as f64,
    }
}

fn oriented(axis: Axis, size: u32, other: u32) -> (u32, u32) {
    match axis {
        Axis::Width => (size, other),
        Axis::Height => (other, size),
    }
}

fn variant(
    source: &SourceImage,
    options: &ImageOptions,
    (width, height): (u32, u32),
    descriptor: String,
) -> Result<VariantSpec, OptionsError> {
    let args = options.transform_args(width, height);
    let digest = args_digest(&args).map_err(|e| OptionsError::Args(e.to_string()))?;
    let relative = output_relative_path(&digest, &source.name, options.to_format.extension());
    Ok(VariantSpec {
        width,
        height,
        aspect_ratio: width as f64 / height as f64,
        descriptor,
        src: static_src(&options.path_prefix, &source.content_digest, &relative),
        output_relative_path: relative,
        args,
    })
}

fn src_set(variants: &[VariantSpec]) -> String {
    variants
        .iter()
        .map(|v| format!("{} {}", v.src, v.descriptor))
        .collect::<Vec<_>>()
        .join(",\n")
}

fn original_name(source: &SourceImage) -> String {
    if source.extension.is_empty() {
        source.name.clone()
    } else {
        format!("{}.{}", source.name, source.extension)
    }
}

/// Placeholder requests shared by every mode.
///
/// `traced_size` is the box the traced SVG is rendered for.
fn placeholders(
    options: &ImageOptions,
    aspect_ratio: f64,
    traced_size: (u32, u32),
) -> PlaceholderRequest {
    let base64 = options.base64.then(|| {
        let width = options.base64_width;
        options.base64_args(width, placeholder_height(width, aspect_ratio))
    });
    let traced = options.traced_svg.as_ref().map(|trace| TracedRequest {
        args: options.transform_args(traced_size.0, traced_size.1),
        options: trace.clone(),
    });
    PlaceholderRequest { base64, traced }
}

// ============================================================================
// Fluid
// ============================================================================

/// Plan responsive variants for `srcset` selection by width.
///
/// Fails with [`OptionsError::InvalidDimension`] when neither max dimension is
/// a positive size and with [`OptionsError::InvalidBreakpoint`] on a
/// breakpoint that is not greater than zero.
pub fn plan_fluid(source: &SourceImage, options: &ImageOptions) -> Result<FluidPlan, OptionsError> {
    check_source(source)?;
    let (axis, requested) = pick_axis(
        ("max_width", options.max_width),
        ("max_height", options.max_height),
    )?;
    if let Some(&bad) = options
        .src_set_breakpoints
        .iter()
        .find(|&&bp| !(bp > 0.0 && bp.is_finite()))
    {
        return Err(OptionsError::InvalidBreakpoint(bad));
    }

    let intrinsic = source.size_on(axis);
    let base = requested.min(intrinsic);
    let sizes = fluid_sizes(base, intrinsic, &options.src_set_breakpoints);
    let ratio = other_ratio(axis, source, (options.max_width, options.max_height));

    let variants: Vec<VariantSpec> = sizes
        .iter()
        .map(|&size| {
            let dims = oriented(axis, size, derive_other(size, ratio));
            variant(source, options, dims, format!("{}w", dims.0))
        })
        .collect::<Result<_, _>>()?;

    // sizes always ends with the intrinsic size, so neither lookup can miss
    let base_index = sizes.iter().position(|&s| s == base).unwrap_or(sizes.len() - 1);
    let presentation = &variants[base_index];
    let (presentation_width, presentation_height) = (presentation.width, presentation.height);

    let fallback = variants
        .iter()
        .min_by_key(|v| {
            let size = match axis {
                Axis::Width => v.width,
                Axis::Height => v.height,
            };
            (requested as i64 - size as i64).abs()
        })
        .unwrap_or(presentation);
    let original = variants
        .iter()
        .max_by_key(|v| v.width)
        .unwrap_or(presentation);

    let first = &variants[0];
    let aspect_ratio = first.width as f64 / first.height as f64;

    let sizes_attr = options.sizes.clone().unwrap_or_else(|| {
        format!("(max-width: {presentation_width}px) 100vw, {presentation_width}px")
    });

    Ok(FluidPlan {
        axis,
        aspect_ratio,
        src: fallback.src.clone(),
        src_set: src_set(&variants),
        src_set_type: options.to_format.mime_type().to_string(),
        sizes: sizes_attr,
        original_img: original.src.clone(),
        original_name: original_name(source),
        density: source.density,
        presentation_width,
        presentation_height,
        base64: None,
        traced_svg: None,
        placeholders: placeholders(
            options,
            aspect_ratio,
            (presentation_width, presentation_height),
        ),
        variants,
    })
}

// ============================================================================
// Fixed
// ============================================================================

/// Plan 1x / 1.5x / 2x density variants for a fixed layout box.
///
/// A request larger than the source degrades to a single variant at the
/// source's own size with a warning instead of failing.
pub fn plan_fixed(source: &SourceImage, options: &ImageOptions) -> Result<FixedPlan, OptionsError> {
    check_source(source)?;
    let (axis, requested) =
        pick_axis(("width", options.width), ("height", options.height))?;

    let intrinsic = source.size_on(axis);
    let (sizes, exceeded) = fixed_sizes(requested, intrinsic);
    let ratio = other_ratio(axis, source, (options.width, options.height));

    let mut warnings = Vec::new();
    if exceeded {
        let name = match axis {
            Axis::Width => "width",
            Axis::Height => "height",
        };
        warnings.push(format!(
            "The requested {name} \"{requested}px\" for the image {} was larger than the actual \
             image {name} of {intrinsic}px. If possible, replace the current image with a larger one.",
            source.absolute_path.display()
        ));
    }

    let variants: Vec<VariantSpec> = sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| {
            let dims = oriented(axis, size, derive_other(size, ratio));
            variant(source, options, dims, density_label(i).to_string())
        })
        .collect::<Result<_, _>>()?;

    let first = &variants[0];
    let aspect_ratio = first.width as f64 / first.height as f64;
    let (width, height) = (first.width, first.height);

    Ok(FixedPlan {
        axis,
        width,
        height,
        aspect_ratio,
        src: first.src.clone(),
        src_set: src_set(&variants),
        src_set_type: options.to_format.mime_type().to_string(),
        original_name: original_name(source),
        density: source.density,
        base64: None,
        traced_svg: None,
        warnings,
        placeholders: placeholders(options, aspect_ratio, (width, height)),
        variants,
    })
}

// ============================================================================
// Resize
// ============================================================================

/// Plan one rendition at the requested width and/or height.
///
/// A missing dimension is derived from the source's aspect ratio; unlike the
/// other modes the request is not capped at the source size.
pub fn plan_resize(source: &SourceImage, options: &ImageOptions) -> Result<ResizePlan, OptionsError> {
    check_source(source)?;
    let (axis, requested) =
        pick_axis(("width", options.width), ("height", options.height))?;
    let dims = match (options.width, options.height) {
        (Some(w), Some(h)) => (w, h),
        _ => oriented(
            axis,
            requested,
            derive_other(requested, other_ratio(axis, source, (None, None))),
        ),
    };

    let variant = variant(source, options, dims, format!("{}w", dims.0))?;
    let aspect_ratio = variant.aspect_ratio;
    let mut placeholders = placeholders(options, aspect_ratio, dims);
    placeholders.traced = None;

    Ok(ResizePlan {
        src: variant.src.clone(),
        width: variant.width,
        height: variant.height,
        aspect_ratio,
        original_name: original_name(source),
        base64: None,
        placeholders,
        variant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ImageFormat;
    use crate::test_helpers::{image_options, source_image};

    fn widths(variants: &[VariantSpec]) -> Vec<u32> {
        variants.iter().map(|v| v.width).collect()
    }

    fn heights(variants: &[VariantSpec]) -> Vec<u32> {
        variants.iter().map(|v| v.height).collect()
    }

    // =========================================================================
    // Fluid
    // =========================================================================

    #[test]
    fn fluid_landscape_default_breakpoints() {
        let source = source_image(1600, 900);
        let options = ImageOptions {
            max_width: Some(800),
            ..image_options()
        };
        let plan = plan_fluid(&source, &options).unwrap();

        assert_eq!(widths(&plan.variants), vec![200, 400, 800, 1200, 1600]);
        assert_eq!(heights(&plan.variants), vec![113, 225, 450, 675, 900]);
        assert_eq!(plan.axis, Axis::Width);
        assert_eq!((plan.presentation_width, plan.presentation_height), (800, 450));
        assert_eq!(plan.sizes, "(max-width: 800px) 100vw, 800px");
        assert_eq!(plan.src_set_type, "image/jpeg");
    }

    #[test]
    fn fluid_src_is_closest_and_original_is_widest() {
        let source = source_image(1600, 900);
        let options = ImageOptions {
            max_width: Some(800),
            ..image_options()
        };
        let plan = plan_fluid(&source, &options).unwrap();
        assert_eq!(plan.src, plan.variants[2].src);
        assert_eq!(plan.original_img, plan.variants[4].src);
    }

    #[test]
    fn fluid_base_at_or_above_intrinsic_never_upscales() {
        let source = source_image(600, 400);
        let options = ImageOptions {
            max_width: Some(2000),
            ..image_options()
        };
        let plan = plan_fluid(&source, &options).unwrap();
        let ws = widths(&plan.variants);
        assert_eq!(ws.iter().filter(|&&w| w >= 600).count(), 1);
        assert_eq!(*ws.last().unwrap(), 600);
        // Presentation collapses onto the original
        assert_eq!(plan.presentation_width, 600);
        // Closest to the 2000px request is the original itself
        assert_eq!(plan.src, plan.original_img);
    }

    #[test]
    fn fluid_sizes_ascending_unique_with_base_and_original() {
        for (w, h, max) in [(1600, 900, 800), (333, 500, 120), (4000, 3000, 999), (50, 50, 49)] {
            let plan = plan_fluid(
                &source_image(w, h),
                &ImageOptions {
                    max_width: Some(max),
                    ..image_options()
                },
            )
            .unwrap();
            let ws = widths(&plan.variants);
            assert!(ws.windows(2).all(|p| p[0] < p[1]), "{ws:?}");
            assert!(ws.contains(&max.min(w)));
            assert_eq!(*ws.last().unwrap(), w);
        }
    }

    #[test]
    fn fluid_aspect_ratio_is_first_variant_exactly() {
        let plan = plan_fluid(
            &source_image(1600, 900),
            &ImageOptions {
                max_width: Some(800),
                ..image_options()
            },
        )
        .unwrap();
        assert_eq!(plan.aspect_ratio, 200.0 / 113.0);
    }

    #[test]
    fn fluid_by_height() {
        let source = source_image(900, 1600);
        let options = ImageOptions {
            max_width: None,
            max_height: Some(800),
            ..image_options()
        };
        let plan = plan_fluid(&source, &options).unwrap();
        assert_eq!(plan.axis, Axis::Height);
        assert_eq!(heights(&plan.variants), vec![200, 400, 800, 1200, 1600]);
        assert_eq!(widths(&plan.variants), vec![113, 225, 450, 675, 900]);
        // srcset descriptors are always widths
        assert!(plan.src_set.contains(" 450w"));
    }

    #[test]
    fn fluid_both_max_dimensions_use_explicit_ratio() {
        let source = source_image(1600, 900);
        let options = ImageOptions {
            max_width: Some(800),
            max_height: Some(800),
            ..image_options()
        };
        let plan = plan_fluid(&source, &options).unwrap();
        assert!(plan.variants.iter().all(|v| v.width == v.height));
    }

    #[test]
    fn fluid_custom_breakpoints() {
        let options = ImageOptions {
            max_width: Some(800),
            src_set_breakpoints: vec![300.0, 600.0, 800.0, 3000.0],
            ..image_options()
        };
        let plan = plan_fluid(&source_image(2000, 1000), &options).unwrap();
        assert_eq!(widths(&plan.variants), vec![300, 600, 800, 2000]);
    }

    #[test]
    fn fluid_non_positive_breakpoint_fails() {
        for bad in [0.0, -10.0, f64::NAN] {
            let options = ImageOptions {
                src_set_breakpoints: vec![300.0, bad],
                ..image_options()
            };
            let err = plan_fluid(&source_image(1600, 900), &options).unwrap_err();
            assert!(matches!(err, OptionsError::InvalidBreakpoint(_)), "{bad}");
        }
    }

    #[test]
    fn fluid_missing_or_zero_dimension_fails() {
        let options = ImageOptions {
            max_width: None,
            max_height: None,
            ..image_options()
        };
        let err = plan_fluid(&source_image(10, 10), &options).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidDimension { .. }));

        let options = ImageOptions {
            max_width: Some(0),
            ..image_options()
        };
        let err = plan_fluid(&source_image(10, 10), &options).unwrap_err();
        assert_eq!(
            err,
            OptionsError::InvalidDimension {
                dimension: "max_width".into(),
                value: 0
            }
        );
    }

    #[test]
    fn fluid_explicit_sizes_attribute_wins() {
        let options = ImageOptions {
            sizes: Some("50vw".into()),
            ..image_options()
        };
        let plan = plan_fluid(&source_image(1600, 900), &options).unwrap();
        assert_eq!(plan.sizes, "50vw");
    }

    #[test]
    fn fluid_src_set_format() {
        let plan = plan_fluid(&source_image(1600, 900), &image_options()).unwrap();
        let lines: Vec<&str> = plan.src_set.split(",\n").collect();
        assert_eq!(lines.len(), plan.variants.len());
        for (line, v) in lines.iter().zip(&plan.variants) {
            assert_eq!(*line, format!("{} {}w", v.src, v.width));
        }
    }

    #[test]
    fn fluid_paths_namespace_by_args_digest() {
        let plan = plan_fluid(&source_image(1600, 900), &image_options()).unwrap();
        let v = &plan.variants[0];
        let digest = args_digest(&v.args).unwrap();
        assert_eq!(v.output_relative_path, format!("{digest}/photo.jpg"));
        assert_eq!(v.src, format!("/static/abc123/{digest}/photo.jpg"));

        let mut dirs: Vec<&str> = plan
            .variants
            .iter()
            .map(|v| v.output_relative_path.split('/').next().unwrap())
            .collect();
        dirs.dedup();
        assert_eq!(dirs.len(), plan.variants.len());
    }

    #[test]
    fn fluid_path_prefix_and_format() {
        let options = ImageOptions {
            path_prefix: "/blog".into(),
            to_format: ImageFormat::Webp,
            ..image_options()
        };
        let plan = plan_fluid(&source_image(1600, 900), &options).unwrap();
        assert!(plan.src.starts_with("/blog/static/abc123/"));
        assert!(plan.src.ends_with("/photo.webp"));
        assert_eq!(plan.src_set_type, "image/webp");
    }

    #[test]
    fn fluid_placeholder_requests() {
        let options = ImageOptions {
            base64_width: 20,
            traced_svg: Some(TraceOptions::default()),
            ..image_options()
        };
        let plan = plan_fluid(&source_image(1600, 900), &options).unwrap();
        let base64 = plan.placeholders.base64.as_ref().unwrap();
        // aspect 200/113 → round(20 / 1.7699) = 11
        assert_eq!((base64.width, base64.height), (20, 11));
        let traced = plan.placeholders.traced.as_ref().unwrap();
        assert_eq!((traced.args.width, traced.args.height), (800, 450));
    }

    #[test]
    fn fluid_without_base64_requests_nothing() {
        let options = ImageOptions {
            base64: false,
            ..image_options()
        };
        let plan = plan_fluid(&source_image(1600, 900), &options).unwrap();
        assert_eq!(plan.placeholders, PlaceholderRequest::default());
    }

    #[test]
    fn fluid_is_pure() {
        let source = source_image(1234, 567);
        let options = image_options();
        assert_eq!(
            plan_fluid(&source, &options).unwrap(),
            plan_fluid(&source, &options).unwrap()
        );
    }

    // =========================================================================
    // Fixed
    // =========================================================================

    #[test]
    fn fixed_all_densities() {
        let plan = plan_fixed(&source_image(1600, 900), &image_options()).unwrap();
        assert_eq!(widths(&plan.variants), vec![400, 600, 800]);
        assert_eq!(heights(&plan.variants), vec![225, 338, 450]);
        let labels: Vec<&str> = plan.variants.iter().map(|v| v.descriptor.as_str()).collect();
        assert_eq!(labels, vec!["1x", "1.5x", "2x"]);
        assert_eq!((plan.width, plan.height), (400, 225));
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn fixed_labels_follow_position_when_filtered() {
        let plan = plan_fixed(&source_image(700, 700), &image_options()).unwrap();
        let labels: Vec<&str> = plan.variants.iter().map(|v| v.descriptor.as_str()).collect();
        assert_eq!(labels, vec!["1x", "1.5x"]);
    }

    #[test]
    fn fixed_larger_than_source_degrades_with_warning() {
        let plan = plan_fixed(&source_image(300, 200), &image_options()).unwrap();
        assert_eq!(widths(&plan.variants), vec![300]);
        assert_eq!(plan.variants[0].descriptor, "1x");
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("\"400px\""));
        assert!(plan.warnings[0].contains("300px"));
    }

    #[test]
    fn fixed_src_set_pairs_src_and_label() {
        let plan = plan_fixed(&source_image(1600, 900), &image_options()).unwrap();
        let expected: Vec<String> = plan
            .variants
            .iter()
            .map(|v| format!("{} {}", v.src, v.descriptor))
            .collect();
        assert_eq!(plan.src_set, expected.join(",\n"));
        assert_eq!(plan.src, plan.variants[0].src);
    }

    #[test]
    fn fixed_by_height() {
        let options = ImageOptions {
            width: None,
            height: Some(100),
            ..image_options()
        };
        let plan = plan_fixed(&source_image(1600, 900), &options).unwrap();
        assert_eq!(plan.axis, Axis::Height);
        assert_eq!(heights(&plan.variants), vec![100, 150, 200]);
        assert_eq!(widths(&plan.variants), vec![178, 267, 356]);
    }

    #[test]
    fn fixed_both_dimensions_follow_explicit_ratio() {
        let options = ImageOptions {
            width: Some(200),
            height: Some(200),
            ..image_options()
        };
        let plan = plan_fixed(&source_image(1600, 900), &options).unwrap();
        assert_eq!(heights(&plan.variants), vec![200, 300, 400]);
    }

    #[test]
    fn fixed_aspect_ratio_is_first_variant_exactly() {
        let plan = plan_fixed(&source_image(1000, 333), &image_options()).unwrap();
        let first = &plan.variants[0];
        assert_eq!(plan.aspect_ratio, first.width as f64 / first.height as f64);
    }

    #[test]
    fn fixed_zero_width_fails() {
        let options = ImageOptions {
            width: Some(0),
            ..image_options()
        };
        let err = plan_fixed(&source_image(100, 100), &options).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidDimension { .. }));
    }

    // =========================================================================
    // Resize
    // =========================================================================

    #[test]
    fn resize_width_only_derives_height() {
        let options = ImageOptions {
            width: Some(320),
            ..image_options()
        };
        let plan = plan_resize(&source_image(1600, 900), &options).unwrap();
        assert_eq!((plan.width, plan.height), (320, 180));
        assert_eq!(plan.src, plan.variant.src);
        assert!(plan.placeholders.traced.is_none());
    }

    #[test]
    fn resize_both_dimensions_exact() {
        let options = ImageOptions {
            width: Some(100),
            height: Some(300),
            ..image_options()
        };
        let plan = plan_resize(&source_image(1600, 900), &options).unwrap();
        assert_eq!((plan.width, plan.height), (100, 300));
    }

    #[test]
    fn resize_is_not_capped() {
        let options = ImageOptions {
            width: Some(3200),
            ..image_options()
        };
        let plan = plan_resize(&source_image(1600, 900), &options).unwrap();
        assert_eq!((plan.width, plan.height), (3200, 1800));
    }

    #[test]
    fn zero_sized_source_fails() {
        let err = plan_fluid(&source_image(0, 10), &image_options()).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidDimension { .. }));
    }

    #[test]
    fn original_name_keeps_extension() {
        let plan = plan_fixed(&source_image(800, 600), &image_options()).unwrap();
        assert_eq!(plan.original_name, "photo.jpg");
    }
}
