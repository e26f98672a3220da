//! CLI output formatting for plans and resource operations.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every plan leads
//! with the source's name and mode, then lists its variants by position with
//! their size and `srcset` descriptor; public URLs are shown as secondary
//! context. Placeholders are shown truncated since a data URI can run to
//! kilobytes.
//!
//! # Output Format
//!
//! ## Fluid
//!
//! ```text
//! photo.jpg (fluid, 5 variants, image/jpeg)
//!     001 200x113 200w
//!         /static/9f2c.../0a1b2/photo.jpg
//!     ...
//!     Presentation: 800x450
//!     Sizes: (max-width: 800px) 100vw, 800px
//!     Base64: data:image/jpeg;base64,/9j/4AAQSkZJRgABAQAAAQABAAD... (412 chars)
//! ```
//!
//! ## Fixed
//!
//! ```text
//! photo.jpg (fixed, 3 variants, image/jpeg)
//!     001 400x225 1x
//!         /static/9f2c.../3fa1c/photo.jpg
//!     ...
//!     Warning: The requested width "400px" ...
//! ```
//!
//! ## Directory
//!
//! ```text
//! Create directory photos/2024
//!     + id = "photos/2024"
//!     + path = "photos/2024"
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::plan::{FixedPlan, FluidPlan, ResizePlan, VariantSpec};
use crate::resources::directory::{DirectoryError, DirectoryPlan, DirectoryResource};

/// Placeholder URIs longer than this are cut in the listing.
const PLACEHOLDER_PREVIEW: usize = 48;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Header line: source name, mode and variant count.
///
/// ```text
/// photo.jpg (fluid, 5 variants, image/jpeg)
/// ```
fn plan_header(name: &str, mode: &str, count: usize, mime: &str) -> String {
    let noun = if count == 1 { "variant" } else { "variants" };
    format!("{} ({}, {} {}, {})", name, mode, count, noun, mime)
}

/// Variant lines: position, size and descriptor, then the public URL.
fn variant_lines(variants: &[VariantSpec]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, v) in variants.iter().enumerate() {
        lines.push(format!(
            "{}{} {}x{} {}",
            indent(1),
            format_index(i + 1),
            v.width,
            v.height,
            v.descriptor
        ));
        lines.push(format!("{}{}", indent(2), v.src));
    }
    lines
}

/// Shorten a data URI for display, keeping its length as context.
fn truncate_uri(uri: &str) -> String {
    if uri.chars().count() <= PLACEHOLDER_PREVIEW {
        uri.to_string()
    } else {
        let head: String = uri.chars().take(PLACEHOLDER_PREVIEW).collect();
        format!("{}... ({} chars)", head, uri.len())
    }
}

fn placeholder_lines(base64: Option<&str>, traced: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(uri) = base64 {
        lines.push(format!("{}Base64: {}", indent(1), truncate_uri(uri)));
    }
    if let Some(uri) = traced {
        lines.push(format!("{}Traced SVG: {}", indent(1), truncate_uri(uri)));
    }
    lines
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Image plans
// ============================================================================

/// Format a fluid plan.
pub fn format_fluid_output(plan: &FluidPlan) -> Vec<String> {
    let mut lines = vec![plan_header(
        &plan.original_name,
        "fluid",
        plan.variants.len(),
        &plan.src_set_type,
    )];
    lines.extend(variant_lines(&plan.variants));
    lines.push(format!(
        "{}Presentation: {}x{}",
        indent(1),
        plan.presentation_width,
        plan.presentation_height
    ));
    lines.push(format!("{}Sizes: {}", indent(1), plan.sizes));
    lines.extend(placeholder_lines(
        plan.base64.as_deref(),
        plan.traced_svg.as_deref(),
    ));
    lines
}

pub fn print_fluid_output(plan: &FluidPlan) {
    print_lines(format_fluid_output(plan));
}

/// Format a fixed plan, warnings last.
pub fn format_fixed_output(plan: &FixedPlan) -> Vec<String> {
    let mut lines = vec![plan_header(
        &plan.original_name,
        "fixed",
        plan.variants.len(),
        &plan.src_set_type,
    )];
    lines.extend(variant_lines(&plan.variants));
    lines.extend(placeholder_lines(
        plan.base64.as_deref(),
        plan.traced_svg.as_deref(),
    ));
    for warning in &plan.warnings {
        lines.push(format!("{}Warning: {}", indent(1), warning));
    }
    lines
}

pub fn print_fixed_output(plan: &FixedPlan) {
    print_lines(format_fixed_output(plan));
}

/// Format a single resize.
///
/// ```text
/// photo.jpg → 320x180
///     /static/9f2c.../77e0d/photo.jpg
/// ```
pub fn format_resize_output(plan: &ResizePlan) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} \u{2192} {}x{}",
            plan.original_name, plan.width, plan.height
        ),
        format!("{}{}", indent(1), plan.src),
    ];
    lines.extend(placeholder_lines(plan.base64.as_deref(), None));
    lines
}

pub fn print_resize_output(plan: &ResizePlan) {
    print_lines(format_resize_output(plan));
}

// ============================================================================
// Directory resources
// ============================================================================

/// Format the observed state of a directory.
///
/// ```text
/// photos (id: photos)
///     /site/content/photos
/// ```
pub fn format_directory_state(path: &str, state: Option<&DirectoryResource>) -> Vec<String> {
    match state {
        Some(resource) => vec![
            format!("{} (id: {})", resource.path, resource.id),
            format!("{}{}", indent(1), resource.absolute_path.display()),
        ],
        None => vec![format!("{} (absent)", path)],
    }
}

pub fn print_directory_state(path: &str, state: Option<&DirectoryResource>) {
    print_lines(format_directory_state(path, state));
}

/// Format a directory plan: summary, then the diff.
pub fn format_directory_plan(plan: &DirectoryPlan) -> Vec<String> {
    let mut lines = vec![plan.describe.clone()];
    lines.extend(plan.diff.iter().map(|d| format!("{}{}", indent(1), d)));
    lines
}

pub fn print_directory_plan(plan: &DirectoryPlan) {
    print_lines(format_directory_plan(plan));
}

/// Format a validation outcome, one violation per line.
pub fn format_validation(result: &Result<(), DirectoryError>) -> Vec<String> {
    match result {
        Ok(()) => vec!["Descriptor is valid".to_string()],
        Err(DirectoryError::Invalid(violations)) => {
            let mut lines = vec![format!(
                "Descriptor is invalid ({} {})",
                violations.len(),
                if violations.len() == 1 { "problem" } else { "problems" }
            )];
            lines.extend(violations.iter().map(|v| format!("{}{}", indent(1), v)));
            lines
        }
        Err(e) => vec![format!("Descriptor is invalid: {}", e)],
    }
}

pub fn print_validation(result: &Result<(), DirectoryError>) {
    print_lines(format_validation(result));
}
