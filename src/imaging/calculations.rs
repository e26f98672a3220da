//! Pure calculation functions for variant sizing.
//!
//! All functions here are pure and testable without any I/O or images.
//! Sizes are computed on a single "fixed" axis (width or height); the
//! orthogonal dimension is derived from an aspect ratio afterwards.

use super::params::CropFocus;

/// Pixel-density labels for fixed variants, by ascending position.
pub const DENSITY_LABELS: [&str; 3] = ["1x", "1.5x", "2x"];

/// Multipliers of the base size for fixed variants (1x, 1.5x, 2x).
const FIXED_MULTIPLIERS: [f64; 3] = [1.0, 1.5, 2.0];

/// Multipliers of the base size for fluid variants without breakpoints.
///
/// With a base of 800px this yields 800, 200, 400, 1200, 1600.
const FLUID_MULTIPLIERS: [f64; 5] = [1.0, 0.25, 0.5, 1.5, 2.0];

/// Round a candidate size to whole pixels, never below 1.
fn to_pixels(size: f64) -> u32 {
    (size.round() as u32).max(1)
}

/// Derive the orthogonal dimension for `size` given a ratio of
/// `other / fixed`.
///
/// # Examples
/// ```
/// # use simple_srcset::imaging::calculations::derive_other;
/// // 1600x900 source, 800px wide → 450px tall
/// assert_eq!(derive_other(800, 900.0 / 1600.0), 450);
/// ```
pub fn derive_other(size: u32, ratio: f64) -> u32 {
    to_pixels(size as f64 * ratio)
}

/// Candidate sizes for a fluid image on its fixed axis.
///
/// `base` is the requested size already capped at `intrinsic`. Without
/// breakpoints the candidates are the base and its quarter, half, 1.5× and
/// 2× multiples; with breakpoints they are the breakpoints plus the base.
/// Candidates at or above the intrinsic size are dropped and the intrinsic
/// size itself is appended, so the original resolution is always offered
/// as the largest variant. The result is ascending and free of duplicates.
pub fn fluid_sizes(base: u32, intrinsic: u32, breakpoints: &[f64]) -> Vec<u32> {
    let candidates: Vec<f64> = if breakpoints.is_empty() {
        FLUID_MULTIPLIERS
            .iter()
            .map(|m| base as f64 * m)
            .collect()
    } else {
        breakpoints
            .iter()
            .copied()
            .chain(std::iter::once(base as f64))
            .collect()
    };

    let mut sizes: Vec<u32> = candidates
        .into_iter()
        .filter(|&size| size < intrinsic as f64)
        .map(to_pixels)
        .collect();
    sizes.push(intrinsic);
    sizes.sort_unstable();
    sizes.dedup();
    sizes
}

/// Candidate sizes for a fixed image: 1x, 1.5x and 2x of `base`, keeping
/// only those that fit within `intrinsic`.
///
/// Returns the sizes and whether the request exceeded the source. When every
/// candidate is too large the intrinsic size is the sole entry.
pub fn fixed_sizes(base: u32, intrinsic: u32) -> (Vec<u32>, bool) {
    let sizes: Vec<u32> = FIXED_MULTIPLIERS
        .iter()
        .map(|m| base as f64 * m)
        .filter(|&size| size <= intrinsic as f64)
        .map(to_pixels)
        .collect();

    if sizes.is_empty() {
        (vec![intrinsic], true)
    } else {
        (sizes, false)
    }
}

/// Density label for the fixed variant at `index`.
pub fn density_label(index: usize) -> &'static str {
    DENSITY_LABELS
        .get(index)
        .copied()
        .unwrap_or(DENSITY_LABELS[DENSITY_LABELS.len() - 1])
}

/// Height of a base64 placeholder of `width` pixels at `aspect_ratio`.
pub fn placeholder_height(width: u32, aspect_ratio: f64) -> u32 {
    ((width as f64 / aspect_ratio).round() as u32).max(1)
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = ((h as f64 * src_aspect).round() as u32).max(tgt_w);
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = ((w as f64 / src_aspect).round() as u32).max(tgt_h);
        (w, h)
    }
}

/// Calculate dimensions that fit entirely inside a target area.
///
/// The counterpart of [`calculate_fill_dimensions`]: one dimension matches
/// the target exactly, the other is smaller or equal.
pub fn calculate_contain_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        let w = tgt_w;
        let h = ((w as f64 / src_aspect).round() as u32).clamp(1, tgt_h);
        (w, h)
    } else {
        let h = tgt_h;
        let w = ((h as f64 * src_aspect).round() as u32).clamp(1, tgt_w);
        (w, h)
    }
}

/// Top-left offset of a `target` crop inside a `fill` area for a focus.
///
/// Content-aware strategies fall back to the center.
pub fn crop_offset(fill: (u32, u32), target: (u32, u32), focus: CropFocus) -> (u32, u32) {
    let spare_x = fill.0.saturating_sub(target.0);
    let spare_y = fill.1.saturating_sub(target.1);

    let x = match focus {
        CropFocus::West | CropFocus::NorthWest | CropFocus::SouthWest => 0,
        CropFocus::East | CropFocus::NorthEast | CropFocus::SouthEast => spare_x,
        _ => spare_x / 2,
    };
    let y = match focus {
        CropFocus::North | CropFocus::NorthWest | CropFocus::NorthEast => 0,
        CropFocus::South | CropFocus::SouthWest | CropFocus::SouthEast => spare_y,
        _ => spare_y / 2,
    };
    (x, y)
}

/// Normalize a rotation to the nearest multiple of 90 degrees in `0..360`.
pub fn quarter_turns(degrees: i32) -> u32 {
    let quarters = (degrees as f64 / 90.0).round() as i64;
    quarters.rem_euclid(4) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // fluid_sizes tests
    // =========================================================================

    #[test]
    fn fluid_default_breakpoints_landscape() {
        // 1600 wide, max 800 → 200, 400, 800, 1200 and the original 1600
        assert_eq!(
            fluid_sizes(800, 1600, &[]),
            vec![200, 400, 800, 1200, 1600]
        );
    }

    #[test]
    fn fluid_base_at_intrinsic_collapses_to_original() {
        // 1.5x and 2x would upscale; only the original remains at the top
        assert_eq!(fluid_sizes(1600, 1600, &[]), vec![400, 800, 1600]);
    }

    #[test]
    fn fluid_never_offers_more_than_intrinsic() {
        for intrinsic in [1u32, 50, 640, 1600] {
            let sizes = fluid_sizes(intrinsic, intrinsic, &[]);
            let at_or_above: Vec<_> = sizes.iter().filter(|&&s| s >= intrinsic).collect();
            assert_eq!(at_or_above, vec![&intrinsic]);
        }
    }

    #[test]
    fn fluid_tiny_source_only_offers_original() {
        // base capped to 1, multiples all round to 1 or exceed
        assert_eq!(fluid_sizes(1, 1, &[]), vec![1]);
    }

    #[test]
    fn fluid_custom_breakpoints_include_base() {
        assert_eq!(
            fluid_sizes(800, 2000, &[300.0, 600.0, 800.0, 3000.0]),
            vec![300, 600, 800, 2000]
        );
    }

    #[test]
    fn fluid_sizes_are_strictly_ascending_and_unique() {
        for base in [1u32, 7, 99, 400, 799, 800, 1234] {
            for intrinsic in [base, base + 1, base * 3] {
                let sizes = fluid_sizes(base, intrinsic, &[]);
                assert!(sizes.windows(2).all(|w| w[0] < w[1]), "{sizes:?}");
                assert!(sizes.contains(&base), "{base} missing from {sizes:?}");
                assert_eq!(*sizes.last().unwrap(), intrinsic);
            }
        }
    }

    #[test]
    fn fluid_rounding_never_duplicates_original() {
        // 1599.5 rounds up to the intrinsic 1600 and must not appear twice
        assert_eq!(fluid_sizes(800, 1600, &[1599.5]), vec![800, 1600]);
    }

    // =========================================================================
    // fixed_sizes tests
    // =========================================================================

    #[test]
    fn fixed_all_densities_fit() {
        assert_eq!(fixed_sizes(400, 1000), (vec![400, 600, 800], false));
    }

    #[test]
    fn fixed_drops_oversized_densities() {
        assert_eq!(fixed_sizes(400, 700), (vec![400, 600], false));
    }

    #[test]
    fn fixed_exceeding_source_falls_back_to_original() {
        assert_eq!(fixed_sizes(400, 300), (vec![300], true));
    }

    #[test]
    fn fixed_exact_fit_keeps_boundary() {
        assert_eq!(fixed_sizes(400, 800), (vec![400, 600, 800], false));
    }

    #[test]
    fn density_labels_by_position() {
        assert_eq!(density_label(0), "1x");
        assert_eq!(density_label(1), "1.5x");
        assert_eq!(density_label(2), "2x");
    }

    // =========================================================================
    // derived dimensions
    // =========================================================================

    #[test]
    fn derive_other_rounds_to_nearest() {
        assert_eq!(derive_other(200, 900.0 / 1600.0), 113);
        assert_eq!(derive_other(400, 900.0 / 1600.0), 225);
    }

    #[test]
    fn derive_other_never_zero() {
        assert_eq!(derive_other(10, 1.0 / 10_000.0), 1);
    }

    #[test]
    fn placeholder_height_from_aspect() {
        assert_eq!(placeholder_height(20, 16.0 / 9.0), 11);
        assert_eq!(placeholder_height(20, 100.0), 1);
    }

    // =========================================================================
    // fit helpers
    // =========================================================================

    #[test]
    fn fill_wider_source_to_portrait_target() {
        // 800x600 (4:3) → 400x500 target
        // Source is wider, so height matches: 500, width = 500 * (4/3) = 667
        assert_eq!(calculate_fill_dimensions((800, 600), (400, 500)), (667, 500));
    }

    #[test]
    fn fill_taller_source_to_landscape_target() {
        assert_eq!(calculate_fill_dimensions((600, 800), (500, 400)), (500, 667));
    }

    #[test]
    fn contain_wide_source_in_square() {
        assert_eq!(
            calculate_contain_dimensions((1600, 900), (400, 400)),
            (400, 225)
        );
    }

    #[test]
    fn contain_tall_source_in_square() {
        assert_eq!(
            calculate_contain_dimensions((900, 1600), (400, 400)),
            (225, 400)
        );
    }

    #[test]
    fn crop_offset_by_focus() {
        let fill = (667, 500);
        let target = (400, 500);
        assert_eq!(crop_offset(fill, target, CropFocus::Center), (133, 0));
        assert_eq!(crop_offset(fill, target, CropFocus::West), (0, 0));
        assert_eq!(crop_offset(fill, target, CropFocus::East), (267, 0));
        assert_eq!(crop_offset(fill, target, CropFocus::Attention), (133, 0));
    }

    #[test]
    fn quarter_turns_normalizes() {
        assert_eq!(quarter_turns(0), 0);
        assert_eq!(quarter_turns(90), 1);
        assert_eq!(quarter_turns(-90), 3);
        assert_eq!(quarter_turns(450), 1);
        assert_eq!(quarter_turns(100), 1);
    }
}
