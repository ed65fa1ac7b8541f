//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! They never fail: degenerate input (zero or negative axes, non-finite
//! ratios) is clamped so every returned axis is at least 1.

use super::backend::Dimensions;
use super::params::{OutputFormat, Quality, ResizePolicy, Rotation};

/// Round half away from zero and floor at 1.
///
/// `f64::round` already rounds half away from zero; this adds the clamp
/// into `1..=u32::MAX` and maps NaN to 1.
fn round_axis(value: f64) -> u32 {
    if value.is_nan() {
        return 1;
    }
    value.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// Coerce a signed policy/override axis into a valid pixel count.
fn clamp_axis(value: i64) -> u32 {
    value.clamp(1, i64::from(u32::MAX)) as u32
}

/// Compute the logical output box for one image.
///
/// # Arguments
/// * `original` - Source dimensions, measured at ingestion
/// * `policy` - The current resize policy
/// * `_rotation` - The item's rotation. It never changes which axis counts as
///   width here; it only flips the physical canvas at encode time (see
///   [`canvas_dimensions`])
/// * `size_override` - Optional per-item box replacing the policy's
///
/// # Rules
/// * Aspect lock on: width is the override width (or `policy.target_width`),
///   height is `round(width * original.height / original.width)`.
/// * Aspect lock off with an override: the override, clamped.
/// * Aspect lock off without one: the policy box, clamped.
///
/// # Examples
/// ```
/// # use batch_resize::imaging::{compute_target_size, Dimensions, ResizePolicy, Rotation};
/// let policy = ResizePolicy { target_width: 800, ..ResizePolicy::default() };
/// let size = compute_target_size(Dimensions::new(1600, 1200), &policy, Rotation::Deg0, None);
/// assert_eq!(size, Dimensions::new(800, 600));
/// ```
pub fn compute_target_size(
    original: Dimensions,
    policy: &ResizePolicy,
    _rotation: Rotation,
    size_override: Option<Dimensions>,
) -> Dimensions {
    if policy.maintain_aspect_ratio {
        let width = match size_override {
            Some(o) => o.width.max(1),
            None => clamp_axis(policy.target_width),
        };
        let orig_w = f64::from(original.width.max(1));
        let orig_h = f64::from(original.height.max(1));
        let height = round_axis(f64::from(width) * orig_h / orig_w);
        return Dimensions { width, height };
    }

    match size_override {
        Some(o) => Dimensions::new(o.width, o.height),
        None => Dimensions {
            width: clamp_axis(policy.target_width),
            height: clamp_axis(policy.target_height),
        },
    }
}

/// Physical canvas the codec draws into for a logical box and rotation.
///
/// Quarter turns swap the axes; 0° and 180° keep the box as-is.
pub fn canvas_dimensions(target: Dimensions, rotation: Rotation) -> Dimensions {
    if rotation.swaps_axes() {
        target.transposed()
    } else {
        target
    }
}

/// Derive the other axis from a ratio (width / height).
///
/// Returns `(width, height)`. Uses `width` if it is positive, else `height`
/// if that is positive, else falls back to `baseline_width`.
pub fn apply_aspect_ratio(width: i64, height: i64, ratio: f64, baseline_width: i64) -> (i64, i64) {
    if width > 0 {
        (width, (width as f64 / ratio).round() as i64)
    } else if height > 0 {
        ((height as f64 * ratio).round() as i64, height)
    } else {
        (baseline_width, (baseline_width as f64 / ratio).round() as i64)
    }
}

/// Rough encoded-size estimate in bytes, for display before encoding.
///
/// Bits-per-pixel heuristics: PNG 1.2, WebP `0.03 + q * 0.22`,
/// JPEG `0.05 + q * 0.35`. Not a contract; real sizes vary with content.
pub fn estimate_encoded_size(size: Dimensions, format: OutputFormat, quality: Quality) -> u64 {
    let q = f64::from(quality.value());
    let bytes_per_pixel = match format {
        OutputFormat::Png => 1.2,
        OutputFormat::Webp => 0.03 + q * 0.22,
        OutputFormat::Jpeg => 0.05 + q * 0.35,
    };
    (size.pixels() as f64 * bytes_per_pixel).round() as u64
}
