//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | Lanczos3 `resize_exact` |
//! | **Rotate** | quarter-turn `rotate90` / `rotate180` / `rotate270` |
//! | **Encode** | JPEG and WebP (lossy), PNG (lossless) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Value types describing a render and the resize policy
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    apply_aspect_ratio, canvas_dimensions, compute_target_size, estimate_encoded_size,
};
pub use params::{OutputFormat, Quality, RenderParams, ResizePolicy, Rotation};
pub use rust_backend::{RustBackend, supported_input_extensions};
