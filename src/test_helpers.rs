//! Shared test utilities for the batch-resize test suite.
//!
//! Provides fixture builders for sources and registries, and tiny synthetic
//! images for tests that need a real codec.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (mut registry, ids) = registry_with(&[("dawn.jpg", 1600, 1200)]);
//! let backend = MockBackend::failing_on(&[b"dawn.jpg"]);
//! ```
//!
//! Sources built by [`source`] use the display name as their bytes, so a
//! [`MockBackend`](crate::imaging::backend::tests::MockBackend) can be told
//! to fail for a given file by name.

use image::{DynamicImage, ImageEncoder, RgbImage, RgbaImage};
use std::sync::Arc;

use crate::imaging::{Dimensions, ResizePolicy};
use crate::registry::{ItemId, Registry, SourceFile};

// =========================================================================
// Sources and registries
// =========================================================================

/// A source whose bytes are its own name.
pub fn source(name: &str, width: u32, height: u32) -> SourceFile {
    SourceFile {
        display_name: name.to_string(),
        bytes: Arc::from(name.as_bytes()),
        original_size: Dimensions::new(width, height),
    }
}

/// A registry under the default policy, holding one item per `(name, w, h)`.
pub fn registry_with(items: &[(&str, u32, u32)]) -> (Registry, Vec<ItemId>) {
    let mut registry = Registry::new(ResizePolicy::default());
    let ids = items
        .iter()
        .map(|&(name, w, h)| registry.ingest(source(name, w, h)))
        .collect();
    (registry, ids)
}

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Encode a gradient as JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// Encode a gradient with an alpha channel as PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 200])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_with_encoder(image::codecs::png::PngEncoder::new(&mut bytes))
        .unwrap();
    bytes
}
