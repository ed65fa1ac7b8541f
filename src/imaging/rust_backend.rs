//! Codec backend on the `image` crate, plus libwebp for lossy WebP.
//!
//! No system libraries: everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF, WebP) | `image::load_from_memory` |
//! | Rotate | `DynamicImage::rotate90` / `rotate180` / `rotate270` |
//! | Resize | `DynamicImage::resize_exact` into `canvas_dimensions`, `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality honoured) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless) |
//! | Encode → WebP | `webp::Encoder::encode_simple` (lossy, quality honoured) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::canvas_dimensions;
use super::params::{OutputFormat, RenderParams, Rotation};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::borrow::Cow;
use std::io::Cursor;

/// File extensions accepted at ingestion, one per enabled decoder.
const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Returns the set of image file extensions accepted as sources.
pub fn supported_input_extensions() -> &'static [&'static str] {
    INPUT_EXTENSIONS
}

/// Backend using the `image` crate ecosystem.
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

/// Decode an image from memory.
fn load_image(source: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(source).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Turn the source, then draw it into the physical canvas.
///
/// The canvas is the logical box with swapped axes for quarter turns, so
/// the reported target size stays unrotated.
fn draw_canvas(img: &DynamicImage, params: &RenderParams<'_>) -> DynamicImage {
    let canvas = canvas_dimensions(params.target, params.rotation);
    let turned = match params.rotation {
        Rotation::Deg0 => Cow::Borrowed(img),
        Rotation::Deg90 => Cow::Owned(img.rotate90()),
        Rotation::Deg180 => Cow::Owned(img.rotate180()),
        Rotation::Deg270 => Cow::Owned(img.rotate270()),
    };
    turned.resize_exact(canvas.width, canvas.height, FilterType::Lanczos3)
}

/// Encode a DynamicImage to bytes in the requested format.
fn encode_image(img: &DynamicImage, params: &RenderParams<'_>) -> Result<Vec<u8>, BackendError> {
    let mut buffer = Vec::new();
    let result = match params.format {
        // JPEG has no alpha channel.
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(
            JpegEncoder::new_with_quality(&mut buffer, params.quality.percent()),
        ),
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new(&mut buffer)),
        OutputFormat::Webp => return encode_webp(img, params),
    };
    result.map_err(|e| BackendError::Encode(format!("{} encode failed: {}", params.format, e)))?;
    Ok(buffer)
}

/// Lossy WebP through libwebp; the `image` crate only writes lossless WebP.
fn encode_webp(img: &DynamicImage, params: &RenderParams<'_>) -> Result<Vec<u8>, BackendError> {
    let rgba = img.to_rgba8();
    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
        .encode_simple(false, f32::from(params.quality.percent()))
        .map_err(|e| BackendError::Encode(format!("{} encode failed: {:?}", params.format, e)))?;
    Ok(encoded.to_vec())
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(source))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {}", e)))?;
        if width == 0 || height == 0 {
            return Err(BackendError::Decode(format!(
                "Image has an empty axis: {width}x{height}"
            )));
        }
        Ok(Dimensions { width, height })
    }

    fn render(&self, params: &RenderParams<'_>) -> Result<Vec<u8>, BackendError> {
        let img = load_image(params.source)?;
        let canvas = draw_canvas(&img, params);
        encode_image(&canvas, params)
    }
}
