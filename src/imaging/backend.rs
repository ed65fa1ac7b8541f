//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every codec must
//! support: identify (read dimensions from encoded bytes) and render
//! (decode, resize, rotate, re-encode).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust on the
//! `image` crate. Everything is statically linked into the binary.

use super::params::RenderParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Width and height in pixels. Both axes are always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Build dimensions, flooring each axis at 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// The same box with width and height exchanged.
    pub fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    pub fn pixels(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// Trait for image codec backends.
///
/// Implementations must be deterministic for identical inputs and must be
/// `Sync`: ingestion identifies files from a rayon pool.
pub trait ImageBackend: Sync {
    /// Read image dimensions from encoded bytes without a full decode.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode `params.source`, resize it to `params.target`, apply the
    /// rotation, and encode it in the requested format.
    fn render(&self, params: &RenderParams<'_>) -> Result<Vec<u8>, BackendError>;
}
