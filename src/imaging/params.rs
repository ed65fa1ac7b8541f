//! Parameter types for image operations.
//!
//! These types describe *what* to render, not *how*. They are the interface
//! between the batch processor (which decides what each item needs) and the
//! [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing batch logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality as a fraction in `[0, 1]`. Clamped on construction.
//! - [`OutputFormat`]: JPEG, PNG or WebP.
//! - [`Rotation`]: Quarter-turn canvas rotation (0°, 90°, 180°, 270°).
//! - [`ResizePolicy`]: The process-wide target box + encoding settings applied to every item.
//! - [`RenderParams`]: Everything one encode needs: source bytes, target box, rotation, format, quality.

use super::backend::Dimensions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding, as a fraction (0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality as a JPEG encoder percentage (1–100).
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.85)
    }
}

impl From<f32> for Quality {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Webp];

    /// File extension used for archive entries.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// Whether the encoder honours [`Quality`]. PNG is written lossless.
    pub fn is_lossy(self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Webp)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Webp => "WEBP",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(format!("unknown output format '{other}' (expected jpeg, png or webp)")),
        }
    }
}

/// Quarter-turn rotation applied to the canvas at encode time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Rotate a further 90° clockwise, wrapping at 360.
    pub fn clockwise(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// Rotate a further 90° counter-clockwise, wrapping at 0.
    pub fn counter_clockwise(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg270,
            Rotation::Deg90 => Rotation::Deg0,
            Rotation::Deg180 => Rotation::Deg90,
            Rotation::Deg270 => Rotation::Deg180,
        }
    }

    /// 90° and 270° swap the physical canvas axes.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl TryFrom<u32> for Rotation {
    type Error = String;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        match degrees % 360 {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(format!("rotation must be a multiple of 90, got {other}")),
        }
    }
}

impl From<Rotation> for u32 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}

/// Process-wide resize policy.
///
/// Width and height are signed on purpose: free-form input may be zero or
/// negative, and the geometry functions clamp rather than reject it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizePolicy {
    pub target_width: i64,
    pub target_height: i64,
    pub maintain_aspect_ratio: bool,
    pub quality: Quality,
    pub output_format: OutputFormat,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self {
            target_width: 1080,
            target_height: 1080,
            maintain_aspect_ratio: true,
            quality: Quality::default(),
            output_format: OutputFormat::default(),
        }
    }
}

/// Parameters for a single render: decode, resize, rotate, encode.
///
/// `target` is the logical (pre-rotation) box. For 90°/270° the encoded
/// image has its axes swapped relative to it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams<'a> {
    pub source: &'a [u8],
    pub target: Dimensions,
    pub rotation: Rotation,
    pub format: OutputFormat,
    pub quality: Quality,
}
