//! Resize configuration module.
//!
//! Handles loading and validating `resize.toml`, and combining it with
//! command-line overrides into the [`SizingControls`] a session starts from.
//!
//! ## Config File Location
//!
//! `resize.toml` is read from the working directory, or from the path given
//! with `--config`. Without a file, stock defaults apply.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! preset = "Instagram"      # Any catalog preset; sets width/height
//!
//! [policy]
//! # width = 1080            # Set either axis to edit the preset's box
//! # height = 1080
//! # keep_aspect_ratio = true
//! quality = 0.85            # Fraction in [0, 1]; JPEG and WebP
//! format = "jpeg"           # jpeg | png | webp
//!
//! [archive]
//! name = "resized-images"   # Top-level folder and zip file name
//!
//! [processing]
//! max_processes = 4         # Max parallel readers (omit for auto = CPU cores)
//! ```
//!
//! ## Precedence
//!
//! Stock defaults, then the file, then command-line flags. Within one layer
//! a preset is applied before explicit width/height, so `--preset HD
//! --width 1000` means "HD box, but 1000 wide". The same holds for
//! `preset = "HD"` next to `[policy] width = 1000` in the file. Size and lock
//! keys left out of `[policy]` keep whatever the preset chose.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{OutputFormat, Quality, ResizePolicy};
use crate::presets::{PresetError, SizingControls, find_preset};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "resize.toml";

pub const DEFAULT_ARCHIVE_NAME: &str = "resized-images";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Preset(#[from] PresetError),
}

/// Configuration loaded from `resize.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// Catalog preset applied before `[policy]` width/height edits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    pub policy: PolicyConfig,
    pub archive: ArchiveConfig,
    pub processing: ProcessingConfig,
}

/// The `[policy]` table.
///
/// Box and lock are optional edits on top of the preset; quality and format
/// always apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_aspect_ratio: Option<bool>,
    /// Kept raw so out-of-range values can be reported instead of clamped.
    pub quality: f32,
    pub format: OutputFormat,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let policy = ResizePolicy::default();
        Self {
            width: None,
            height: None,
            keep_aspect_ratio: None,
            quality: policy.quality.value(),
            format: policy.output_format,
        }
    }
}

impl PolicyConfig {
    /// Layer this table onto `controls`: box edits, lock, quality, format.
    fn apply(&self, controls: &mut SizingControls) {
        if let Some(width) = self.width {
            controls.set_width(width);
        }
        if let Some(height) = self.height {
            controls.set_height(height);
        }
        if let Some(lock) = self.keep_aspect_ratio {
            controls.set_maintain_aspect_ratio(lock);
        }
        controls.set_quality(Quality::new(self.quality));
        controls.set_output_format(self.format);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub name: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel ingestion workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

fn check_quality(quality: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&quality) {
        return Err(ConfigError::Validation(format!(
            "policy.quality must be between 0 and 1, got {quality}"
        )));
    }
    Ok(())
}

/// Command-line edits layered on top of the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyOverrides {
    pub preset: Option<String>,
    pub aspect_ratio: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub free_ratio: bool,
    pub quality: Option<f32>,
    pub format: Option<OutputFormat>,
}

impl ResizeConfig {
    /// Validate config values are within acceptable ranges.
    ///
    /// Width and height are not checked: the geometry clamps them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_quality(self.policy.quality)?;
        if let Some(name) = &self.preset {
            if find_preset(name).is_none() {
                return Err(PresetError::UnknownPreset(name.clone()).into());
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Sizing controls for a new session.
    ///
    /// Starts from the stock controls, then the file's preset and `[policy]`,
    /// then `overrides` in the same preset-first order.
    pub fn sizing_controls(&self, overrides: &PolicyOverrides) -> Result<SizingControls, ConfigError> {
        let mut controls = SizingControls::default();
        if let Some(name) = &self.preset {
            controls.select_preset(name)?;
        }
        self.policy.apply(&mut controls);

        if let Some(name) = &overrides.preset {
            controls.select_preset(name)?;
        }
        if let Some(name) = &overrides.aspect_ratio {
            controls.select_aspect_ratio(name)?;
        }
        if let Some(width) = overrides.width {
            controls.set_width(width);
        }
        if let Some(height) = overrides.height {
            controls.set_height(height);
        }
        if overrides.free_ratio {
            controls.set_maintain_aspect_ratio(false);
        }
        if let Some(quality) = overrides.quality {
            check_quality(quality)?;
            controls.set_quality(Quality::new(quality));
        }
        if let Some(format) = overrides.format {
            controls.set_output_format(format);
        }
        Ok(controls)
    }
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<ResizeConfig, ConfigError> {
    let config: ResizeConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file.
///
/// A missing file yields the stock defaults unless `required` is set.
pub fn load_config(path: &Path, required: bool) -> Result<ResizeConfig, ConfigError> {
    if !required && !path.exists() {
        return Ok(ResizeConfig::default());
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `resize.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# batch-resize configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# Named size preset: sets the target box and turns the aspect lock on.
# Instagram 1080x1080, Story 1080x1920, Facebook 820x312, YouTube 1280x720,
# HD 1280x720, Full HD 1920x1080, Custom (keeps the box as it is).
preset = "Instagram"

# ---------------------------------------------------------------------------
# Resize policy
# ---------------------------------------------------------------------------
[policy]
# Target box in pixels, applied on top of the preset. Leave unset to keep
# the preset's box. Zero or negative values are clamped to 1.
# width = 1080
# height = 1080

# Keep the source aspect ratio: width is honoured, height follows.
# Leave unset to keep the preset's choice (presets turn it on).
# keep_aspect_ratio = true

# Encoder quality as a fraction between 0 and 1. JPEG and WebP honour it;
# PNG is lossless.
quality = 0.85

# Output format: "jpeg", "png" or "webp".
format = "jpeg"

# ---------------------------------------------------------------------------
# Archive
# ---------------------------------------------------------------------------
[archive]
# Zip file name and the folder inside it. Path separators are stripped.
name = "resized-images"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for reading inputs. Omit for auto (= CPU cores).
# max_processes = 4
"##
}
