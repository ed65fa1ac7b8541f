//! Named size presets and aspect-ratio shortcuts.
//!
//! Presets are the quick way to set the policy box: picking one sets the
//! target width and height and turns the aspect lock on. The `Custom` preset
//! leaves the policy alone and switches to free-form editing, where the
//! aspect-ratio shortcuts apply.
//!
//! [`SizingControls`] holds the editing state (current policy, selected
//! preset, active shortcut) and is the only place these rules live. It is a
//! plain value; [`Session`](crate::session::Session) funnels every change
//! through it and then into the registry's invalidation sweep.
//!
//! ## Free-form rules
//!
//! - Selecting a shortcut turns the aspect lock on and derives the other axis
//!   from whichever axis is positive (width first), or from a 1080px
//!   baseline width if neither is.
//! - While a shortcut is active and the lock is on, editing one axis
//!   recomputes the other.
//! - Turning the lock off, or clearing the shortcut, keeps width and height
//!   at their last values.

use crate::imaging::{OutputFormat, Quality, ResizePolicy, apply_aspect_ratio};
use thiserror::Error;

/// Width used when a shortcut is picked and neither axis is usable.
pub const BASELINE_WIDTH: i64 = 1080;

pub const CUSTOM_PRESET: &str = "Custom";

pub const DEFAULT_PRESET: &str = "Instagram";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PresetError {
    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("Unknown aspect ratio '{0}'")]
    UnknownAspectRatio(String),
}

/// A named target box. `Custom` is the only preset without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

impl Preset {
    pub fn is_custom(&self) -> bool {
        self.name == CUSTOM_PRESET
    }
}

/// A named width:height ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatio {
    pub name: &'static str,
    pub ratio: f64,
}

pub const PRESETS: &[Preset] = &[
    Preset { name: "Instagram", width: 1080, height: 1080 },
    Preset { name: "Story", width: 1080, height: 1920 },
    Preset { name: "Facebook", width: 820, height: 312 },
    Preset { name: "YouTube", width: 1280, height: 720 },
    Preset { name: "HD", width: 1280, height: 720 },
    Preset { name: "Full HD", width: 1920, height: 1080 },
    Preset { name: CUSTOM_PRESET, width: 0, height: 0 },
];

pub const ASPECT_RATIOS: &[AspectRatio] = &[
    AspectRatio { name: "1:1", ratio: 1.0 },
    AspectRatio { name: "4:3", ratio: 4.0 / 3.0 },
    AspectRatio { name: "3:4", ratio: 3.0 / 4.0 },
    AspectRatio { name: "16:9", ratio: 16.0 / 9.0 },
    AspectRatio { name: "9:16", ratio: 9.0 / 16.0 },
    AspectRatio { name: "21:9", ratio: 21.0 / 9.0 },
    AspectRatio { name: "3:2", ratio: 3.0 / 2.0 },
    AspectRatio { name: "2:3", ratio: 2.0 / 3.0 },
];

/// Look up a preset by name, ignoring ASCII case.
pub fn find_preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name.trim()))
}

/// Look up an aspect-ratio shortcut by name (`"16:9"`).
pub fn find_aspect_ratio(name: &str) -> Option<&'static AspectRatio> {
    ASPECT_RATIOS.iter().find(|ar| ar.name == name.trim())
}

fn custom_preset() -> &'static Preset {
    &PRESETS[PRESETS.len() - 1]
}

/// What selecting a preset asks of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetSelection {
    /// The policy box was set from the preset.
    Fixed { width: u32, height: u32 },
    /// Policy untouched; expose free-form width/height editing.
    Custom,
}

/// Editing state behind the policy: the policy itself, the selected preset,
/// and the active aspect-ratio shortcut.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingControls {
    policy: ResizePolicy,
    preset: &'static Preset,
    aspect: Option<&'static AspectRatio>,
}

impl Default for SizingControls {
    fn default() -> Self {
        let mut controls = Self::new(ResizePolicy::default());
        controls.preset = find_preset(DEFAULT_PRESET).unwrap_or_else(custom_preset);
        controls
    }
}

impl SizingControls {
    /// Start from an explicit policy, in free-form (`Custom`) mode.
    pub fn new(policy: ResizePolicy) -> Self {
        Self {
            policy,
            preset: custom_preset(),
            aspect: None,
        }
    }

    pub fn policy(&self) -> ResizePolicy {
        self.policy
    }

    pub fn preset(&self) -> &'static Preset {
        self.preset
    }

    pub fn aspect_ratio(&self) -> Option<&'static AspectRatio> {
        self.aspect
    }

    pub fn is_free_form(&self) -> bool {
        self.preset.is_custom()
    }

    pub fn select_preset(&mut self, name: &str) -> Result<PresetSelection, PresetError> {
        let preset = find_preset(name).ok_or_else(|| PresetError::UnknownPreset(name.to_string()))?;
        self.preset = preset;
        if preset.is_custom() {
            return Ok(PresetSelection::Custom);
        }
        self.policy.target_width = i64::from(preset.width);
        self.policy.target_height = i64::from(preset.height);
        self.policy.maintain_aspect_ratio = true;
        self.aspect = None;
        Ok(PresetSelection::Fixed {
            width: preset.width,
            height: preset.height,
        })
    }

    /// Apply a shortcut. Picking one implies free-form editing.
    pub fn select_aspect_ratio(&mut self, name: &str) -> Result<(), PresetError> {
        let aspect = find_aspect_ratio(name)
            .ok_or_else(|| PresetError::UnknownAspectRatio(name.to_string()))?;
        self.preset = custom_preset();
        self.aspect = Some(aspect);
        self.policy.maintain_aspect_ratio = true;
        let (width, height) = apply_aspect_ratio(
            self.policy.target_width,
            self.policy.target_height,
            aspect.ratio,
            BASELINE_WIDTH,
        );
        self.policy.target_width = width;
        self.policy.target_height = height;
        Ok(())
    }

    pub fn clear_aspect_ratio(&mut self) {
        self.aspect = None;
    }

    fn locked_ratio(&self) -> Option<f64> {
        self.aspect
            .filter(|_| self.policy.maintain_aspect_ratio)
            .map(|ar| ar.ratio)
    }

    pub fn set_width(&mut self, width: i64) {
        self.preset = custom_preset();
        self.policy.target_width = width;
        if let Some(ratio) = self.locked_ratio() {
            self.policy.target_height = (width as f64 / ratio).round() as i64;
        }
    }

    pub fn set_height(&mut self, height: i64) {
        self.preset = custom_preset();
        self.policy.target_height = height;
        if let Some(ratio) = self.locked_ratio() {
            self.policy.target_width = (height as f64 * ratio).round() as i64;
        }
    }

    pub fn set_maintain_aspect_ratio(&mut self, on: bool) {
        self.policy.maintain_aspect_ratio = on;
        if !on {
            self.aspect = None;
        }
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.policy.quality = quality;
    }

    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.policy.output_format = format;
    }

    /// Replace the whole policy, keeping preset/shortcut bookkeeping honest.
    pub fn set_policy(&mut self, policy: ResizePolicy) {
        let box_changed = policy.target_width != self.policy.target_width
            || policy.target_height != self.policy.target_height;
        if box_changed {
            self.preset = custom_preset();
            self.aspect = None;
        }
        if !policy.maintain_aspect_ratio {
            self.aspect = None;
        }
        self.policy = policy;
    }
}
