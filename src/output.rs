//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Settings
//!
//! ```text
//! Preset: Instagram
//! Size: 1080×1080, aspect locked
//! Format: JPEG, quality 85%
//! ```
//!
//! ## Processing
//!
//! ```text
//! Processing 3 images
//! [ 33%] dawn.jpg → 182.4 KB
//! [ 67%] dusk.png → failed: Decode error: ...
//! [100%] noon.webp → skipped, already encoded
//! Done: 1 encoded, 1 failed, 1 skipped
//! ```
//!
//! ## Summary
//!
//! ```text
//! Images
//! 001 dawn.jpg  1600×1200 → 1080×810  completed
//!     Encoded: 182.4 KB
//! 002 dusk.png  800×800 → 1080×1080 (90°)  error
//!     Error: Decode error: ...
//!
//! Original: 2.4 MB
//! Estimated: ~406.2 KB (saves ~83%)
//! Encoded: 182.4 KB (saves 92%)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary, ItemOutcome};
use crate::ingest::Rejection;
use crate::presets::{ASPECT_RATIOS, PRESETS, SizingControls};
use crate::registry::{ItemSnapshot, ItemStatus};
use crate::stats::BatchStats;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable size: base 1024, one decimal, trailing `.0` dropped.
///
/// ```text
/// 0 B, 512 B, 1.5 KB, 2 MB
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["B", "KB", "MB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.1}", value);
    let trimmed = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{} {}", trimmed, UNITS[unit])
}

/// `saves 42%` for shrinkage, `grows 5%` when the output is larger.
fn savings_label(percent: i64, approximate: bool) -> String {
    let verb = if percent >= 0 { "saves" } else { "grows" };
    let tilde = if approximate { "~" } else { "" };
    format!("{} {}{}%", verb, tilde, percent.abs())
}

fn rotation_suffix(snapshot: &ItemSnapshot) -> String {
    match snapshot.rotation.degrees() {
        0 => String::new(),
        deg => format!(" ({}°)", deg),
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Format the active sizing controls.
pub fn format_settings(controls: &SizingControls) -> Vec<String> {
    let policy = controls.policy();
    let mut lines = vec![format!("Preset: {}", controls.preset().name)];
    let lock = match (policy.maintain_aspect_ratio, controls.aspect_ratio()) {
        (true, Some(aspect)) => format!("aspect locked to {}", aspect.name),
        (true, None) => "aspect locked".to_string(),
        (false, _) => "free ratio".to_string(),
    };
    lines.push(format!(
        "Size: {}×{}, {}",
        policy.target_width, policy.target_height, lock
    ));
    if policy.output_format.is_lossy() {
        lines.push(format!(
            "Format: {}, quality {}%",
            policy.output_format,
            policy.quality.percent()
        ));
    } else {
        lines.push(format!("Format: {}, lossless", policy.output_format));
    }
    lines
}

pub fn print_settings(controls: &SizingControls) {
    print_lines(format_settings(controls));
}

/// Format the preset catalog and aspect-ratio shortcuts.
pub fn format_presets() -> Vec<String> {
    let mut lines = vec!["Presets".to_string()];
    for (i, preset) in PRESETS.iter().enumerate() {
        if preset.is_custom() {
            lines.push(format!("{} {}", format_index(i + 1), preset.name));
        } else {
            lines.push(format!(
                "{} {} ({}×{})",
                format_index(i + 1),
                preset.name,
                preset.width,
                preset.height
            ));
        }
    }
    lines.push(String::new());
    lines.push("Aspect ratios".to_string());
    let names: Vec<&str> = ASPECT_RATIOS.iter().map(|a| a.name).collect();
    lines.push(format!("{}{}", indent(1), names.join("  ")));
    lines
}

pub fn print_presets() {
    print_lines(format_presets());
}

// ============================================================================
// Processing
// ============================================================================

fn outcome_text(outcome: &ItemOutcome) -> String {
    match outcome {
        ItemOutcome::Completed { bytes } => format_bytes(*bytes as u64),
        ItemOutcome::Failed { reason } => format!("failed: {}", reason),
        ItemOutcome::Stale => "settings changed, will re-encode".to_string(),
        ItemOutcome::Removed => "removed".to_string(),
        ItemOutcome::Skipped => "skipped, already encoded".to_string(),
    }
}

fn summary_line(summary: &BatchSummary) -> String {
    let mut parts = vec![format!("{} encoded", summary.completed)];
    if summary.failed > 0 {
        parts.push(format!("{} failed", summary.failed));
    }
    if summary.skipped > 0 {
        parts.push(format!("{} skipped", summary.skipped));
    }
    if summary.stale > 0 {
        parts.push(format!("{} pending again", summary.stale));
    }
    if summary.removed > 0 {
        parts.push(format!("{} removed", summary.removed));
    }
    format!("Done: {}", parts.join(", "))
}

/// Format a single batch event as display lines.
///
/// `ItemStarted` prints nothing; each item gets one line when it finishes.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!("Processing {} images", total)],
        BatchEvent::ItemStarted { .. } => Vec::new(),
        BatchEvent::ItemFinished {
            id,
            name,
            outcome,
            progress,
        } => {
            let label = if name.is_empty() {
                format!("#{}", id)
            } else {
                name.clone()
            };
            vec![format!(
                "[{:>3.0}%] {} → {}",
                progress,
                label,
                outcome_text(outcome)
            )]
        }
        BatchEvent::Finished { summary } => vec![summary_line(summary)],
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Format one line per item with its geometry and state.
pub fn format_item_table(items: &[ItemSnapshot]) -> Vec<String> {
    let mut lines = vec!["Images".to_string()];
    for (i, item) in items.iter().enumerate() {
        lines.push(format!(
            "{} {}  {} → {}{}  {}",
            format_index(i + 1),
            item.name,
            item.original_size,
            item.target_size,
            rotation_suffix(item),
            item.status
        ));
        match item.status {
            ItemStatus::Completed => {
                if let Some(bytes) = item.encoded_bytes {
                    lines.push(format!("{}Encoded: {}", indent(1), format_bytes(bytes as u64)));
                }
            }
            ItemStatus::Error => {
                if let Some(reason) = &item.error {
                    lines.push(format!("{}Error: {}", indent(1), reason));
                }
            }
            ItemStatus::Pending | ItemStatus::Processing => {}
        }
    }
    lines
}

/// Format totals and savings.
pub fn format_summary(stats: &BatchStats) -> Vec<String> {
    let mut lines = vec![format!("Original: {}", format_bytes(stats.original_bytes))];

    let mut estimated = format!("Estimated: ~{}", format_bytes(stats.estimated_bytes));
    if let Some(percent) = stats.estimated_savings_percent() {
        estimated.push_str(&format!(" ({})", savings_label(percent, true)));
    }
    lines.push(estimated);

    if stats.completed > 0 {
        let mut encoded = format!("Encoded: {}", format_bytes(stats.encoded_bytes));
        if let Some(percent) = stats.savings_percent() {
            encoded.push_str(&format!(" ({})", savings_label(percent, false)));
        }
        lines.push(encoded);
    } else {
        lines.push("Encoded: -".to_string());
    }
    lines
}

/// Format ingestion rejections.
pub fn format_rejections(rejected: &[Rejection]) -> Vec<String> {
    rejected
        .iter()
        .map(|r| format!("Skipped {}: {}", r.path.display(), r.error))
        .collect()
}

pub fn print_report(items: &[ItemSnapshot], stats: &BatchStats) {
    let mut lines = format_item_table(items);
    lines.push(String::new());
    lines.extend(format_summary(stats));
    print_lines(lines);
}

pub fn print_rejections(rejected: &[Rejection]) {
    for line in format_rejections(rejected) {
        eprintln!("{}", line);
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}
