//! Session totals: what went in, what came out, what is expected.
//!
//! Computed from item snapshots, so the numbers never reach into live
//! registry state. Savings are whole percentages relative to the total
//! source size and can be negative when outputs grow.

use crate::imaging::{ResizePolicy, estimate_encoded_size};
use crate::registry::{ItemSnapshot, ItemStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub items: usize,
    pub completed: usize,
    pub failed: usize,
    /// Sum of source sizes over every item.
    pub original_bytes: u64,
    /// Sum of encoded sizes over completed items.
    pub encoded_bytes: u64,
    /// Heuristic output size for every item at its current target.
    pub estimated_bytes: u64,
}

impl BatchStats {
    pub fn from_snapshot(items: &[ItemSnapshot], policy: &ResizePolicy) -> Self {
        items.iter().fold(Self::default(), |mut stats, item| {
            stats.items += 1;
            match item.status {
                ItemStatus::Completed => stats.completed += 1,
                ItemStatus::Error => stats.failed += 1,
                ItemStatus::Pending | ItemStatus::Processing => {}
            }
            stats.original_bytes += item.source_bytes as u64;
            stats.encoded_bytes += item.encoded_bytes.unwrap_or(0) as u64;
            stats.estimated_bytes +=
                estimate_encoded_size(item.target_size, policy.output_format, policy.quality);
            stats
        })
    }

    /// Actual savings, once anything has been encoded.
    pub fn savings_percent(&self) -> Option<i64> {
        if self.encoded_bytes == 0 {
            return None;
        }
        savings(self.original_bytes, self.encoded_bytes)
    }

    /// Expected savings from the size heuristic.
    pub fn estimated_savings_percent(&self) -> Option<i64> {
        savings(self.original_bytes, self.estimated_bytes)
    }
}

fn savings(original: u64, new: u64) -> Option<i64> {
    if original == 0 {
        return None;
    }
    Some(((1.0 - new as f64 / original as f64) * 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{Dimensions, OutputFormat, Quality, Rotation};
    use crate::registry::ItemId;
    use crate::test_helpers::registry_with;

    fn snapshot(id: ItemId, status: ItemStatus, source: usize, encoded: Option<usize>) -> ItemSnapshot {
        ItemSnapshot {
            id,
            name: "x.jpg".into(),
            original_size: Dimensions::new(100, 100),
            target_size: Dimensions::new(10, 10),
            rotation: Rotation::Deg0,
            size_override: None,
            status,
            source_bytes: source,
            encoded_bytes: encoded,
            error: None,
        }
    }

    fn png_policy() -> ResizePolicy {
        ResizePolicy {
            output_format: OutputFormat::Png,
            quality: Quality::new(1.0),
            ..ResizePolicy::default()
        }
    }

    #[test]
    fn totals_and_counts() {
        let (_, ids) = registry_with(&[("a", 1, 1), ("b", 1, 1), ("c", 1, 1)]);
        let items = [
            snapshot(ids[0], ItemStatus::Completed, 1000, Some(250)),
            snapshot(ids[1], ItemStatus::Error, 500, None),
            snapshot(ids[2], ItemStatus::Pending, 500, None),
        ];

        let stats = BatchStats::from_snapshot(&items, &png_policy());

        assert_eq!(stats.items, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.original_bytes, 2000);
        assert_eq!(stats.encoded_bytes, 250);
        // 10x10 at 1.2 bytes per pixel, three times
        assert_eq!(stats.estimated_bytes, 360);
    }

    #[test]
    fn savings_are_rounded_percentages() {
        let stats = BatchStats {
            original_bytes: 2000,
            encoded_bytes: 250,
            estimated_bytes: 360,
            ..BatchStats::default()
        };
        assert_eq!(stats.savings_percent(), Some(88));
        assert_eq!(stats.estimated_savings_percent(), Some(82));
    }

    #[test]
    fn growth_is_negative_savings() {
        let stats = BatchStats {
            original_bytes: 100,
            encoded_bytes: 150,
            ..BatchStats::default()
        };
        assert_eq!(stats.savings_percent(), Some(-50));
    }

    #[test]
    fn no_savings_without_data() {
        let stats = BatchStats::default();
        assert_eq!(stats.savings_percent(), None);
        assert_eq!(stats.estimated_savings_percent(), None);

        let nothing_encoded = BatchStats {
            original_bytes: 100,
            ..BatchStats::default()
        };
        assert_eq!(nothing_encoded.savings_percent(), None);
    }
}
