//! Batch processor: one sequential encode pass over a registry snapshot.
//!
//! A pass commits to the item ids present when it starts. Each id is
//! reached in order: the item is moved to `Processing` under the session
//! lock, the codec runs with the lock released, and the result is handed
//! back under the lock again. That keeps the codec (the only slow step)
//! from blocking snapshots or policy edits, while every status change stays
//! atomic with respect to readers.
//!
//! ## Contracts
//!
//! - **Isolation**: an encode failure marks that item `Error` and the pass
//!   moves on.
//! - **Progress**: after every handled item the pass reports
//!   `handled / total * 100`. Values never decrease and the last one is
//!   exactly `100.0`.
//! - **One pass at a time**: a second call while a pass is running fails
//!   with [`BatchError::PassInProgress`].
//! - **Last policy wins**: if the item changed while its encode was in
//!   flight, the result is dropped and the item is left `Pending`.
//!
//! Items that are already `Completed` when reached are skipped but still
//! count toward progress.
//!
//! Events are sent over an optional `mpsc` channel so the CLI can print
//! from a separate thread while the pass runs.

use crate::imaging::ImageBackend;
use crate::registry::{EncodeJob, FinishOutcome, ItemId};
use crate::session::Session;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BatchError {
    #[error("A processing pass is already running")]
    PassInProgress,
}

/// How one snapshotted item was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed { bytes: usize },
    Failed { reason: String },
    /// The item changed during the encode; it is `Pending` again.
    Stale,
    /// The item was removed before its result could be stored.
    Removed,
    /// The item already had a result, or was in flight elsewhere.
    Skipped,
}

/// Progress events, in emission order for one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ItemStarted {
        id: ItemId,
        name: String,
    },
    ItemFinished {
        id: ItemId,
        name: String,
        outcome: ItemOutcome,
        /// Percentage of the snapshot handled so far, in `0.0..=100.0`.
        progress: f64,
    },
    Finished {
        summary: BatchSummary,
    },
}

/// Counts for one pass. `total` is the snapshot size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub stale: usize,
    pub removed: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Completed { .. } => self.completed += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
            ItemOutcome::Stale => self.stale += 1,
            ItemOutcome::Removed => self.removed += 1,
            ItemOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Percentage of `total` represented by `handled`.
///
/// An empty snapshot counts as done.
pub fn progress_percent(handled: usize, total: usize) -> f64 {
    if total == 0 || handled >= total {
        return 100.0;
    }
    handled as f64 / total as f64 * 100.0
}

/// Holds the session's pass flag for the duration of one pass.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, BatchError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { flag })
            .map_err(|_| BatchError::PassInProgress)
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// What the pass should do with the next snapshotted id.
enum Step {
    Encode(EncodeJob),
    Skip(String),
    Gone,
}

fn emit(events: Option<&Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A closed receiver only means nobody is listening any more.
        tx.send(event).ok();
    }
}

/// Run one encode pass over every item present right now.
pub fn process_all(
    session: &Session,
    backend: &impl ImageBackend,
    events: Option<&Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    let _guard = PassGuard::acquire(session.pass_flag())?;

    let ids = session.with_registry(|registry| registry.ids());
    let total = ids.len();
    let mut summary = BatchSummary {
        total,
        ..BatchSummary::default()
    };
    if total == 0 {
        debug!("nothing to process");
        return Ok(summary);
    }

    info!(total, "processing pass started");
    emit(events, BatchEvent::Started { total });

    for (index, id) in ids.into_iter().enumerate() {
        let step = session.with_registry_mut(|registry| match registry.begin_processing(id) {
            Some(job) => Step::Encode(job),
            None => match registry.get(id) {
                Some(item) => Step::Skip(item.display_name().to_string()),
                None => Step::Gone,
            },
        });

        let (name, outcome) = match step {
            Step::Encode(job) => {
                emit(
                    events,
                    BatchEvent::ItemStarted {
                        id,
                        name: job.display_name.clone(),
                    },
                );
                let rendered = backend.render(&job.params());
                let finished =
                    session.with_registry_mut(|registry| registry.finish_processing(&job, rendered));
                let outcome = match finished {
                    FinishOutcome::Completed { bytes } => {
                        debug!(%id, name = %job.display_name, bytes, target = %job.target, "encoded");
                        ItemOutcome::Completed { bytes }
                    }
                    FinishOutcome::Failed { reason } => {
                        warn!(%id, name = %job.display_name, %reason, "encode failed");
                        ItemOutcome::Failed { reason }
                    }
                    FinishOutcome::Stale => ItemOutcome::Stale,
                    FinishOutcome::Removed => ItemOutcome::Removed,
                };
                (job.display_name, outcome)
            }
            Step::Skip(name) => (name, ItemOutcome::Skipped),
            // Removed between the snapshot and this item's turn.
            Step::Gone => (String::new(), ItemOutcome::Removed),
        };

        summary.record(&outcome);
        emit(
            events,
            BatchEvent::ItemFinished {
                id,
                name,
                outcome,
                progress: progress_percent(index + 1, total),
            },
        );
    }

    info!(
        completed = summary.completed,
        failed = summary.failed,
        skipped = summary.skipped,
        stale = summary.stale,
        "processing pass finished"
    );
    emit(events, BatchEvent::Finished { summary });
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{Dimensions, ResizePolicy};
    use crate::registry::ItemStatus;
    use crate::test_helpers::source;
    use std::sync::{Arc, Mutex, mpsc};

    fn session_with(items: &[(&str, u32, u32)]) -> (Session, Vec<ItemId>) {
        let session = Session::default();
        let ids = items
            .iter()
            .map(|&(name, w, h)| session.ingest(source(name, w, h)))
            .collect();
        (session, ids)
    }

    fn status(session: &Session, id: ItemId) -> ItemStatus {
        session.with_registry(|registry| registry.get(id).unwrap().status())
    }

    fn collect(rx: mpsc::Receiver<BatchEvent>) -> Vec<BatchEvent> {
        rx.try_iter().collect()
    }

    fn progress_values(events: &[BatchEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::ItemFinished { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect()
    }

    // =========================================================================
    // Progress
    // =========================================================================

    #[test]
    fn progress_percent_bounds() {
        assert_eq!(progress_percent(0, 4), 0.0);
        assert_eq!(progress_percent(1, 4), 25.0);
        assert_eq!(progress_percent(3, 3), 100.0);
        assert_eq!(progress_percent(0, 0), 100.0);
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_100() {
        let (session, _) = session_with(&[
            ("a.jpg", 10, 10),
            ("b.jpg", 10, 10),
            ("c.jpg", 10, 10),
            ("d.jpg", 10, 10),
            ("e.jpg", 10, 10),
            ("f.jpg", 10, 10),
            ("g.jpg", 10, 10),
        ]);
        let backend = MockBackend::failing_on(&[b"c.jpg"]);
        let (tx, rx) = mpsc::channel();

        process_all(&session, &backend, Some(&tx)).unwrap();

        let values = progress_values(&collect(rx));
        assert_eq!(values.len(), 7);
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
        assert_eq!(*values.last().unwrap(), 100.0);
    }

    #[test]
    fn events_are_bracketed_by_start_and_finish() {
        let (session, ids) = session_with(&[("a.jpg", 10, 10), ("b.jpg", 10, 10)]);
        let (tx, rx) = mpsc::channel();

        process_all(&session, &MockBackend::new(), Some(&tx)).unwrap();

        let events = collect(rx);
        assert_eq!(events.first(), Some(&BatchEvent::Started { total: 2 }));
        assert!(matches!(
            events.last(),
            Some(BatchEvent::Finished { summary }) if summary.completed == 2
        ));
        assert_eq!(
            events[1],
            BatchEvent::ItemStarted {
                id: ids[0],
                name: "a.jpg".into()
            }
        );
    }

    #[test]
    fn empty_registry_emits_nothing() {
        let session = Session::default();
        let (tx, rx) = mpsc::channel();
        let summary = process_all(&session, &MockBackend::new(), Some(&tx)).unwrap();
        assert_eq!(summary, BatchSummary::default());
        assert!(collect(rx).is_empty());
    }

    // =========================================================================
    // Isolation
    // =========================================================================

    #[test]
    fn one_failure_does_not_stop_the_pass() {
        let (session, ids) = session_with(&[("a.jpg", 10, 10), ("b.jpg", 10, 10)]);
        let backend = MockBackend::failing_on(&[b"a.jpg"]);

        let summary = process_all(&session, &backend, None).unwrap();

        assert_eq!(status(&session, ids[0]), ItemStatus::Error);
        assert_eq!(status(&session, ids[1]), ItemStatus::Completed);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(backend.render_count(), 2);
    }

    #[test]
    fn failed_items_are_retried_next_pass() {
        let (session, ids) = session_with(&[("a.jpg", 10, 10)]);
        process_all(&session, &MockBackend::failing_on(&[b"a.jpg"]), None).unwrap();
        assert_eq!(status(&session, ids[0]), ItemStatus::Error);

        process_all(&session, &MockBackend::new(), None).unwrap();
        assert_eq!(status(&session, ids[0]), ItemStatus::Completed);
    }

    // =========================================================================
    // Pass contract
    // =========================================================================

    #[test]
    fn codec_receives_item_geometry_and_policy_encoding() {
        let (session, ids) = session_with(&[("a.jpg", 1600, 1200)]);
        session.set_policy(ResizePolicy {
            target_width: 800,
            ..ResizePolicy::default()
        });
        session.rotate_item(ids[0], crate::registry::Turn::Clockwise).unwrap();
        let backend = MockBackend::new();

        process_all(&session, &backend, None).unwrap();

        match &backend.get_operations()[0] {
            RecordedOp::Render {
                width,
                height,
                rotation,
                ..
            } => {
                // Logical box; the codec swaps axes itself.
                assert_eq!((*width, *height), (800, 600));
                assert_eq!(rotation.degrees(), 90);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn completed_items_are_skipped_but_counted() {
        let (session, _) = session_with(&[("a.jpg", 10, 10), ("b.jpg", 10, 10)]);
        let backend = MockBackend::new();
        process_all(&session, &backend, None).unwrap();

        let (tx, rx) = mpsc::channel();
        let summary = process_all(&session, &backend, Some(&tx)).unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(backend.render_count(), 2);
        assert_eq!(progress_values(&collect(rx)), vec![50.0, 100.0]);
    }

    #[test]
    fn concurrent_pass_is_rejected() {
        let (session, _) = session_with(&[("a.jpg", 10, 10)]);
        let session = Arc::new(session);
        let nested: Arc<Mutex<Option<Result<BatchSummary, BatchError>>>> = Arc::default();

        let backend = {
            let session = Arc::clone(&session);
            let nested = Arc::clone(&nested);
            MockBackend::with_render_hook(move |_| {
                let result = process_all(&session, &MockBackend::new(), None);
                *nested.lock().unwrap() = Some(result);
            })
        };

        process_all(&session, &backend, None).unwrap();

        assert_eq!(
            nested.lock().unwrap().take(),
            Some(Err(BatchError::PassInProgress))
        );
        // Flag released once the pass ends
        assert!(process_all(&session, &MockBackend::new(), None).is_ok());
    }

    #[test]
    fn items_added_mid_pass_wait_for_next_pass() {
        let (session, _) = session_with(&[("a.jpg", 10, 10)]);
        let session = Arc::new(session);
        let added: Arc<Mutex<Option<ItemId>>> = Arc::default();

        let backend = {
            let session = Arc::clone(&session);
            let added = Arc::clone(&added);
            MockBackend::with_render_hook(move |_| {
                let mut added = added.lock().unwrap();
                if added.is_none() {
                    *added = Some(session.ingest(source("late.jpg", 10, 10)));
                }
            })
        };

        let summary = process_all(&session, &backend, None).unwrap();

        assert_eq!(summary.total, 1);
        let late = added.lock().unwrap().unwrap();
        assert_eq!(status(&session, late), ItemStatus::Pending);
    }

    #[test]
    fn policy_change_mid_pass_last_policy_wins() {
        let (session, ids) = session_with(&[("a.jpg", 100, 100), ("b.jpg", 100, 100)]);
        let session = Arc::new(session);

        let backend = {
            let session = Arc::clone(&session);
            let fired = AtomicBool::new(false);
            MockBackend::with_render_hook(move |_| {
                if !fired.swap(true, Ordering::SeqCst) {
                    session.set_width(500);
                }
            })
        };

        let summary = process_all(&session, &backend, None).unwrap();

        assert_eq!(summary.stale, 1);
        assert_eq!(summary.completed, 1);
        // In flight during the change: result dropped
        assert_eq!(status(&session, ids[0]), ItemStatus::Pending);
        // Reached after the change: encoded at the new size
        session.with_registry(|registry| {
            let b = registry.get(ids[1]).unwrap();
            assert_eq!(b.status(), ItemStatus::Completed);
            assert_eq!(b.target_size(), Dimensions::new(500, 500));
            assert_eq!(b.encoded().unwrap().bytes(), b"500x500@0.jpeg");
        });

        // The next pass picks up the dropped item
        let summary = process_all(&session, &MockBackend::new(), None).unwrap();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(status(&session, ids[0]), ItemStatus::Completed);
    }

    #[test]
    fn removal_mid_encode_drops_result() {
        let (session, ids) = session_with(&[("a.jpg", 10, 10), ("b.jpg", 10, 10)]);
        let session = Arc::new(session);
        let victim = ids[0];

        let backend = {
            let session = Arc::clone(&session);
            MockBackend::with_render_hook(move |params| {
                if params.source == b"a.jpg" {
                    session.remove_item(victim).unwrap();
                }
            })
        };

        let summary = process_all(&session, &backend, None).unwrap();

        assert_eq!(summary.removed, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(session.snapshot().len(), 1);
    }

    // =========================================================================
    // Re-encode after invalidation
    // =========================================================================

    #[test]
    fn policy_change_after_pass_reencodes_everything() {
        let (session, ids) = session_with(&[
            ("a.jpg", 1600, 1200),
            ("b.png", 800, 800),
            ("c.webp", 640, 480),
        ]);
        let backend = MockBackend::new();
        process_all(&session, &backend, None).unwrap();
        assert!(ids.iter().all(|&id| status(&session, id) == ItemStatus::Completed));

        let invalidated = session.set_policy(ResizePolicy {
            target_width: 1920,
            target_height: 1080,
            maintain_aspect_ratio: false,
            ..session.policy()
        });

        assert_eq!(invalidated, 3);
        for snapshot in session.snapshot() {
            assert_eq!(snapshot.status, ItemStatus::Pending);
            assert_eq!(snapshot.encoded_bytes, None);
        }

        let summary = process_all(&session, &backend, None).unwrap();
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(backend.render_count(), 6);
        let last_sizes: Vec<(u32, u32)> = backend.get_operations()[3..]
            .iter()
            .filter_map(|op| match op {
                RecordedOp::Render { width, height, .. } => Some((*width, *height)),
                _ => None,
            })
            .collect();
        assert_eq!(last_sizes, vec![(1920, 1080); 3]);
    }
}
