//! Item registry: the tracked images and their lifecycle.
//!
//! The registry is the single source of truth for every image in a session.
//! It owns the current [`ResizePolicy`] so that every geometry input lives in
//! one place, and it is the only code that moves an item between states.
//!
//! ## State machine
//!
//! ```text
//!              begin_processing           finish (ok)
//!   Pending ─────────────────▶ Processing ────────────▶ Completed
//!      ▲  ▲                        │                        │
//!      │  └──── finish (stale) ────┤ finish (err)           │
//!      │                           ▼                        │
//!      │      begin_processing   Error                      │
//!      │   ◀──────────────────────┘                         │
//!      └──────────────── invalidate ────────────────────────┘
//! ```
//!
//! Encoded bytes live *inside* [`ItemState::Completed`], so "result present
//! iff completed" holds by construction.
//!
//! ## Revisions
//!
//! Every recompute of an item's target size bumps its revision. A batch job
//! carries the revision it was started with; if the item moved on while the
//! codec was running, the result is dropped and the item goes back to
//! `Pending` for the next pass.

use crate::imaging::{
    BackendError, Dimensions, OutputFormat, Quality, RenderParams, ResizePolicy, Rotation,
    compute_target_size,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No image with id {0}")]
    UnknownItem(ItemId),
}

/// Opaque, never-reused item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An accepted source file, as handed over by ingestion.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub display_name: String,
    pub bytes: Arc<[u8]>,
    pub original_size: Dimensions,
}

/// Bytes produced by the codec for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResult {
    bytes: Arc<[u8]>,
}

impl EncodedResult {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the bytes, for packaging outside the registry lock.
    pub fn share(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Lifecycle state, with the encoded result carried by `Completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Processing,
    Completed(EncodedResult),
    Error { reason: String },
}

/// Payload-free view of [`ItemState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ItemState {
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemState::Pending => ItemStatus::Pending,
            ItemState::Processing => ItemStatus::Processing,
            ItemState::Completed(_) => ItemStatus::Completed,
            ItemState::Error { .. } => ItemStatus::Error,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
            ItemStatus::Error => "error",
        })
    }
}

/// Direction for a single-item rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Clockwise,
    CounterClockwise,
}

/// One tracked image.
#[derive(Debug, Clone)]
pub struct ImageItem {
    id: ItemId,
    display_name: String,
    source: Arc<[u8]>,
    original_size: Dimensions,
    rotation: Rotation,
    size_override: Option<Dimensions>,
    target_size: Dimensions,
    state: ItemState,
    revision: u64,
}

impl ImageItem {
    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn original_size(&self) -> Dimensions {
        self.original_size
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn size_override(&self) -> Option<Dimensions> {
        self.size_override
    }

    pub fn target_size(&self) -> Dimensions {
        self.target_size
    }

    pub fn state(&self) -> &ItemState {
        &self.state
    }

    pub fn status(&self) -> ItemStatus {
        self.state.status()
    }

    pub fn encoded(&self) -> Option<&EncodedResult> {
        match &self.state {
            ItemState::Completed(result) => Some(result),
            _ => None,
        }
    }

    /// Recompute the target size and drop any result that no longer matches.
    ///
    /// `Completed` always falls back to `Pending`. `Error` does too when
    /// `reset_errors` is set (single-item edits). `Processing` is left alone;
    /// the revision bump makes the in-flight result stale.
    ///
    /// Returns whether an encoded result was discarded.
    fn recompute(&mut self, policy: &ResizePolicy, reset_errors: bool) -> bool {
        self.target_size =
            compute_target_size(self.original_size, policy, self.rotation, self.size_override);
        self.revision += 1;
        match self.state {
            ItemState::Completed(_) => {
                self.state = ItemState::Pending;
                true
            }
            ItemState::Error { .. } if reset_errors => {
                self.state = ItemState::Pending;
                false
            }
            ItemState::Pending | ItemState::Processing | ItemState::Error { .. } => false,
        }
    }
}

/// Read-only copy of one item for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub name: String,
    pub original_size: Dimensions,
    pub target_size: Dimensions,
    pub rotation: Rotation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_override: Option<Dimensions>,
    pub status: ItemStatus,
    pub source_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ImageItem> for ItemSnapshot {
    fn from(item: &ImageItem) -> Self {
        Self {
            id: item.id,
            name: item.display_name.clone(),
            original_size: item.original_size,
            target_size: item.target_size,
            rotation: item.rotation,
            size_override: item.size_override,
            status: item.status(),
            source_bytes: item.source.len(),
            encoded_bytes: item.encoded().map(EncodedResult::byte_len),
            error: match &item.state {
                ItemState::Error { reason } => Some(reason.clone()),
                _ => None,
            },
        }
    }
}

/// Everything the codec needs for one item, detached from the registry.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub id: ItemId,
    pub display_name: String,
    pub revision: u64,
    pub source: Arc<[u8]>,
    pub target: Dimensions,
    pub rotation: Rotation,
    pub format: OutputFormat,
    pub quality: Quality,
}

impl EncodeJob {
    pub fn params(&self) -> RenderParams<'_> {
        RenderParams {
            source: &self.source,
            target: self.target,
            rotation: self.rotation,
            format: self.format,
            quality: self.quality,
        }
    }
}

/// What happened when a job's result was handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    Completed { bytes: usize },
    Failed { reason: String },
    /// The item changed while encoding; result dropped, item is `Pending`.
    Stale,
    /// The item was removed while encoding; result dropped.
    Removed,
}

/// Ordered set of tracked images plus the policy they are sized against.
#[derive(Debug, Default)]
pub struct Registry {
    policy: ResizePolicy,
    items: Vec<ImageItem>,
    next_id: u64,
}

impl Registry {
    pub fn new(policy: ResizePolicy) -> Self {
        Self {
            policy,
            items: Vec::new(),
            next_id: 1,
        }
    }

    pub fn policy(&self) -> &ResizePolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in ingestion order.
    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn get(&self, id: ItemId) -> Option<&ImageItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn get_mut(&mut self, id: ItemId) -> Result<&mut ImageItem, RegistryError> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(RegistryError::UnknownItem(id))
    }

    pub fn snapshot(&self) -> Vec<ItemSnapshot> {
        self.items.iter().map(ItemSnapshot::from).collect()
    }

    /// Items currently holding an encoded result, in registry order.
    pub fn completed(&self) -> impl Iterator<Item = (&ImageItem, &EncodedResult)> {
        self.items
            .iter()
            .filter_map(|item| item.encoded().map(|result| (item, result)))
    }

    /// Register an accepted source as a new `Pending` item.
    pub fn ingest(&mut self, source: SourceFile) -> ItemId {
        // next_id starts at 0 under Default; ids begin at 1 either way.
        self.next_id = self.next_id.max(1);
        let id = ItemId(self.next_id);
        self.next_id += 1;

        let target_size =
            compute_target_size(source.original_size, &self.policy, Rotation::Deg0, None);
        debug!(%id, name = %source.display_name, original = %source.original_size, target = %target_size, "ingested");
        self.items.push(ImageItem {
            id,
            display_name: source.display_name,
            source: source.bytes,
            original_size: source.original_size,
            rotation: Rotation::Deg0,
            size_override: None,
            target_size,
            state: ItemState::Pending,
            revision: 0,
        });
        id
    }

    /// Replace the policy and recompute every item.
    ///
    /// Returns how many completed results were invalidated. Setting the
    /// current policy again is a no-op.
    pub fn set_policy(&mut self, policy: ResizePolicy) -> usize {
        if policy == self.policy {
            return 0;
        }
        self.policy = policy;
        let invalidated = self
            .items
            .iter_mut()
            .map(|item| item.recompute(&policy, false))
            .filter(|&discarded| discarded)
            .count();
        debug!(items = self.items.len(), invalidated, "policy changed");
        invalidated
    }

    pub fn set_rotation(&mut self, id: ItemId, rotation: Rotation) -> Result<(), RegistryError> {
        let policy = self.policy;
        let item = self.get_mut(id)?;
        item.rotation = rotation;
        item.recompute(&policy, true);
        debug!(%id, degrees = rotation.degrees(), "rotation set");
        Ok(())
    }

    /// Rotate one item a quarter turn. Returns the new rotation.
    pub fn rotate(&mut self, id: ItemId, turn: Turn) -> Result<Rotation, RegistryError> {
        let current = self.get(id).ok_or(RegistryError::UnknownItem(id))?.rotation;
        let next = match turn {
            Turn::Clockwise => current.clockwise(),
            Turn::CounterClockwise => current.counter_clockwise(),
        };
        self.set_rotation(id, next)?;
        Ok(next)
    }

    pub fn set_override(
        &mut self,
        id: ItemId,
        size_override: Option<Dimensions>,
    ) -> Result<(), RegistryError> {
        let policy = self.policy;
        let item = self.get_mut(id)?;
        item.size_override = size_override;
        item.recompute(&policy, true);
        Ok(())
    }

    /// Remove one item, releasing its source and result.
    pub fn remove(&mut self, id: ItemId) -> Result<ImageItem, RegistryError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(RegistryError::UnknownItem(id))?;
        debug!(%id, "removed");
        Ok(self.items.remove(index))
    }

    /// Drop every item. Ids keep counting up.
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        removed
    }

    /// Move an item into `Processing` and hand out its encode job.
    ///
    /// Only `Pending` and `Error` items are started. Returns `None` for
    /// unknown ids and for items that are already completed or in flight.
    pub fn begin_processing(&mut self, id: ItemId) -> Option<EncodeJob> {
        let policy = self.policy;
        let item = self.get_mut(id).ok()?;
        match item.state {
            ItemState::Pending | ItemState::Error { .. } => {}
            ItemState::Processing | ItemState::Completed(_) => return None,
        }
        item.state = ItemState::Processing;
        Some(EncodeJob {
            id,
            display_name: item.display_name.clone(),
            revision: item.revision,
            source: Arc::clone(&item.source),
            target: item.target_size,
            rotation: item.rotation,
            format: policy.output_format,
            quality: policy.quality,
        })
    }

    /// Store a job's result, unless the item moved on in the meantime.
    pub fn finish_processing(
        &mut self,
        job: &EncodeJob,
        result: Result<Vec<u8>, BackendError>,
    ) -> FinishOutcome {
        let Ok(item) = self.get_mut(job.id) else {
            return FinishOutcome::Removed;
        };
        match item.state {
            ItemState::Processing => {}
            // Only the batch processor moves items out of Processing.
            ItemState::Pending | ItemState::Completed(_) | ItemState::Error { .. } => {
                return FinishOutcome::Stale;
            }
        }
        if item.revision != job.revision {
            item.state = ItemState::Pending;
            debug!(id = %job.id, "result stale, back to pending");
            return FinishOutcome::Stale;
        }
        match result {
            Ok(bytes) => {
                let len = bytes.len();
                item.state = ItemState::Completed(EncodedResult::new(bytes));
                FinishOutcome::Completed { bytes: len }
            }
            Err(e) => {
                let reason = e.to_string();
                item.state = ItemState::Error {
                    reason: reason.clone(),
                };
                FinishOutcome::Failed { reason }
            }
        }
    }
}
