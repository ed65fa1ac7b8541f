//! The controlling component: sizing controls and registry behind one lock.
//!
//! [`Session`] is the command surface the CLI (or any other front end) talks
//! to. It owns the [`SizingControls`] that produce the policy and the
//! [`Registry`] that is sized against it, and it is the only place the two
//! meet: every policy edit runs through [`Session::update`], which applies the
//! edit to the controls and then hands the resulting policy to
//! [`Registry::set_policy`] for the invalidation sweep. Nothing else ever
//! writes the registry's policy.
//!
//! All methods take `&self`; the state sits behind a `parking_lot::Mutex` so a
//! session can be shared across threads (the batch processor releases the
//! lock while the codec runs, so edits and snapshots stay responsive during a
//! pass).

use crate::archive::{self, ArchiveError, PackageWriter};
use crate::batch::{self, BatchError, BatchEvent, BatchSummary};
use crate::imaging::{Dimensions, ImageBackend, OutputFormat, Quality, ResizePolicy, Rotation};
use crate::presets::{PresetError, PresetSelection, SizingControls};
use crate::registry::{ItemId, ItemSnapshot, Registry, RegistryError, SourceFile, Turn};
use crate::stats::BatchStats;
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use tracing::{debug, info};

#[derive(Debug)]
struct SessionState {
    controls: SizingControls,
    registry: Registry,
}

#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
    pass_active: AtomicBool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SizingControls::default())
    }
}

impl Session {
    pub fn new(controls: SizingControls) -> Self {
        let registry = Registry::new(controls.policy());
        Self {
            state: Mutex::new(SessionState { controls, registry }),
            pass_active: AtomicBool::new(false),
        }
    }

    pub fn with_policy(policy: ResizePolicy) -> Self {
        Self::new(SizingControls::new(policy))
    }

    pub fn policy(&self) -> ResizePolicy {
        self.state.lock().controls.policy()
    }

    pub fn controls(&self) -> SizingControls {
        self.state.lock().controls.clone()
    }

    pub fn snapshot(&self) -> Vec<ItemSnapshot> {
        self.state.lock().registry.snapshot()
    }

    pub fn stats(&self) -> BatchStats {
        let state = self.state.lock();
        BatchStats::from_snapshot(&state.registry.snapshot(), &state.controls.policy())
    }

    pub fn ingest(&self, source: SourceFile) -> ItemId {
        self.state.lock().registry.ingest(source)
    }

    // =========================================================================
    // Policy edits
    // =========================================================================

    /// Apply one edit to the sizing controls, then sweep the registry.
    fn update<T>(&self, edit: impl FnOnce(&mut SizingControls) -> T) -> (T, usize) {
        let mut state = self.state.lock();
        let value = edit(&mut state.controls);
        let policy = state.controls.policy();
        let invalidated = state.registry.set_policy(policy);
        if invalidated > 0 {
            info!(invalidated, "policy change invalidated encoded results");
        }
        (value, invalidated)
    }

    /// Replace the policy. Returns how many encoded results were discarded.
    pub fn set_policy(&self, policy: ResizePolicy) -> usize {
        self.update(|controls| controls.set_policy(policy)).1
    }

    pub fn select_preset(&self, name: &str) -> Result<PresetSelection, PresetError> {
        self.update(|controls| controls.select_preset(name)).0
    }

    pub fn select_aspect_ratio(&self, name: &str) -> Result<(), PresetError> {
        self.update(|controls| controls.select_aspect_ratio(name)).0
    }

    pub fn clear_aspect_ratio(&self) {
        self.update(SizingControls::clear_aspect_ratio);
    }

    pub fn set_width(&self, width: i64) -> usize {
        self.update(|controls| controls.set_width(width)).1
    }

    pub fn set_height(&self, height: i64) -> usize {
        self.update(|controls| controls.set_height(height)).1
    }

    pub fn set_maintain_aspect_ratio(&self, on: bool) -> usize {
        self.update(|controls| controls.set_maintain_aspect_ratio(on)).1
    }

    pub fn set_quality(&self, quality: Quality) -> usize {
        self.update(|controls| controls.set_quality(quality)).1
    }

    pub fn set_output_format(&self, format: OutputFormat) -> usize {
        self.update(|controls| controls.set_output_format(format)).1
    }

    // =========================================================================
    // Item edits
    // =========================================================================

    pub fn rotate_item(&self, id: ItemId, turn: Turn) -> Result<Rotation, RegistryError> {
        self.state.lock().registry.rotate(id, turn)
    }

    pub fn set_item_rotation(&self, id: ItemId, rotation: Rotation) -> Result<(), RegistryError> {
        self.state.lock().registry.set_rotation(id, rotation)
    }

    pub fn set_item_override(
        &self,
        id: ItemId,
        size_override: Option<Dimensions>,
    ) -> Result<(), RegistryError> {
        self.state.lock().registry.set_override(id, size_override)
    }

    pub fn remove_item(&self, id: ItemId) -> Result<(), RegistryError> {
        let removed = self.state.lock().registry.remove(id)?;
        // Source and result buffers go with the item.
        drop(removed);
        Ok(())
    }

    pub fn clear_all(&self) -> usize {
        let removed = self.state.lock().registry.clear();
        debug!(removed, "cleared all items");
        removed
    }

    // =========================================================================
    // Processing and packaging
    // =========================================================================

    pub fn process_all(
        &self,
        backend: &impl ImageBackend,
        events: Option<&Sender<BatchEvent>>,
    ) -> Result<BatchSummary, BatchError> {
        batch::process_all(self, backend, events)
    }

    /// Package every completed item under `archive_name/`.
    ///
    /// Entries are planned under the lock; the writer runs without it.
    pub fn build_archive(
        &self,
        archive_name: &str,
        writer: &dyn PackageWriter,
    ) -> Result<Vec<u8>, ArchiveError> {
        let plan = {
            let state = self.state.lock();
            let extension = state.controls.policy().output_format.extension();
            archive::plan_archive(&state.registry, archive_name, extension)
        };
        archive::write_plan(&plan, writer)
    }

    pub fn completed_count(&self) -> usize {
        self.state.lock().registry.completed().count()
    }

    pub(crate) fn pass_flag(&self) -> &AtomicBool {
        &self.pass_active
    }

    pub(crate) fn with_registry<T>(&self, read: impl FnOnce(&Registry) -> T) -> T {
        read(&self.state.lock().registry)
    }

    pub(crate) fn with_registry_mut<T>(&self, write: impl FnOnce(&mut Registry) -> T) -> T {
        write(&mut self.state.lock().registry)
    }
}
