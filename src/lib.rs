//! # Batch Resize
//!
//! Resize a batch of raster images to one shared policy, rotate individual
//! images, and package the results into a single zip.
//!
//! # Architecture: Session, Pass, Package
//!
//! ```text
//! 1. Ingest    paths     →  Session      (read, identify, register as Pending)
//! 2. Process   Session   →  Completed    (one sequential encode pass)
//! 3. Package   Completed →  archive.zip  (stem + current extension, one folder)
//! ```
//!
//! Between those steps the user (or the CLI flags) edits the policy and
//! individual items. Every edit goes through the [`session::Session`], which
//! recomputes target sizes and invalidates encoded results that no longer
//! match, so a pass always brings the batch back in line with the latest
//! settings.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Geometry engine, value types, and the `image`-crate codec behind [`imaging::ImageBackend`] |
//! | [`presets`] | Preset catalog, aspect-ratio shortcuts, and the [`presets::SizingControls`] editor state |
//! | [`registry`] | Tracked items and their `Pending → Processing → Completed / Error` state machine |
//! | [`session`] | Controlling component: owns controls + registry, funnels every edit |
//! | [`batch`] | Sequential encode pass with progress events |
//! | [`archive`] | Entry planning and the zip [`archive::PackageWriter`] |
//! | [`naming`] | Entry stems, collision suffixes, and folder-name sanitizing |
//! | [`ingest`] | Path expansion, reading, and identification on the rayon pool |
//! | [`stats`] | Totals and savings for the summary |
//! | [`config`] | `resize.toml` loading, validation, and CLI overrides |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Funnel for Policy Edits
//!
//! The policy lives in exactly one place, the session's sizing controls, and
//! is copied into the registry only by [`session::Session`]'s update step.
//! That step always runs the invalidation sweep, so there is no way to change
//! a size, ratio lock, quality, or format and forget to drop stale results.
//!
//! ## Status as a Closed Enum
//!
//! [`registry::ItemState`] carries the encoded bytes inside its `Completed`
//! variant. "Has a result" and "is completed" cannot disagree, and every
//! transition is an exhaustive `match`.
//!
//! ## Revisions Instead of Cancellation
//!
//! A pass never interrupts an in-flight encode. Each item carries a revision
//! that every recompute bumps; a result whose revision no longer matches is
//! dropped and the item returns to `Pending`. The last policy wins, and the
//! next pass picks the item up again.
//!
//! ## Logical Size, Physical Rotation
//!
//! An item's target size is always the unrotated box. The codec turns the
//! source and draws it into a canvas with swapped axes, so a 90° item
//! labelled `800×600` is encoded as a `600×800` image.
//!
//! ## Self-Contained Imaging
//!
//! Decoding, resampling (Lanczos3), rotation and encoding use the `image`
//! crate, with libwebp (vendored by the `webp` crate) for lossy WebP. No
//! system libraries: the binary is self-contained.

pub mod archive;
pub mod batch;
pub mod config;
pub mod imaging;
pub mod ingest;
pub mod naming;
pub mod output;
pub mod presets;
pub mod registry;
pub mod session;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_helpers;
