//! Archive packager: completed results bundled into one zip.
//!
//! Packaging is split in two so the registry lock is never held while bytes
//! are written:
//!
//! 1. [`plan_archive`] reads the registry and produces an [`ArchivePlan`]:
//!    the sanitized top-level folder plus one entry per `Completed` item,
//!    named by [`crate::naming`], with the encoded bytes shared (not copied)
//!    out of the registry.
//! 2. A [`PackageWriter`] turns that plan into archive bytes. The folder is
//!    written even when there are no entries.
//!
//! Neither step mutates the registry, so a failed build can simply be
//! retried.
//!
//! ## Layout
//!
//! ```text
//! resized-images/
//! ├── dawn.jpeg
//! ├── dusk-2.jpeg
//! └── dusk-5.jpeg
//! ```

use crate::naming::{sanitize_folder_name, unique_entry_names};
use crate::registry::{ItemId, Registry};
use std::io::{Cursor, Write};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Package writer failed: {0}")]
    Writer(String),
}

/// One file inside the archive. `path` includes the top-level folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub item: ItemId,
    pub path: String,
    pub bytes: Arc<[u8]>,
}

/// Everything a writer needs: the folder and its ordered entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePlan {
    pub folder: String,
    pub entries: Vec<ArchiveEntry>,
}

/// Package-writer collaborator: ordered entries in, archive bytes out.
pub trait PackageWriter {
    fn build(&self, plan: &ArchivePlan) -> Result<Vec<u8>, ArchiveError>;
}

/// Zip writer with stored (uncompressed) entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackageWriter;

impl PackageWriter for ZipPackageWriter {
    fn build(&self, plan: &ArchivePlan) -> Result<Vec<u8>, ArchiveError> {
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

        zip.add_directory(format!("{}/", plan.folder), options)?;
        for entry in &plan.entries {
            zip.start_file(entry.path.as_str(), options)?;
            zip.write_all(&entry.bytes)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

/// Folder and entries for every completed item, in registry order.
pub fn plan_archive(registry: &Registry, archive_name: &str, extension: &str) -> ArchivePlan {
    let folder = sanitize_folder_name(archive_name);
    let completed: Vec<_> = registry.completed().collect();
    let names: Vec<(ItemId, &str)> = completed
        .iter()
        .map(|(item, _)| (item.id(), item.display_name()))
        .collect();

    let entries = unique_entry_names(&names, extension)
        .into_iter()
        .zip(&completed)
        .map(|(file_name, (item, result))| ArchiveEntry {
            item: item.id(),
            path: format!("{folder}/{file_name}"),
            bytes: result.share(),
        })
        .collect();
    ArchivePlan { folder, entries }
}

/// Plan and write in one step. The registry is only read.
pub fn build_archive(
    registry: &Registry,
    archive_name: &str,
    extension: &str,
    writer: &dyn PackageWriter,
) -> Result<Vec<u8>, ArchiveError> {
    let plan = plan_archive(registry, archive_name, extension);
    write_plan(&plan, writer)
}

pub(crate) fn write_plan(
    plan: &ArchivePlan,
    writer: &dyn PackageWriter,
) -> Result<Vec<u8>, ArchiveError> {
    let bytes = writer.build(plan)?;
    info!(folder = %plan.folder, entries = plan.entries.len(), bytes = bytes.len(), "archive built");
    Ok(bytes)
}
