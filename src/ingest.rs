//! File ingestion: turn command-line paths into registered sources.
//!
//! Inputs may be files or directories. Directories are walked recursively in
//! file-name order and only files with an accepted extension are picked up;
//! anything else inside them is ignored. A file named explicitly with another
//! extension is rejected, so the user hears about it.
//!
//! Reading and identifying runs on the rayon pool. Results come back in input
//! order, so items are registered in the order the user gave them no matter
//! which file finished first.
//!
//! A file that cannot be read or identified is reported as a [`Rejection`]
//! and never becomes an item.

use crate::imaging::{BackendError, ImageBackend, supported_input_extensions};
use crate::registry::SourceFile;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read image: {0}")]
    Backend(#[from] BackendError),
    #[error("Unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),
}

/// A path that did not make it into the session, and why.
#[derive(Debug)]
pub struct Rejection {
    pub path: PathBuf,
    pub error: IngestError,
}

/// Outcome of loading a set of inputs.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub accepted: Vec<SourceFile>,
    pub rejected: Vec<Rejection>,
}

/// Whether the file extension is one we accept (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    supported_input_extensions().contains(&ext.as_str())
}

/// Expand inputs into candidate image files.
pub fn collect_image_paths(inputs: &[PathBuf]) -> (Vec<PathBuf>, Vec<Rejection>) {
    let mut paths = Vec::new();
    let mut rejected = Vec::new();

    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_supported(entry.path()) => {
                        paths.push(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| input.clone());
                        rejected.push(Rejection {
                            path,
                            error: IngestError::Io(e.into()),
                        });
                    }
                }
            }
        } else if is_supported(input) {
            paths.push(input.clone());
        } else {
            rejected.push(Rejection {
                path: input.clone(),
                error: IngestError::Unsupported(input.clone()),
            });
        }
    }

    (paths, rejected)
}

/// Read one file and identify its dimensions.
pub fn read_source(backend: &impl ImageBackend, path: &Path) -> Result<SourceFile, IngestError> {
    if !is_supported(path) {
        return Err(IngestError::Unsupported(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let original_size = backend.identify(&bytes)?;
    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    debug!(path = %path.display(), %original_size, "read source");
    Ok(SourceFile {
        display_name,
        bytes: Arc::from(bytes),
        original_size,
    })
}

/// Collect, read and identify every input. Accepted sources keep input order.
pub fn load_sources(backend: &impl ImageBackend, inputs: &[PathBuf]) -> IngestReport {
    let (paths, mut rejected) = collect_image_paths(inputs);

    let results: Vec<(PathBuf, Result<SourceFile, IngestError>)> = paths
        .into_par_iter()
        .map(|path| {
            let result = read_source(backend, &path);
            (path, result)
        })
        .collect();

    let mut accepted = Vec::with_capacity(results.len());
    for (path, result) in results {
        match result {
            Ok(source) => accepted.push(source),
            Err(error) => rejected.push(Rejection { path, error }),
        }
    }
    for rejection in &rejected {
        warn!(path = %rejection.path.display(), error = %rejection.error, "input rejected");
    }

    IngestReport { accepted, rejected }
}
