//! Removal of raw rasters and leftover scratch files.
//!
//! # Overview
//!
//! - [`remove_files`]: delete an explicit list of files (raw rasters after a
//!   fully successful conversion)
//! - [`clear_directory`]: delete every regular file directly inside the output
//!   directory once a document has been compiled
//!
//! Both keep going after individual failures and report them in a
//! [`CleanupResult`]; nothing here aborts a session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Error type for a single removal.
#[derive(Debug, Error)]
pub enum RemoveError {
    /// File was not found (may have been removed already).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to remove.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RemoveError {
    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Results of a batch removal.
#[derive(Debug, Clone, Default)]
pub struct CleanupResult {
    /// Successfully removed files.
    pub removed: Vec<PathBuf>,
    /// Failed removals with their errors.
    pub failures: Vec<(PathBuf, String)>,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl CleanupResult {
    /// Number of removed files.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// Number of failed removals.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if every removal succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!(
                "Removed {} file(s), freed {}",
                self.removed_count(),
                bytesize::ByteSize::b(self.bytes_freed)
            )
        } else {
            format!(
                "Removed {} file(s), {} failed, freed {}",
                self.removed_count(),
                self.failure_count(),
                bytesize::ByteSize::b(self.bytes_freed)
            )
        }
    }

    fn record(&mut self, path: &Path, outcome: Result<u64, RemoveError>) {
        match outcome {
            Ok(size) => {
                self.removed.push(path.to_path_buf());
                self.bytes_freed += size;
            }
            Err(e) => {
                log::warn!("Could not remove {}: {}", path.display(), e);
                self.failures.push((path.to_path_buf(), e.to_string()));
            }
        }
    }
}

/// Remove a single file, returning its size.
pub fn remove_file(path: &Path) -> Result<u64, RemoveError> {
    let size = fs::metadata(path)
        .map_err(|e| RemoveError::from_io(path, e))?
        .len();
    fs::remove_file(path).map_err(|e| RemoveError::from_io(path, e))?;
    log::debug!("Removed {}", path.display());
    Ok(size)
}

/// Remove every file in `paths`, continuing past failures.
pub fn remove_files(paths: &[PathBuf]) -> CleanupResult {
    let mut result = CleanupResult::default();
    for path in paths {
        result.record(path, remove_file(path));
    }
    result
}

/// Remove every regular file directly inside `dir` except those in `keep`.
/// Subdirectories are left alone.
pub fn clear_directory(dir: &Path, keep: &[PathBuf]) -> CleanupResult {
    let mut result = CleanupResult::default();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        match entry {
            Ok(entry) if entry.file_type().is_file() && !keep.iter().any(|k| k == entry.path()) => {
                result.record(entry.path(), remove_file(entry.path()));
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                log::warn!("Could not read {}: {}", path.display(), e);
                result.failures.push((path, e.to_string()));
            }
        }
    }
    result
}
