//! Collection of one invocation's raster batch from the output directory.
//!
//! # Overview
//!
//! The scan driver writes `<prefix>-<timestamp>-part-<NNN>.pnm` files into the
//! output directory. [`PageCollector`] finds the files of the current session
//! and returns them ordered by part index. An empty result is a normal outcome
//! (the feeder was empty); a missing directory is reported as an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::naming;

/// Errors that can occur while collecting scanned pages.
#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    /// The output directory does not exist.
    #[error("Output directory not found: {0}")]
    NotFound(PathBuf),

    /// The output path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The directory could not be read.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Finds the raster pages of one scan session.
#[derive(Debug, Clone)]
pub struct PageCollector {
    pattern: Regex,
}

impl PageCollector {
    /// Collector for pages named after `prefix` and the session `timestamp`.
    pub fn for_session(prefix: &str, timestamp: i64) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: naming::raster_pattern(prefix, timestamp)?,
        })
    }

    /// The file-name pattern in use.
    #[must_use]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Collect matching pages in `directory`, ordered by part index.
    pub fn collect(&self, directory: &Path) -> Result<Vec<PathBuf>, CollectError> {
        collect(directory, &self.pattern)
    }
}

/// Collect files directly inside `directory` whose names match `pattern`.
///
/// When the pattern has a capture group holding a number, files are ordered by
/// that number; otherwise by file name.
pub fn collect(directory: &Path, pattern: &Regex) -> Result<Vec<PathBuf>, CollectError> {
    match fs::metadata(directory) {
        Ok(meta) if !meta.is_dir() => {
            return Err(CollectError::NotADirectory(directory.to_path_buf()))
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CollectError::NotFound(directory.to_path_buf()))
        }
        Err(source) => {
            return Err(CollectError::Io {
                path: directory.to_path_buf(),
                source,
            })
        }
    }

    let mut pages: Vec<(Option<u64>, PathBuf)> = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| CollectError::Io {
            path: e
                .path()
                .map_or_else(|| directory.to_path_buf(), Path::to_path_buf),
            source: e
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("directory walk failed")),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if let Some(captures) = pattern.captures(name) {
            let index = captures.get(1).and_then(|m| m.as_str().parse().ok());
            pages.push((index, entry.into_path()));
        }
    }

    pages.sort();
    log::trace!("Collected {} file(s) from {}", pages.len(), directory.display());
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}
