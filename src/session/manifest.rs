//! The odd-page manifest: the only state that outlives an invocation.
//!
//! After the odd phase the converted page paths are written to
//! `<output_dir>/.<prefix>-odd-filelist`. Its presence means an even phase is
//! pending for that directory; its absence means none is.
//!
//! The file is a JSON envelope holding a SHA256 checksum of the compact record,
//! so a truncated or hand-edited manifest is detected instead of misread. Writes
//! go to a temporary file in the same directory that is then renamed over the
//! manifest.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::data::Phase;

/// Current version of the manifest format.
pub const MANIFEST_VERSION: u32 = 1;

/// Converted odd pages awaiting their even counterparts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddPageManifest {
    /// Format version.
    pub version: u32,
    /// Phase that produced the listed files.
    pub phase: Phase,
    /// When the odd phase finished.
    pub created_at: DateTime<Utc>,
    /// Absolute paths of the converted odd pages, in page order.
    pub files: Vec<PathBuf>,
}

/// Envelope for manifest files to include an integrity check.
#[derive(Debug, Serialize, Deserialize)]
struct ManifestEnvelope {
    /// SHA256 checksum of the compact serialized manifest.
    checksum: String,
    /// The actual manifest.
    manifest: OddPageManifest,
}

/// Errors that can occur while reading or writing a manifest.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// The manifest could not be read.
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        /// Manifest path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The manifest could not be written.
    #[error("Failed to write manifest {path}: {source}")]
    Write {
        /// Manifest path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The manifest is not a valid envelope.
    #[error("Failed to parse manifest {path}: {source}")]
    Parse {
        /// Manifest path
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The manifest could not be serialized.
    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The stored checksum does not match the record.
    #[error("Manifest integrity check failed: checksum mismatch in {0}")]
    Checksum(PathBuf),

    /// The record was written by an incompatible version.
    #[error("Unsupported manifest version {found} in {path}; current version is {}", MANIFEST_VERSION)]
    Version {
        /// Manifest path
        path: PathBuf,
        /// Version found in the file
        found: u32,
    },

    /// The record does not describe an odd phase.
    #[error("Manifest {path} was written by the {found} phase, expected odd")]
    Phase {
        /// Manifest path
        path: PathBuf,
        /// Phase found in the file
        found: Phase,
    },
}

impl OddPageManifest {
    /// Manifest for the given converted odd pages, stamped now.
    #[must_use]
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            phase: Phase::Odd,
            created_at: Utc::now(),
            files,
        }
    }

    /// Serializes the manifest to a JSON envelope with an integrity checksum.
    pub fn to_json(&self) -> Result<String, ManifestError> {
        let envelope = ManifestEnvelope {
            checksum: self.checksum()?,
            manifest: self.clone(),
        };
        serde_json::to_string_pretty(&envelope).map_err(ManifestError::Serialize)
    }

    fn checksum(&self) -> Result<String, ManifestError> {
        // Compact form; must match what load() re-serializes
        let compact = serde_json::to_string(self).map_err(ManifestError::Serialize)?;
        let mut hasher = Sha256::new();
        hasher.update(compact.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Atomically write the manifest to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let json = self.to_json()?;
        let write_err = |source: io::Error| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        log::debug!("Wrote manifest {} ({} files)", path.display(), self.files.len());
        Ok(())
    }

    /// Loads a manifest and verifies its integrity, version and phase.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let envelope: ManifestEnvelope =
            serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let manifest = envelope.manifest;
        if manifest.checksum()? != envelope.checksum {
            return Err(ManifestError::Checksum(path.to_path_buf()));
        }
        if manifest.version != MANIFEST_VERSION {
            return Err(ManifestError::Version {
                path: path.to_path_buf(),
                found: manifest.version,
            });
        }
        if manifest.phase != Phase::Odd {
            return Err(ManifestError::Phase {
                path: path.to_path_buf(),
                found: manifest.phase,
            });
        }
        Ok(manifest)
    }

    /// Split the listed files into those that still exist and those that don't,
    /// both in listed order.
    #[must_use]
    pub fn partition_existing(&self) -> (Vec<PathBuf>, Vec<PathBuf>) {
        self.files.iter().cloned().partition(|f| f.exists())
    }
}

/// What is on disk at a manifest location.
#[derive(Debug)]
pub enum ManifestState {
    /// No manifest: no odd phase is pending.
    Absent,
    /// A valid manifest with at least one existing page.
    Pending {
        /// The loaded manifest
        manifest: OddPageManifest,
        /// Listed pages that exist, in page order
        existing: Vec<PathBuf>,
        /// Listed pages that are gone
        missing: Vec<PathBuf>,
    },
    /// A valid manifest none of whose pages exist.
    Stale {
        /// The loaded manifest
        manifest: OddPageManifest,
    },
    /// A manifest that cannot be used.
    Corrupt(ManifestError),
}

/// Inspect the manifest at `path` without changing anything.
#[must_use]
pub fn inspect(path: &Path) -> ManifestState {
    match OddPageManifest::load(path) {
        Err(ManifestError::Read { ref source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            ManifestState::Absent
        }
        Err(e) => ManifestState::Corrupt(e),
        Ok(manifest) => {
            let (existing, missing) = manifest.partition_existing();
            if existing.is_empty() {
                ManifestState::Stale { manifest }
            } else {
                ManifestState::Pending {
                    manifest,
                    existing,
                    missing,
                }
            }
        }
    }
}

/// Remove the manifest at `path`. Returns `Ok(false)` when there was none.
pub fn discard(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed manifest {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
