//! Data structures for one scan invocation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{Config, DuplexMode};
use crate::naming;
use crate::scanner::PageCollector;

/// Which part of a document an invocation captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Front sides of a manual duplex stack.
    Odd,
    /// Back sides of the flipped stack.
    Even,
    /// Everything in one pass (simplex or device duplex).
    Single,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Odd => write!(f, "odd"),
            Phase::Even => write!(f, "even"),
            Phase::Single => write!(f, "single"),
        }
    }
}

/// One invocation's scan, discarded when the process exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSession {
    /// Scratch directory receiving this run's pages.
    pub output_dir: PathBuf,
    /// File-name prefix.
    pub prefix: String,
    /// Seconds since the epoch; groups this run's files.
    pub timestamp: i64,
    /// Phase selected for this run.
    pub phase: Phase,
    /// Configured duplex mode.
    pub duplex: DuplexMode,
}

impl ScanSession {
    /// Create a session for `phase` from the configuration.
    #[must_use]
    pub fn new(config: &Config, timestamp: i64, phase: Phase) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            prefix: config.prefix.clone(),
            timestamp,
            phase,
            duplex: config.duplex,
        }
    }

    /// Output template handed to the scan driver.
    #[must_use]
    pub fn raster_template(&self) -> PathBuf {
        naming::raster_template(&self.output_dir, &self.prefix, self.timestamp)
    }

    /// Collector for this session's raster batch.
    pub fn collector(&self) -> Result<PageCollector, regex::Error> {
        PageCollector::for_session(&self.prefix, self.timestamp)
    }
}
