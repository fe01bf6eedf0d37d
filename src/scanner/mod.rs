//! Scanner module: driving the scan device and collecting what it produced.
//!
//! # Architecture
//!
//! - [`ScanDriver`]: the seam to the external scan program. [`ScanimageDriver`]
//!   is the SANE `scanimage` implementation.
//! - [`device`]: parsing of device and option listings for auto-discovery.
//! - [`collector`]: gathering one invocation's raster batch from the output directory.
//!
//! # Example
//!
//! ```no_run
//! use batchscan::scanner::{BatchParams, PageCollector, ScanDriver, ScanRequest, ScanimageDriver};
//! use batchscan::config::ScanSettings;
//! use std::path::Path;
//!
//! let driver = ScanimageDriver::new("scanimage");
//! let request = ScanRequest::new(
//!     &ScanSettings::default(),
//!     Path::new("/tmp/brscan/brscan-1700000000-part-%03d.pnm").into(),
//!     BatchParams::sequential(),
//! );
//! driver.scan(&request).unwrap();
//!
//! let pages = PageCollector::for_session("brscan", 1_700_000_000)
//!     .unwrap()
//!     .collect(Path::new("/tmp/brscan"))
//!     .unwrap();
//! ```

pub mod collector;
pub mod device;
pub mod scanimage;

use std::path::PathBuf;

use crate::config::ScanSettings;

pub use collector::{collect, CollectError, PageCollector};
pub use scanimage::ScanimageDriver;

/// Scan area and page size, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanGeometry {
    /// Left offset.
    pub left: u32,
    /// Top offset.
    pub top: u32,
    /// Scan area width.
    pub x: u32,
    /// Scan area height.
    pub y: u32,
    /// Page width.
    pub width: u32,
    /// Page height.
    pub height: u32,
}

/// Batch numbering for one scan pass.
///
/// The scan driver names the n-th captured sheet `start + n * increment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchParams {
    /// Scan the whole feeder instead of a single sheet.
    pub enabled: bool,
    /// Index of the first captured sheet.
    pub start: i64,
    /// Signed step between consecutive sheets.
    pub increment: i64,
}

impl BatchParams {
    /// Pages 1, 2, 3, ...
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            enabled: true,
            start: 1,
            increment: 1,
        }
    }

    /// Front sides of a manual duplex stack: 1, 3, 5, ...
    #[must_use]
    pub fn odd() -> Self {
        Self {
            enabled: true,
            start: 1,
            increment: 2,
        }
    }

    /// Back sides of the flipped stack: `total`, `total - 2`, ..., 2.
    #[must_use]
    pub fn even(total_pages: usize) -> Self {
        Self {
            enabled: true,
            start: i64::try_from(total_pages).unwrap_or(i64::MAX),
            increment: -2,
        }
    }

    /// Batch index of the n-th captured sheet (0-based).
    #[must_use]
    pub fn index_of(&self, sheet: usize) -> i64 {
        let sheet = i64::try_from(sheet).unwrap_or(i64::MAX);
        self.start + sheet * self.increment
    }
}

/// Everything the scan driver needs for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Device identifier; the driver default is used when `None`.
    pub device: Option<String>,
    /// Scan area and page size.
    pub geometry: ScanGeometry,
    /// Resolution in dpi.
    pub resolution: u32,
    /// Color mode.
    pub mode: Option<String>,
    /// Document source.
    pub source: Option<String>,
    /// Output path containing a `%03d` part placeholder.
    pub template: PathBuf,
    /// Batch numbering.
    pub batch: BatchParams,
}

impl ScanRequest {
    /// Build a request from the configured scan settings.
    #[must_use]
    pub fn new(settings: &ScanSettings, template: PathBuf, batch: BatchParams) -> Self {
        Self {
            device: settings.device.clone(),
            geometry: ScanGeometry {
                left: settings.left,
                top: settings.top,
                x: settings.x,
                y: settings.y,
                width: settings.width,
                height: settings.height,
            },
            resolution: settings.resolution,
            mode: settings.mode.clone(),
            source: settings.source.clone(),
            template,
            batch,
        }
    }
}

/// The external program that captures pages.
pub trait ScanDriver {
    /// Run one scan pass and wait for it to finish.
    fn scan(&self, request: &ScanRequest) -> Result<(), ScanError>;

    /// Human-readable command line, logged instead of scanning on dry runs.
    fn command_line(&self, request: &ScanRequest) -> String {
        format!("{request:?}")
    }
}

/// Errors that can occur while running the scan driver.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The scan program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The scan program exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        /// Program that failed
        program: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },
}
