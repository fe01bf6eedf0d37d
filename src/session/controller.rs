//! The duplex session state machine.
//!
//! Each invocation runs exactly one protocol:
//!
//! | Manifest on disk            | Protocol   | Scan numbering          |
//! |-----------------------------|------------|-------------------------|
//! | (duplex off or auto)        | `Single`   | 1, 2, 3, ...            |
//! | none                        | `RunOdd`   | 1, 3, 5, ...            |
//! | lists N existing pages      | `RunEven`  | 2N, 2N-2, ..., 2        |
//! | lists no existing page, or is corrupt | discarded, `RunOdd` |    |
//!
//! The odd phase ends by writing the manifest. The even phase ends by removing
//! it, whether the pages could be interleaved or not, so the next invocation
//! starts a new document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;

use super::data::{Phase, ScanSession};
use super::interleave::interleave;
use super::manifest::{self, ManifestState, OddPageManifest};
use crate::actions::{
    clear_directory, remove_files, Conversion, Notification, Notifier, PdfAssembler, PdfConverter,
};
use crate::config::{Config, DuplexMode};
use crate::logging::LOG_FILE_NAME;
use crate::naming;
use crate::scanner::{BatchParams, CollectError, ScanDriver, ScanRequest};

/// The external tools a session drives.
#[derive(Clone, Copy)]
pub struct Toolchain<'a> {
    /// Captures raster pages.
    pub scanner: &'a dyn ScanDriver,
    /// Converts rasters to PDF pages.
    pub converter: &'a dyn PdfConverter,
    /// Concatenates PDF pages.
    pub assembler: &'a dyn PdfAssembler,
    /// Announces compiled documents; `None` disables notifications.
    pub notifier: Option<&'a dyn Notifier>,
}

impl std::fmt::Debug for Toolchain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain")
            .field("notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}

/// The protocol selected for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    /// One pass, no manifest.
    Single,
    /// Capture front sides and store them in the manifest.
    RunOdd,
    /// Capture back sides and merge them with the stored front sides.
    RunEven {
        /// Odd pages from the manifest that still exist, in page order
        odd_files: Vec<PathBuf>,
    },
}

impl Protocol {
    /// Phase this protocol scans.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Single => Phase::Single,
            Self::RunOdd => Phase::Odd,
            Self::RunEven { .. } => Phase::Even,
        }
    }

    /// Total page count of the document, when known before scanning.
    #[must_use]
    pub fn expected_pages(&self) -> Option<usize> {
        match self {
            Self::RunEven { odd_files } => Some(odd_files.len() * 2),
            Self::Single | Self::RunOdd => None,
        }
    }

    /// Batch numbering for the scan driver.
    #[must_use]
    pub fn batch(&self) -> BatchParams {
        match self {
            Self::Single => BatchParams::sequential(),
            Self::RunOdd => BatchParams::odd(),
            Self::RunEven { odd_files } => BatchParams::even(odd_files.len() * 2),
        }
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The scan command was logged, nothing was run.
    DryRun {
        /// Phase that would have run
        phase: Phase,
        /// Command that would have run
        command: String,
    },
    /// The scan driver failed; nothing else was done.
    ScanFailed {
        /// Phase that was running
        phase: Phase,
        /// Driver error
        error: String,
    },
    /// The scan driver produced no pages.
    NothingScanned {
        /// Phase that was running
        phase: Phase,
    },
    /// Pages were scanned but none could be converted; rasters are kept.
    ConversionFailed {
        /// Phase that was running
        phase: Phase,
        /// Number of raster pages left on disk
        scanned: usize,
    },
    /// The odd phase finished and the manifest was written.
    OddPagesStored {
        /// Manifest location
        manifest: PathBuf,
        /// Number of odd pages recorded
        pages: usize,
        /// Whether every scanned page was converted
        complete: bool,
    },
    /// A document was compiled into the export directory.
    Compiled {
        /// Compiled document
        document: PathBuf,
        /// Page count
        pages: usize,
        /// Whether odd and even pages were merged
        interleaved: bool,
        /// Whether every scanned page was converted
        complete: bool,
    },
    /// Pages were converted but the phase could not finish; files are kept.
    Incomplete {
        /// Phase that was running
        phase: Phase,
        /// Number of converted pages
        pages: usize,
        /// What went wrong
        error: String,
    },
}

/// Converted pages of one scan pass.
struct Captured {
    pages: Vec<PathBuf>,
    complete: bool,
}

/// Runs one invocation of the scan workflow.
#[derive(Debug)]
pub struct DuplexSessionController<'a> {
    config: &'a Config,
    tools: Toolchain<'a>,
    timestamp: i64,
}

impl<'a> DuplexSessionController<'a> {
    /// Controller for an invocation whose files are grouped under `timestamp`.
    #[must_use]
    pub fn new(config: &'a Config, tools: Toolchain<'a>, timestamp: i64) -> Self {
        Self {
            config,
            tools,
            timestamp,
        }
    }

    /// Select and run this invocation's protocol.
    pub fn run(&self) -> SessionOutcome {
        let protocol = self.resolve_protocol();
        self.execute(protocol)
    }

    /// Decide which protocol this invocation runs.
    ///
    /// Discards a manifest that lists no existing page or cannot be read.
    pub fn resolve_protocol(&self) -> Protocol {
        if self.config.duplex != DuplexMode::Manual {
            log::info!("Running in single side mode (duplex {})", self.config.duplex);
            return Protocol::Single;
        }

        let path = self.config.manifest_path();
        match manifest::inspect(&path) {
            ManifestState::Absent => Protocol::RunOdd,
            ManifestState::Pending {
                manifest,
                existing,
                missing,
            } => {
                log::info!("Found odd files list {}", path.display());
                log::debug!("Odd files: {:?}", manifest.files);
                for file in &missing {
                    log::warn!("File missing from the odd files list: {}", file.display());
                }
                if !missing.is_empty() {
                    log::warn!(
                        "Continuing with {} of {} odd page(s)",
                        existing.len(),
                        manifest.files.len()
                    );
                }
                Protocol::RunEven {
                    odd_files: existing,
                }
            }
            ManifestState::Stale { manifest } => {
                log::warn!(
                    "None of the {} file(s) in the odd files list exist; starting a new session",
                    manifest.files.len()
                );
                discard_manifest(&path);
                Protocol::RunOdd
            }
            ManifestState::Corrupt(e) => {
                log::warn!("{e}; starting a new session");
                discard_manifest(&path);
                Protocol::RunOdd
            }
        }
    }

    /// Run `protocol` to completion.
    pub fn execute(&self, protocol: Protocol) -> SessionOutcome {
        let session = ScanSession::new(self.config, self.timestamp, protocol.phase());
        let batch = protocol.batch();
        match protocol {
            Protocol::Single => {
                let captured = match self.capture(&session, batch) {
                    Ok(captured) => captured,
                    Err(outcome) => return outcome,
                };
                self.compile(Phase::Single, captured.pages, false, captured.complete)
            }
            Protocol::RunOdd => {
                log::info!("Scanning odd pages");
                match self.capture(&session, batch) {
                    Ok(captured) => self.store_odd_pages(captured),
                    Err(outcome) => outcome,
                }
            }
            Protocol::RunEven { odd_files } => {
                log::info!(
                    "Scanning even pages ({} page document expected)",
                    odd_files.len() * 2
                );
                match self.capture(&session, batch) {
                    Ok(captured) => self.merge_even_pages(odd_files, captured),
                    Err(outcome) => outcome,
                }
            }
        }
    }

    /// Scan, collect and convert one pass. Raw rasters are removed only when
    /// every one of them was converted.
    fn capture(&self, session: &ScanSession, batch: BatchParams) -> Result<Captured, SessionOutcome> {
        let phase = session.phase;
        let request = ScanRequest::new(&self.config.scan, session.raster_template(), batch);

        if self.config.dry_run {
            let command = self.tools.scanner.command_line(&request);
            log::info!("Dry run, not scanning: {command}");
            return Err(SessionOutcome::DryRun { phase, command });
        }

        let started = Instant::now();
        if let Err(e) = self.tools.scanner.scan(&request) {
            log::error!("Scan failed: {e}");
            return Err(SessionOutcome::ScanFailed {
                phase,
                error: e.to_string(),
            });
        }
        let elapsed = started.elapsed();
        if elapsed > Duration::from_secs(self.config.wait_limit_secs) {
            log::warn!(
                "Scan took {}s, longer than the {}s wait limit",
                elapsed.as_secs(),
                self.config.wait_limit_secs
            );
        }

        let scanned = match session.collector() {
            Ok(collector) => collector.collect(&session.output_dir),
            Err(e) => {
                log::error!("Invalid file name pattern for prefix {:?}: {e}", session.prefix);
                return Err(SessionOutcome::ScanFailed {
                    phase,
                    error: e.to_string(),
                });
            }
        };
        let scanned = match scanned {
            Ok(scanned) => scanned,
            Err(e @ (CollectError::NotFound(_) | CollectError::NotADirectory(_))) => {
                log::error!("{e}. Check permissions and/or pathname.");
                return Err(SessionOutcome::NothingScanned { phase });
            }
            Err(e) => {
                log::error!("Error finding scanned files: {e}");
                return Err(SessionOutcome::NothingScanned { phase });
            }
        };
        log::debug!("Scanned files: {scanned:?}");
        log::info!("Scanned {} page(s)", scanned.len());

        if scanned.is_empty() {
            log::warn!("No scanned files found");
            return Err(SessionOutcome::NothingScanned { phase });
        }

        let conversion = self.tools.converter.convert(&scanned);
        let complete = conversion.covers(scanned.len());
        if complete {
            let removed = remove_files(&scanned);
            log::info!("Raw scans: {}", removed.summary());
        } else {
            for (raster, failure) in conversion.failures() {
                log::error!("Not converted: {} ({failure})", raster.display());
            }
            log::warn!(
                "Converted {} of {} page(s); raw scans kept in {} and must be removed manually",
                conversion.converted().len(),
                scanned.len(),
                session.output_dir.display()
            );
        }

        if let Conversion::Failed(_) = conversion {
            return Err(SessionOutcome::ConversionFailed {
                phase,
                scanned: scanned.len(),
            });
        }
        Ok(Captured {
            pages: conversion.into_converted(),
            complete,
        })
    }

    fn store_odd_pages(&self, captured: Captured) -> SessionOutcome {
        let path = self.config.manifest_path();
        let pages = captured.pages.len();
        // The even phase may run from another working directory
        let files = match absolute_paths(&captured.pages) {
            Ok(files) => files,
            Err(e) => {
                log::error!("Cannot resolve odd page paths: {e}");
                return SessionOutcome::Incomplete {
                    phase: Phase::Odd,
                    pages,
                    error: e.to_string(),
                };
            }
        };
        if let Err(e) = OddPageManifest::new(files).save(&path) {
            log::error!("{e}");
            return SessionOutcome::Incomplete {
                phase: Phase::Odd,
                pages,
                error: e.to_string(),
            };
        }
        log::info!(
            "Stored {pages} odd page(s) in {}; flip the stack and scan again",
            path.display()
        );

        if self.config.odd_preview {
            let preview =
                naming::odd_preview_path(&self.config.output_dir, &self.config.prefix, &Local::now());
            match self.tools.assembler.assemble(&captured.pages, &preview) {
                Ok(()) => log::info!("Odd pages preview: {}", preview.display()),
                Err(e) => log::warn!("Could not assemble odd pages preview: {e}"),
            }
        }

        SessionOutcome::OddPagesStored {
            manifest: path,
            pages,
            complete: captured.complete,
        }
    }

    fn merge_even_pages(&self, odd_files: Vec<PathBuf>, captured: Captured) -> SessionOutcome {
        // The driver counted down while capturing, so part numbers ascend in page order
        let mut even_files = captured.pages;
        even_files.sort_by(|a, b| {
            naming::part_index(a)
                .cmp(&naming::part_index(b))
                .then_with(|| a.cmp(b))
        });

        let (pages, interleaved) = match interleave(&odd_files, &even_files) {
            Ok(pages) => (pages, true),
            Err(e) => {
                log::warn!("{e}. Compiling even files alone.");
                (even_files, false)
            }
        };
        log::debug!("Page order: {pages:?}");

        discard_manifest(&self.config.manifest_path());
        self.compile(Phase::Even, pages, interleaved, captured.complete)
    }

    /// Assemble `pages` into the export directory, notify, and clear scratch files.
    fn compile(&self, phase: Phase, pages: Vec<PathBuf>, interleaved: bool, complete: bool) -> SessionOutcome {
        let count = pages.len();
        let document =
            naming::document_path(&self.config.export_dir, &self.config.prefix, &Local::now(), count);

        if let Err(e) = self.tools.assembler.assemble(&pages, &document) {
            log::error!(
                "Failed to compile {}: {e}. Pages kept in {}",
                document.display(),
                self.config.output_dir.display()
            );
            return SessionOutcome::Incomplete {
                phase,
                pages: count,
                error: e.to_string(),
            };
        }
        log_document(&document, count);

        if let Some(notifier) = self.tools.notifier {
            let notification = Notification::document_ready(&self.config.notify, &document, count);
            if let Err(e) = notifier.notify(&notification) {
                log::warn!("Failed to send notification: {e}");
            }
        }

        if complete {
            let keep = [self.config.log_dir.join(LOG_FILE_NAME), document.clone()];
            let cleared = clear_directory(&self.config.output_dir, &keep);
            log::info!("Scratch directory: {}", cleared.summary());
        } else {
            log::warn!(
                "Scratch directory {} kept because some pages were not converted",
                self.config.output_dir.display()
            );
        }

        SessionOutcome::Compiled {
            document,
            pages: count,
            interleaved,
            complete,
        }
    }
}

fn discard_manifest(path: &Path) {
    if let Err(e) = manifest::discard(path) {
        log::error!(
            "Error deleting odd files list {}: {e}. It must be removed manually",
            path.display()
        );
    }
}

fn absolute_paths(paths: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    paths.iter().map(std::path::absolute).collect()
}

fn log_document(document: &Path, pages: usize) {
    match fs::metadata(document) {
        Ok(meta) => log::info!(
            "Compiled {} ({pages} pages, {})",
            document.display(),
            bytesize::ByteSize::b(meta.len())
        ),
        Err(_) => log::info!("Compiled {} ({pages} pages)", document.display()),
    }
}
