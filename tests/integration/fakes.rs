//! Stand-ins for the external tools, driven entirely through the filesystem.

use batchscan::actions::{
    Conversion, Notification, Notifier, NotifyError, PdfAssembler, PdfConverter, ToolFailure,
};
use batchscan::config::{Config, DuplexMode};
use batchscan::naming;
use batchscan::scanner::{ScanDriver, ScanError, ScanRequest};
use batchscan::session::Toolchain;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes one raster per sheet, named the way `scanimage --batch` would.
#[derive(Default)]
pub struct FakeScanner {
    pub sheets: Cell<usize>,
    pub fail: Cell<bool>,
    pub requests: RefCell<Vec<ScanRequest>>,
}

impl FakeScanner {
    pub fn with_sheets(sheets: usize) -> Self {
        let scanner = Self::default();
        scanner.sheets.set(sheets);
        scanner
    }
}

impl ScanDriver for FakeScanner {
    fn scan(&self, request: &ScanRequest) -> Result<(), ScanError> {
        self.requests.borrow_mut().push(request.clone());
        if self.fail.get() {
            return Err(ScanError::Failed {
                program: "scanimage".to_string(),
                status: "exit status: 7".to_string(),
                stderr: "Document feeder out of documents".to_string(),
            });
        }
        for sheet in 0..self.sheets.get() {
            let raster = naming::expand_template(&request.template, request.batch.index_of(sheet));
            fs::write(&raster, b"P4\n1 1\n0").map_err(|source| ScanError::Spawn {
                program: "scanimage".to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Writes `<raster>.pdf` holding the raster's file name; fails on listed names.
#[derive(Default)]
pub struct FakeConverter {
    pub failing: RefCell<Vec<String>>,
}

impl FakeConverter {
    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            failing: RefCell::new(names.iter().map(|n| n.to_string()).collect()),
        }
    }
}

impl PdfConverter for FakeConverter {
    fn convert(&self, rasters: &[PathBuf]) -> Conversion {
        let failing = self.failing.borrow();
        let mut converted = Vec::new();
        let mut failures = Vec::new();
        for raster in rasters {
            let name = raster.file_name().unwrap().to_string_lossy().to_string();
            if failing.iter().any(|f| name.contains(f.as_str())) {
                failures.push((
                    raster.clone(),
                    ToolFailure::Exit {
                        program: "convert".to_string(),
                        status: "exit status: 1".to_string(),
                        stderr: "improper image header".to_string(),
                    },
                ));
                continue;
            }
            let pdf = naming::converted_path(raster);
            fs::write(&pdf, name).unwrap();
            converted.push(pdf);
        }
        Conversion::from_parts(converted, failures)
    }
}

/// Writes the page file names, one per line, to the destination.
#[derive(Default)]
pub struct FakeAssembler {
    pub fail: Cell<bool>,
    pub calls: RefCell<Vec<(Vec<PathBuf>, PathBuf)>>,
}

impl PdfAssembler for FakeAssembler {
    fn assemble(&self, pages: &[PathBuf], destination: &Path) -> Result<(), ToolFailure> {
        self.calls
            .borrow_mut()
            .push((pages.to_vec(), destination.to_path_buf()));
        if self.fail.get() {
            return Err(ToolFailure::Exit {
                program: "pdftk".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Error: Unable to find file.".to_string(),
            });
        }
        let listing: Vec<String> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        fs::write(destination, listing.join("\n")).unwrap();
        Ok(())
    }
}

/// Records every notification; optionally rejects them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub reject: Cell<bool>,
    pub sent: RefCell<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.borrow_mut().push(notification.clone());
        if self.reject.get() {
            return Err(NotifyError::Rejected {
                status: 403,
                body: "forbidden".to_string(),
            });
        }
        Ok(())
    }
}

/// The four fakes, lent out together as a toolchain.
#[derive(Default)]
pub struct Rig {
    pub scanner: FakeScanner,
    pub converter: FakeConverter,
    pub assembler: FakeAssembler,
    pub notifier: RecordingNotifier,
}

impl Rig {
    pub fn with_sheets(sheets: usize) -> Self {
        Self {
            scanner: FakeScanner::with_sheets(sheets),
            ..Self::default()
        }
    }

    pub fn tools(&self) -> Toolchain<'_> {
        Toolchain {
            scanner: &self.scanner,
            converter: &self.converter,
            assembler: &self.assembler,
            notifier: Some(&self.notifier),
        }
    }
}

/// Manual duplex configuration with all directories under `root`.
pub fn config_in(root: &Path) -> Config {
    let mut config = Config::default();
    config.output_dir = root.join("out");
    config.export_dir = root.join("export");
    config.log_dir = root.join("out");
    config.duplex = DuplexMode::Manual;
    fs::create_dir_all(&config.output_dir).unwrap();
    fs::create_dir_all(&config.export_dir).unwrap();
    config
}

/// Regular file names in `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
