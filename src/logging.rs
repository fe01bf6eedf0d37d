//! Logging infrastructure for batchscan.
//!
//! This module provides structured logging using the `log` facade and `env_logger` backend.
//! Log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. Default: info level
//!
//! Records are appended to `batchscan.log` in the log directory and echoed to
//! stderr. When that file cannot be opened a temporary file is kept instead,
//! and when that fails too only the console is used.
//!
//! # Example
//!
//! ```rust,no_run
//! use batchscan::logging::init_logging;
//! use std::path::Path;
//!
//! // Info level, log file under /tmp/brscan
//! let destination = init_logging(0, false, Some(Path::new("/tmp/brscan")));
//! log::info!("Logging to {destination}");
//! ```

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the log inside the log directory.
pub const LOG_FILE_NAME: &str = "batchscan.log";

/// Where log records end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// The log file in the configured directory.
    File(PathBuf),
    /// A kept temporary file, used when the configured one could not be opened.
    TempFile(PathBuf),
    /// Standard error only.
    Console,
}

impl std::fmt::Display for LogDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) | Self::TempFile(path) => write!(f, "{}", path.display()),
            Self::Console => write!(f, "console"),
        }
    }
}

/// Copies every record to the log file and to stderr.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The console copy is best effort; the file is authoritative
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

/// Initialize the logging subsystem based on CLI verbosity flags.
///
/// This function should be called once at the start of the application,
/// before any logging calls are made.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=normal, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by RUST_LOG)
/// * `log_dir` - Directory for `batchscan.log`; `None` logs to the console only
///
/// # Panics
///
/// This function will panic if called more than once, as `env_logger`
/// can only be initialized once per process.
pub fn init_logging(verbose: u8, quiet: bool, log_dir: Option<&Path>) -> LogDestination {
    let use_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();
    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }
    configure_format(&mut builder, verbose);

    let (file, destination) = match log_dir.map(open_log_file) {
        Some(Ok((file, path))) => (Some(file), LogDestination::File(path)),
        Some(Err(_)) => match open_temp_log() {
            Ok((file, path)) => (Some(file), LogDestination::TempFile(path)),
            Err(_) => (None, LogDestination::Console),
        },
        None => (None, LogDestination::Console),
    };
    match file {
        Some(file) => builder.target(Target::Pipe(Box::new(TeeWriter { file }))),
        None => builder.target(Target::Stderr),
    };

    builder.init();

    if let (LogDestination::TempFile(path), Some(dir)) = (&destination, log_dir) {
        log::warn!(
            "Could not open a log file in {}; logging to {}",
            dir.display(),
            path.display()
        );
    }
    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG environment variable: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!(
            "Logging initialized at level {} to {destination}",
            current_level_name()
        );
    }
    destination
}

/// Open `<dir>/batchscan.log` for appending, creating the directory if needed.
pub fn open_log_file(dir: &Path) -> io::Result<(File, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

fn open_temp_log() -> io::Result<(File, PathBuf)> {
    let temp = tempfile::Builder::new()
        .prefix("batchscan-")
        .suffix(".log")
        .tempfile()?;
    temp.keep().map_err(|e| e.error)
}

/// Determine the log level from CLI flags.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Timestamped records; module paths from `-v` upward.
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        if verbose >= 1 {
            writeln!(
                buf,
                "{} {:<5} [{}] {}",
                timestamp,
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{} {:<5} {}", timestamp, record.level(), record.args())
        }
    });
}

/// Get the current log level as a string.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
