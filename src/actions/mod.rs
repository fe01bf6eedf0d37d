//! Adaptors for the external tools that turn scanned pages into a document.
//!
//! This module provides:
//! - Raster to PDF page conversion ([`convert`])
//! - Multi-page PDF assembly ([`assemble`])
//! - Push notifications ([`notify`])
//! - Raw and scratch file cleanup ([`cleanup`])
//!
//! Each tool sits behind a trait so the session controller can run against
//! fakes. Every call is blocking: the process is spawned and waited on before
//! control returns.
//!
//! ```no_run
//! use batchscan::actions::{PdfAssembler, PdftkAssembler};
//! use std::path::{Path, PathBuf};
//!
//! let pages = vec![PathBuf::from("/tmp/brscan/a.pdf"), PathBuf::from("/tmp/brscan/b.pdf")];
//! PdftkAssembler::new("pdftk")
//!     .assemble(&pages, Path::new("/scans/out.pdf"))
//!     .unwrap();
//! ```

pub mod assemble;
pub mod cleanup;
pub mod convert;
pub mod notify;

use std::path::{Path, PathBuf};
use std::process::Command;

// Re-export commonly used types
pub use assemble::{PdfAssembler, PdftkAssembler};
pub use cleanup::{clear_directory, remove_files, CleanupResult};
pub use convert::{Conversion, ImageMagickConverter, PdfConverter};
pub use notify::{Notification, NotifyError, Notifier, NtfyNotifier};

/// Why an external tool call did not produce its output.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolFailure {
    /// The program could not be started.
    #[error("failed to start {program}: {message}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Operating system error message
        message: String,
    },

    /// The program exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        /// Program that failed
        program: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The program exited successfully but its output file is missing.
    #[error("{program} did not produce {path}")]
    MissingOutput {
        /// Program that was run
        program: String,
        /// Expected output path
        path: PathBuf,
    },
}

/// Run `program` with `args`, wait for it, and check that `output` exists afterwards.
pub(crate) fn run_tool<I, S>(program: &str, args: I, output: &Path) -> Result<(), ToolFailure>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let result = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ToolFailure::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    if !result.status.success() {
        return Err(ToolFailure::Exit {
            program: program.to_string(),
            status: result.status.to_string(),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }
    if !output.exists() {
        return Err(ToolFailure::MissingOutput {
            program: program.to_string(),
            path: output.to_path_buf(),
        });
    }
    Ok(())
}
