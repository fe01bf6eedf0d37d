//! Multi-page PDF assembly.

use std::path::{Path, PathBuf};

use super::{run_tool, ToolFailure};

/// Concatenates single-page PDFs into one document.
pub trait PdfAssembler {
    /// Write `pages`, in the given order, to `destination`.
    fn assemble(&self, pages: &[PathBuf], destination: &Path) -> Result<(), ToolFailure>;
}

/// Assembler calling `<program> <pages...> cat output <destination>` (pdftk).
#[derive(Debug, Clone)]
pub struct PdftkAssembler {
    program: String,
}

impl PdftkAssembler {
    /// Create an assembler calling `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for one assembly.
    #[must_use]
    pub fn args(pages: &[PathBuf], destination: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> =
            pages.iter().map(|p| p.as_os_str().to_owned()).collect();
        args.push("cat".into());
        args.push("output".into());
        args.push(destination.as_os_str().to_owned());
        args
    }
}

impl PdfAssembler for PdftkAssembler {
    fn assemble(&self, pages: &[PathBuf], destination: &Path) -> Result<(), ToolFailure> {
        log::debug!(
            "Assembling {} page(s) into {}",
            pages.len(),
            destination.display()
        );
        run_tool(&self.program, Self::args(pages, destination), destination)
    }
}
