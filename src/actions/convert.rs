//! Raster to PDF page conversion.

use std::path::PathBuf;

use super::{run_tool, ToolFailure};
use crate::naming;

/// Result of converting a raster batch, one PDF per input page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// Every page was converted.
    Complete(Vec<PathBuf>),
    /// Some pages were converted; the rest failed.
    Partial {
        /// PDFs that were produced, in input order
        converted: Vec<PathBuf>,
        /// Inputs that failed, with the reason
        failures: Vec<(PathBuf, ToolFailure)>,
    },
    /// No page was converted.
    Failed(Vec<(PathBuf, ToolFailure)>),
}

impl Conversion {
    /// Classify per-page results.
    #[must_use]
    pub fn from_parts(converted: Vec<PathBuf>, failures: Vec<(PathBuf, ToolFailure)>) -> Self {
        match (converted.is_empty(), failures.is_empty()) {
            (_, true) => Self::Complete(converted),
            (true, false) => Self::Failed(failures),
            (false, false) => Self::Partial {
                converted,
                failures,
            },
        }
    }

    /// PDFs that were produced.
    #[must_use]
    pub fn converted(&self) -> &[PathBuf] {
        match self {
            Self::Complete(converted) | Self::Partial { converted, .. } => converted,
            Self::Failed(_) => &[],
        }
    }

    /// Consume into the produced PDFs.
    #[must_use]
    pub fn into_converted(self) -> Vec<PathBuf> {
        match self {
            Self::Complete(converted) | Self::Partial { converted, .. } => converted,
            Self::Failed(_) => Vec::new(),
        }
    }

    /// Inputs that failed.
    #[must_use]
    pub fn failures(&self) -> &[(PathBuf, ToolFailure)] {
        match self {
            Self::Complete(_) => &[],
            Self::Partial { failures, .. } | Self::Failed(failures) => failures,
        }
    }

    /// Whether raw inputs may be deleted: no failures and one PDF per input.
    #[must_use]
    pub fn covers(&self, inputs: usize) -> bool {
        matches!(self, Self::Complete(converted) if converted.len() == inputs)
    }
}

/// Converts raster pages to single-page PDFs.
pub trait PdfConverter {
    /// Convert `rasters` in order.
    fn convert(&self, rasters: &[PathBuf]) -> Conversion;
}

/// Converter calling `<program> <input> <output>` once per page (ImageMagick style).
#[derive(Debug, Clone)]
pub struct ImageMagickConverter {
    program: String,
}

impl ImageMagickConverter {
    /// Create a converter calling `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PdfConverter for ImageMagickConverter {
    fn convert(&self, rasters: &[PathBuf]) -> Conversion {
        let mut converted = Vec::with_capacity(rasters.len());
        let mut failures = Vec::new();

        for raster in rasters {
            let pdf = naming::converted_path(raster);
            match run_tool(&self.program, [raster.as_os_str(), pdf.as_os_str()], &pdf) {
                Ok(()) => {
                    log::debug!("Converted {} -> {}", raster.display(), pdf.display());
                    converted.push(pdf);
                }
                Err(e) => {
                    log::error!("Conversion failed for {}: {}", raster.display(), e);
                    failures.push((raster.clone(), e));
                }
            }
        }

        Conversion::from_parts(converted, failures)
    }
}
