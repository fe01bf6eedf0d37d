//! Structured error handling and exit codes.

use serde::Serialize;

use crate::session::SessionOutcome;

/// Exit codes for the batchscan application.
///
/// - 0: Success (document compiled, odd pages stored, or dry run)
/// - 1: General error (unexpected failure)
/// - 2: Nothing scanned (the scan driver produced no pages)
/// - 3: Partial success (pages kept on disk after a conversion or assembly failure)
/// - 4: Scan failed (the scan driver exited with an error)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the invocation finished its protocol.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Nothing scanned: the scan driver produced no raster files.
    NothingScanned = 2,
    /// Partial success: some pages could not be converted or compiled.
    PartialSuccess = 3,
    /// Scan failed: the scan driver could not be run or exited non-zero.
    ScanFailed = 4,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "BS000",
            Self::GeneralError => "BS001",
            Self::NothingScanned => "BS002",
            Self::PartialSuccess => "BS003",
            Self::ScanFailed => "BS004",
        }
    }
}

impl From<&SessionOutcome> for ExitCode {
    fn from(outcome: &SessionOutcome) -> Self {
        match outcome {
            SessionOutcome::DryRun { .. } => Self::Success,
            SessionOutcome::ScanFailed { .. } => Self::ScanFailed,
            SessionOutcome::NothingScanned { .. } => Self::NothingScanned,
            SessionOutcome::OddPagesStored { complete, .. } => {
                if *complete {
                    Self::Success
                } else {
                    Self::PartialSuccess
                }
            }
            SessionOutcome::Compiled { complete, .. } => {
                if *complete {
                    Self::Success
                } else {
                    Self::PartialSuccess
                }
            }
            SessionOutcome::ConversionFailed { .. } | SessionOutcome::Incomplete { .. } => {
                Self::PartialSuccess
            }
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "BS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
