//! File naming for scanned pages, compiled documents and the session manifest.
//!
//! Raster pages are named `<prefix>-<timestamp>-part-<NNN>.pnm`, where the
//! timestamp groups the pages of one invocation and `NNN` is the batch index
//! assigned by the scan driver. Converted pages keep the stem and switch to
//! `.pdf`, so ordering by part index works for both.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use regex::Regex;

/// Marker between the session timestamp and the batch index.
pub const PART: &str = "part";

/// Extension written by the scan driver.
pub const RASTER_EXTENSION: &str = "pnm";

/// Extension of converted and compiled documents.
pub const PDF_EXTENSION: &str = "pdf";

/// Placeholder the scan driver replaces with the zero-padded batch index.
pub const PART_PLACEHOLDER: &str = "%03d";

/// Path of the odd-page manifest: `<output_dir>/.<prefix>-odd-filelist`.
#[must_use]
pub fn manifest_path(output_dir: &Path, prefix: &str) -> PathBuf {
    output_dir.join(format!(".{prefix}-odd-filelist"))
}

/// Output template handed to the scan driver.
#[must_use]
pub fn raster_template(output_dir: &Path, prefix: &str, timestamp: i64) -> PathBuf {
    output_dir.join(format!(
        "{prefix}-{timestamp}-{PART}-{PART_PLACEHOLDER}.{RASTER_EXTENSION}"
    ))
}

/// Expand a raster template for one batch index, the way the scan driver does.
#[must_use]
pub fn expand_template(template: &Path, index: i64) -> PathBuf {
    let text = template.to_string_lossy();
    PathBuf::from(text.replace(PART_PLACEHOLDER, &format!("{index:03}")))
}

/// File-name pattern matching one session's raster pages; group 1 is the part index.
pub fn raster_pattern(prefix: &str, timestamp: i64) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"^{}-{}-{}-([0-9]+)\.{}$",
        regex::escape(prefix),
        timestamp,
        PART,
        RASTER_EXTENSION
    ))
}

/// Converted PDF path for a raster page.
#[must_use]
pub fn converted_path(raster: &Path) -> PathBuf {
    raster.with_extension(PDF_EXTENSION)
}

/// Batch index encoded in a page file name (`...-part-007.pdf` → 7).
#[must_use]
pub fn part_index(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let (_, digits) = stem.rsplit_once(&format!("-{PART}-"))?;
    digits.parse().ok()
}

/// Human-readable timestamp for compiled documents: `18-10-2026_14:03:05`.
#[must_use]
pub fn document_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%d.%m.%Y_%H:%M:%S").to_string().replace('.', "-")
}

/// Compiled document path: `<export_dir>/<prefix>-<timestamp>-<pages>.pdf`.
///
/// The page count keeps two documents finished within the same second apart.
#[must_use]
pub fn document_path(export_dir: &Path, prefix: &str, at: &DateTime<Local>, pages: usize) -> PathBuf {
    export_dir.join(format!(
        "{prefix}-{}-{pages}.{PDF_EXTENSION}",
        document_timestamp(at)
    ))
}

/// Preview of the odd phase: `<output_dir>/<prefix>-<YYYY-MM-DD>-<epoch>-odd.pdf`.
#[must_use]
pub fn odd_preview_path(output_dir: &Path, prefix: &str, at: &DateTime<Local>) -> PathBuf {
    output_dir.join(format!(
        "{prefix}-{}-{}-odd.{PDF_EXTENSION}",
        at.format("%Y-%m-%d"),
        at.timestamp()
    ))
}
