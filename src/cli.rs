//! Command-line interface definitions for batchscan.
//!
//! Global options control verbosity and configuration; subcommands run a scan,
//! inspect or discard a pending duplex session, or print the effective config.
//!
//! # Example
//!
//! ```bash
//! # Single-sided scan of the whole feeder
//! batchscan scan
//!
//! # Manual duplex: first run scans odd pages, second run (after flipping) even pages
//! batchscan scan --duplex
//! batchscan scan --duplex
//!
//! # What will the next duplex run do?
//! batchscan status
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DuplexMode;

/// Paper-to-PDF scanning with manual duplex sessions.
#[derive(Debug, Parser)]
#[command(name = "batchscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all console output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH", env = "BATCHSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan one batch (or one duplex phase) and compile it to PDF
    Scan(ScanArgs),
    /// Show which duplex phase the next scan will run
    Status(SessionArgs),
    /// Discard a pending duplex session
    Reset(SessionArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Default, Args)]
pub struct ScanArgs {
    /// Scratch directory for scanned pages
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory receiving compiled documents
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Directory for batchscan.log
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Prefix for scanned file names
    #[arg(long)]
    pub prefix: Option<String>,

    /// Timestamp grouping this run's files, in seconds since the epoch
    #[arg(long, value_name = "SECS")]
    pub timenow: Option<i64>,

    /// Scan device, e.g. "brother4:net1;dev0"
    #[arg(long, value_name = "DEVICE")]
    pub device_name: Option<String>,

    /// Scan resolution in dpi
    #[arg(long, value_name = "DPI")]
    pub resolution: Option<u32>,

    /// Page height in mm
    #[arg(long, value_name = "MM")]
    pub height: Option<u32>,

    /// Page width in mm
    #[arg(long, value_name = "MM")]
    pub width: Option<u32>,

    /// Left offset of the scan area in mm
    #[arg(short = 'l', long = "left", value_name = "MM")]
    pub left: Option<u32>,

    /// Top offset of the scan area in mm
    #[arg(short = 't', long = "top", value_name = "MM")]
    pub top: Option<u32>,

    /// Width of the scan area in mm
    #[arg(short = 'x', long = "scan-width", value_name = "MM")]
    pub x: Option<u32>,

    /// Height of the scan area in mm
    #[arg(short = 'y', long = "scan-height", value_name = "MM")]
    pub y: Option<u32>,

    /// Color mode, e.g. "Black & White"
    #[arg(long)]
    pub mode: Option<String>,

    /// Document source, e.g. "Automatic Document Feeder(left aligned)"
    #[arg(long)]
    pub source: Option<String>,

    /// Duplex mode; a bare --duplex means manual
    #[arg(
        long,
        value_enum,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "manual"
    )]
    pub duplex: Option<DuplexMode>,

    /// Log the scan command instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// Do not send a push notification
    #[arg(long)]
    pub no_notify: bool,
}

/// Arguments for subcommands that only need to locate the session.
#[derive(Debug, Default, Args)]
pub struct SessionArgs {
    /// Scratch directory holding the session
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Prefix used for scanned file names
    #[arg(long)]
    pub prefix: Option<String>,
}
