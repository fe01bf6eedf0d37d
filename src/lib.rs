//! batchscan - Paper to PDF with manual duplex sessions
//!
//! Drives a SANE scanner through `scanimage`, converts the captured pages to PDF
//! and compiles them into one document. Devices without a duplex unit scan a
//! two-sided stack in two invocations: odd pages first, then the flipped stack,
//! merged back into reading order.

pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod naming;
pub mod scanner;
pub mod session;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::actions::{ImageMagickConverter, Notifier, NtfyNotifier, PdftkAssembler};
use crate::cli::{Cli, Commands, ScanArgs};
use crate::config::{Config, DuplexMode};
use crate::error::ExitCode;
use crate::scanner::ScanimageDriver;
use crate::session::manifest::{self, ManifestState};
use crate::session::{DuplexSessionController, Toolchain};

/// Run the command selected on the command line.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    // Logging is not up yet; report a broken config file once it is
    let (mut config, load_error) = match Config::load(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let log_to_file = match &cli.command {
        Commands::Scan(args) => {
            config.apply_scan_args(args);
            true
        }
        Commands::Status(args) | Commands::Reset(args) => {
            config.apply_dir_overrides(args.output_dir.as_ref(), args.prefix.as_ref());
            false
        }
        Commands::Config => false,
    };
    // Manifest entries must stay valid from any working directory
    let dirs_resolved = config.make_dirs_absolute();
    let log_dir = log_to_file.then(|| config.log_dir.clone());
    logging::init_logging(cli.verbose, cli.quiet, log_dir.as_deref());
    if let Some(e) = load_error {
        log::warn!("{e:#}; using default configuration");
    }
    dirs_resolved?;

    match &cli.command {
        Commands::Scan(args) => run_scan(config, args),
        Commands::Status(_) => show_status(&config),
        Commands::Reset(_) => reset_session(&config),
        Commands::Config => {
            println!("{}", config.to_toml_redacted()?);
            Ok(ExitCode::Success)
        }
    }
}

fn run_scan(mut config: Config, args: &ScanArgs) -> Result<ExitCode> {
    let timestamp = args
        .timenow
        .unwrap_or_else(|| chrono::Utc::now().timestamp());
    log::debug!("Session timestamp: {timestamp}");

    ensure_dir(&config.output_dir, "output")?;
    ensure_dir(&config.export_dir, "export")?;

    let scanimage = ScanimageDriver::new(&config.tools.scanimage);
    if !config.dry_run {
        discover_device(&mut config, &scanimage);
    }

    let converter = ImageMagickConverter::new(&config.tools.converter);
    let assembler = PdftkAssembler::new(&config.tools.assembler);
    let notifier = match NtfyNotifier::from_settings(&config.notify) {
        Ok(notifier) => notifier,
        Err(e) => {
            log::warn!("Notifications disabled: {e}");
            None
        }
    };
    let tools = Toolchain {
        scanner: &scanimage,
        converter: &converter,
        assembler: &assembler,
        notifier: notifier.as_ref().map(|n| n as &dyn Notifier),
    };

    let outcome = DuplexSessionController::new(&config, tools, timestamp).run();
    log::debug!("Session outcome: {outcome:?}");
    Ok(ExitCode::from(&outcome))
}

/// Fill in the device and, for device duplex, the feeder source from the scanner itself.
fn discover_device(config: &mut Config, scanimage: &ScanimageDriver) {
    if config.scan.device.is_none() {
        config.scan.device = scanimage.default_device();
        match &config.scan.device {
            Some(device) => log::info!("Using device {device}"),
            None => log::warn!("No device found; using the driver's default device"),
        }
    }
    if config.duplex == DuplexMode::Auto && config.scan.source.is_none() {
        config.scan.source = scanimage.duplex_source(config.scan.device.as_deref());
        if let Some(source) = &config.scan.source {
            log::info!("Using duplex source {source}");
        }
    }
}

fn ensure_dir(dir: &Path, role: &str) -> Result<()> {
    if !dir.is_dir() {
        log::info!("Creating {role} directory {}", dir.display());
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {role} directory {}", dir.display()))
}

/// Report what the next duplex scan would do, without touching anything.
fn show_status(config: &Config) -> Result<ExitCode> {
    let path = config.manifest_path();
    match manifest::inspect(&path) {
        ManifestState::Absent => {
            println!(
                "No pending duplex session in {}.",
                config.output_dir.display()
            );
            println!("The next duplex scan captures odd pages.");
        }
        ManifestState::Pending {
            manifest,
            existing,
            missing,
        } => {
            println!(
                "Pending duplex session started {}: {} odd page(s)",
                manifest.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
                manifest.files.len()
            );
            for file in &existing {
                println!("  {}", file.display());
            }
            for file in &missing {
                println!("  {} (missing)", file.display());
            }
            println!(
                "The next duplex scan captures {} even page(s) for a {} page document.",
                existing.len(),
                existing.len() * 2
            );
        }
        ManifestState::Stale { manifest } => {
            println!(
                "Stale duplex session: none of its {} odd page(s) exist.",
                manifest.files.len()
            );
            println!("The next duplex scan discards it and captures odd pages.");
        }
        ManifestState::Corrupt(e) => {
            println!("Unreadable duplex session: {e}");
            println!("The next duplex scan discards it and captures odd pages.");
        }
    }
    Ok(ExitCode::Success)
}

fn reset_session(config: &Config) -> Result<ExitCode> {
    let path = config.manifest_path();
    let removed = manifest::discard(&path)
        .with_context(|| format!("Failed to remove {}", path.display()))?;
    if removed {
        println!("Discarded pending duplex session {}", path.display());
    } else {
        println!("No pending duplex session in {}", config.output_dir.display());
    }
    Ok(ExitCode::Success)
}
