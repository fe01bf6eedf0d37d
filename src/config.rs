//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file (`--config`, or `<config dir>/batchscan/config.toml`)
//! 3. Environment variables prefixed with `BATCHSCAN_` (`__` separates nested keys,
//!    e.g. `BATCHSCAN_SCAN__RESOLUTION=600`)
//! 4. Command-line flags ([`Config::apply_scan_args`])
//!
//! The resulting struct is built once per invocation and passed by reference to
//! every component; nothing reads settings from global state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::ScanArgs;
use crate::naming;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "BATCHSCAN_";

/// How double-sided documents are captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DuplexMode {
    /// Single-sided scanning.
    #[default]
    Off,
    /// Two invocations: odd pages, flip the stack, even pages.
    Manual,
    /// The device scans both sides in one pass.
    Auto,
}

impl std::fmt::Display for DuplexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplexMode::Off => write!(f, "off"),
            DuplexMode::Manual => write!(f, "manual"),
            DuplexMode::Auto => write!(f, "auto"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix for every scanned and compiled file name.
    pub prefix: String,
    /// Scratch directory receiving raw rasters, converted pages and the manifest.
    pub output_dir: PathBuf,
    /// Directory receiving compiled documents.
    pub export_dir: PathBuf,
    /// Directory holding `batchscan.log`.
    pub log_dir: PathBuf,
    /// Duplex mode for `scan`.
    pub duplex: DuplexMode,
    /// Log the scan command instead of running it.
    pub dry_run: bool,
    /// Assemble the odd pages into a preview PDF after the odd phase.
    pub odd_preview: bool,
    /// Expected upper bound for one scan pass, in seconds. Logged, not enforced.
    pub wait_limit_secs: u64,
    /// Scan driver settings.
    pub scan: ScanSettings,
    /// External program names.
    pub tools: ToolSettings,
    /// Push notification settings.
    pub notify: NotifySettings,
}

impl Default for Config {
    fn default() -> Self {
        let scratch = std::env::temp_dir().join("brscan");
        Self {
            prefix: "brscan".to_string(),
            output_dir: scratch.clone(),
            export_dir: PathBuf::from("/scans"),
            log_dir: scratch,
            duplex: DuplexMode::Off,
            dry_run: false,
            odd_preview: true,
            wait_limit_secs: 300,
            scan: ScanSettings::default(),
            tools: ToolSettings::default(),
            notify: NotifySettings::default(),
        }
    }
}

/// Settings passed to the scan driver. Lengths are in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Device identifier, e.g. `brother4:net1;dev0`. Discovered when unset.
    pub device: Option<String>,
    /// Resolution in dpi.
    pub resolution: u32,
    /// Color mode, e.g. `Black & White`.
    pub mode: Option<String>,
    /// Document source, e.g. `Automatic Document Feeder(left aligned)`.
    pub source: Option<String>,
    /// Left offset of the scan area.
    pub left: u32,
    /// Top offset of the scan area.
    pub top: u32,
    /// Width of the scan area.
    pub x: u32,
    /// Height of the scan area.
    pub y: u32,
    /// Page width (A4 by default).
    pub width: u32,
    /// Page height (A4 by default).
    pub height: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            device: None,
            resolution: 300,
            mode: None,
            source: None,
            left: 0,
            top: 0,
            x: 215,
            y: 287,
            width: 210,
            height: 297,
        }
    }
}

/// Names (or paths) of the external programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// SANE command-line frontend.
    pub scanimage: String,
    /// Raster to PDF converter, called as `<converter> <in> <out>`.
    pub converter: String,
    /// PDF assembler, called as `<assembler> <in...> cat output <out>`.
    pub assembler: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            scanimage: "scanimage".to_string(),
            converter: "convert".to_string(),
            assembler: "pdftk".to_string(),
        }
    }
}

/// ntfy notification settings. Notifications are sent only when `url` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    /// Topic endpoint, e.g. `https://ntfy.sh/scanner`.
    pub url: Option<String>,
    /// Basic-auth user name.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Notification title.
    pub title: String,
    /// ntfy priority (`min`, `low`, `default`, `high`, `urgent`).
    pub priority: String,
    /// ntfy tags.
    pub tags: Vec<String>,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            title: "Scanning done!".to_string(),
            priority: "low".to_string(),
            tags: vec!["scanner".to_string(), "pdf".to_string()],
        }
    }
}

impl Config {
    /// Load the configuration from `path`, or from the platform-specific default
    /// path when `path` is `None`. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };
        Self::figment(path.as_deref())
            .extract()
            .context("Failed to load configuration")
    }

    /// Build the layered figment: defaults < TOML file < environment.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "batchscan", "batchscan")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply command-line overrides from the `scan` subcommand.
    pub fn apply_scan_args(&mut self, args: &ScanArgs) {
        self.apply_dir_overrides(args.output_dir.as_ref(), args.prefix.as_ref());
        if let Some(dir) = &args.export_dir {
            self.export_dir = dir.clone();
        }
        if let Some(dir) = &args.log_dir {
            self.log_dir = dir.clone();
        }
        if let Some(duplex) = args.duplex {
            self.duplex = duplex;
        }
        if args.dry_run {
            self.dry_run = true;
        }
        if args.no_notify {
            self.notify.url = None;
        }

        let scan = &mut self.scan;
        if let Some(device) = &args.device_name {
            scan.device = Some(device.clone());
        }
        if let Some(mode) = &args.mode {
            scan.mode = Some(mode.clone());
        }
        if let Some(source) = &args.source {
            scan.source = Some(source.clone());
        }
        let numeric = [
            (&mut scan.resolution, args.resolution),
            (&mut scan.left, args.left),
            (&mut scan.top, args.top),
            (&mut scan.x, args.x),
            (&mut scan.y, args.y),
            (&mut scan.width, args.width),
            (&mut scan.height, args.height),
        ];
        for (field, value) in numeric {
            if let Some(value) = value {
                *field = value;
            }
        }
    }

    /// Apply the directory overrides shared by `status` and `reset`.
    pub fn apply_dir_overrides(&mut self, output_dir: Option<&PathBuf>, prefix: Option<&String>) {
        if let Some(dir) = output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(prefix) = prefix {
            self.prefix = prefix.clone();
        }
    }

    /// Location of the odd-page manifest for this output directory and prefix.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        naming::manifest_path(&self.output_dir, &self.prefix)
    }

    /// Resolve the output, export and log directories against the working directory.
    pub fn make_dirs_absolute(&mut self) -> Result<()> {
        for dir in [&mut self.output_dir, &mut self.export_dir, &mut self.log_dir] {
            *dir = std::path::absolute(&*dir)
                .with_context(|| format!("Failed to resolve directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Serialize the configuration as TOML with secrets masked.
    pub fn to_toml_redacted(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.notify.password.is_some() {
            shown.notify.password = Some("********".to_string());
        }
        toml::to_string_pretty(&shown).context("Failed to serialize configuration")
    }
}
