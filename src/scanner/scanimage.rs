//! SANE `scanimage` adaptor.

use std::process::{Command, Output};

use super::device::{parse_device_list, parse_duplex_source};
use super::{ScanDriver, ScanError, ScanRequest};
use crate::naming;

/// Scan driver backed by the `scanimage` command-line frontend.
#[derive(Debug, Clone)]
pub struct ScanimageDriver {
    program: String,
}

impl ScanimageDriver {
    /// Create a driver calling `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Encode a request as `scanimage` arguments.
    #[must_use]
    pub fn args(request: &ScanRequest) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(device) = &request.device {
            args.push("-d".to_string());
            args.push(device.clone());
        }

        let g = request.geometry;
        for (flag, value) in [("-l", g.left), ("-t", g.top), ("-x", g.x), ("-y", g.y)] {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
        args.push(format!("--page-width={}", g.width));
        args.push(format!("--page-height={}", g.height));
        args.push(format!("--resolution={}", request.resolution));

        if let Some(mode) = &request.mode {
            args.push(format!("--mode={mode}"));
        }
        if let Some(source) = &request.source {
            args.push(format!("--source={source}"));
        }
        args.push("--format=pnm".to_string());

        let batch = request.batch;
        if batch.enabled {
            args.push(format!("--batch={}", request.template.display()));
            args.push(format!("--batch-start={}", batch.start));
            args.push(format!("--batch-increment={}", batch.increment));
        } else {
            let single = naming::expand_template(&request.template, batch.start);
            args.push(format!("--output-file={}", single.display()));
        }
        args
    }

    /// First device reported by `scanimage -L`.
    #[must_use]
    pub fn default_device(&self) -> Option<String> {
        let output = self.query(&["-L"])?;
        let devices = parse_device_list(&String::from_utf8_lossy(&output.stdout));
        if devices.is_empty() {
            log::warn!("{} -L reported no devices", self.program);
        }
        devices.into_iter().next()
    }

    /// Duplex-capable source advertised by `scanimage -A`.
    #[must_use]
    pub fn duplex_source(&self, device: Option<&str>) -> Option<String> {
        let mut args = vec!["-A"];
        if let Some(device) = device {
            args.extend(["-d", device]);
        }
        let output = self.query(&args)?;
        let source = parse_duplex_source(&String::from_utf8_lossy(&output.stdout));
        if source.is_none() {
            log::warn!("No duplex source advertised by the device");
        }
        source
    }

    fn query(&self, args: &[&str]) -> Option<Output> {
        match Command::new(&self.program).args(args).output() {
            Ok(output) if output.status.success() => Some(output),
            Ok(output) => {
                log::warn!(
                    "{} {} failed: {}",
                    self.program,
                    args.join(" "),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(e) => {
                log::warn!("Failed to run {}: {}", self.program, e);
                None
            }
        }
    }
}

impl ScanDriver for ScanimageDriver {
    fn scan(&self, request: &ScanRequest) -> Result<(), ScanError> {
        let args = Self::args(request);
        log::debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ScanError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ScanError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            // scanimage reports batch progress on stderr
            log::debug!("{}: {}", self.program, stderr);
        }
        Ok(())
    }

    fn command_line(&self, request: &ScanRequest) -> String {
        let args: Vec<String> = Self::args(request)
            .into_iter()
            .map(|arg| {
                if arg.contains(' ') || arg.contains(';') {
                    format!("'{arg}'")
                } else {
                    arg
                }
            })
            .collect();
        format!("{} {}", self.program, args.join(" "))
    }
}
