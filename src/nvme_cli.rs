// SPDX-License-Identifier: AGPL-3.0-or-later

//! nvme-cli invocation
//!
//! [`NvmeSource`] is the seam between the collector and the outside world:
//! the three documents one poll needs. [`NvmeCli`] produces them by running
//! the `nvme` executable.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{ExporterError, Result};

/// Source of raw nvme-cli JSON documents
pub trait NvmeSource: Send + Sync {
    /// Namespace inventory (`nvme list -o json`)
    fn list(&self) -> Result<String>;

    /// Controller identification for `controller` (e.g., "nvme0")
    fn id_ctrl(&self, controller: &str) -> Result<String>;

    /// Health log for the namespace at `device_path`
    fn smart_log(&self, device_path: &str) -> Result<String>;
}

/// Runs the `nvme` executable
#[derive(Debug, Clone)]
pub struct NvmeCli {
    binary: PathBuf,
}

impl NvmeCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let command_line = format!("{} {}", self.binary.display(), args.join(" "));
        log::debug!("running {}", command_line);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| ExporterError::CommandFailed(format!("{}: {}", command_line, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExporterError::CommandFailed(format!(
                "{}: {}: {}",
                command_line,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for NvmeCli {
    fn default() -> Self {
        Self::new("nvme")
    }
}

impl NvmeSource for NvmeCli {
    fn list(&self) -> Result<String> {
        self.run(&["list", "-o", "json"])
    }

    fn id_ctrl(&self, controller: &str) -> Result<String> {
        let device = format!("/dev/{}", controller);
        self.run(&["id-ctrl", "-o", "json", &device])
    }

    fn smart_log(&self, device_path: &str) -> Result<String> {
        self.run(&["smart-log", device_path, "-o", "json"])
    }
}
