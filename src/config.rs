// SPDX-License-Identifier: AGPL-3.0-or-later

//! Exporter configuration
//!
//! Loaded from an optional TOML file; command-line flags override it in the
//! binary. Every key has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};

use crate::error::{ExporterError, Result};
use crate::smart::TemperatureScale;

/// Log level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter string understood by `env_logger`
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Address to bind (default: "0.0.0.0")
    pub listen_address: String,
    /// Port (default: 9998)
    pub port: u16,
    /// Scale temperatures are exported in (default: celsius)
    pub temperature_scale: TemperatureScale,
    /// nvme-cli executable, bare name or path (default: "nvme")
    pub nvme_binary: String,
    /// Path the metrics are served on (default: "/metrics")
    pub metrics_path: String,
    pub log_level: LogLevel,
    /// Skip the root and executable checks at startup
    pub skip_preflight: bool,
    /// Terminate the process when a poll fails instead of answering 500
    pub exit_on_poll_error: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".into(),
            port: 9998,
            temperature_scale: TemperatureScale::Celsius,
            nvme_binary: "nvme".into(),
            metrics_path: "/metrics".into(),
            log_level: LogLevel::Info,
            skip_preflight: false,
            exit_on_poll_error: false,
        }
    }
}

impl ExporterConfig {
    /// Load from TOML file
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExporterError::Config(format!("Cannot read {}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ExporterError::Config(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the listener cannot work with.
    ///
    /// The temperature scale is not checked; unknown names pass through in
    /// Kelvin.
    pub fn validate(&self) -> Result<()> {
        if !self.metrics_path.starts_with('/') {
            return Err(ExporterError::Config(format!(
                "metrics_path must start with '/': {}",
                self.metrics_path
            )));
        }
        if self.nvme_binary.trim().is_empty() {
            return Err(ExporterError::Config("nvme_binary is empty".into()));
        }
        Ok(())
    }

    /// Get listen address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.port)
    }

    /// Generate sample config
    pub fn sample_toml() -> String {
        r#"# NVMe Exporter Configuration
listen_address = "0.0.0.0"
port = 9998
# One of: celsius | fahrenheit | kelvin. The NVMe standard reports Kelvin.
temperature_scale = "celsius"
nvme_binary = "nvme"
metrics_path = "/metrics"
log_level = "info"
# skip_preflight = false
# Exit instead of answering 500 when a poll fails
# exit_on_poll_error = false
"#
        .into()
    }
}
