// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for NVMe Exporter
//!
//! Every variant is fatal for the poll that raised it: a scrape either yields
//! the complete metric set or nothing at all.

use thiserror::Error;

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Main error type for NVMe Exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    /// Output of an external call is not valid JSON
    #[error("{context} json is not valid: {source}")]
    InvalidJson {
        /// Which document failed (e.g. "nvme list", "smart-log for /dev/nvme0n1")
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// None of the known topology layouts produced a namespace
    #[error("No NVMe devices found")]
    NoDevices,

    /// A controller entry did not declare its name
    #[error("No controller found in {0}")]
    MissingController(String),

    /// The controller could not be derived from a namespace name or device path
    #[error("nvme device file [{0}] does not match expected format")]
    UnrecognizedDeviceName(String),

    /// An external command could not be spawned or exited non-zero
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// An emitted sample does not match the descriptor catalogue
    #[error("Catalogue mismatch: {0}")]
    Catalogue(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Unsupported platform or feature
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ExporterError {
    /// Wrap a JSON syntax error with the name of the document it came from
    pub fn invalid_json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidJson {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_no_devices() {
        assert_eq!(ExporterError::NoDevices.to_string(), "No NVMe devices found");
    }

    #[test]
    fn test_error_display_unrecognized_device() {
        let err = ExporterError::UnrecognizedDeviceName("/dev/sda".to_string());
        assert_eq!(
            err.to_string(),
            "nvme device file [/dev/sda] does not match expected format"
        );
    }

    #[test]
    fn test_error_invalid_json_context() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid json }}}").unwrap_err();
        let err = ExporterError::invalid_json("nvme list", json_err);
        assert!(err.to_string().starts_with("nvme list json is not valid"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_missing_controller() {
        let err = ExporterError::MissingController("[{\"Controller\":\"\"}]".to_string());
        match err {
            ExporterError::MissingController(s) => assert!(s.contains("Controller")),
            _ => panic!("Expected MissingController"),
        }
    }
}
