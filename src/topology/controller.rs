// SPDX-License-Identifier: AGPL-3.0-or-later

//! Controller inference from namespace names and device paths.
//!
//! Only used when the inventory does not name the controller itself.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ExporterError, Result};

/// A controller token followed, possibly much later, by a trailing digit
const CONTROLLER_PATTERN: &str = r"^.*(nvme[0-9]+).*[0-9]+$";

static CONTROLLER_RE: OnceLock<Regex> = OnceLock::new();

fn controller_re() -> Result<&'static Regex> {
    if let Some(re) = CONTROLLER_RE.get() {
        return Ok(re);
    }
    let re = Regex::new(CONTROLLER_PATTERN)
        .map_err(|e| ExporterError::Other(format!("controller pattern: {}", e)))?;
    Ok(CONTROLLER_RE.get_or_init(|| re))
}

/// Derive the owning controller from a namespace name or device path.
///
/// The input must contain an `nvme<N>` token and end in a digit, so
/// `nvme4n1` gives `nvme4` and `/dev/nvme2n1` gives `nvme2`. The leading
/// `.*` is greedy: when several tokens qualify the rightmost wins, and a
/// token running to the end of the input gives up its last digit to the
/// trailing one (`nvme12` gives `nvme1`). A multipath name like
/// `nvme9c11n1` resolves to `nvme9`.
pub fn infer_controller(name_or_path: &str) -> Result<String> {
    controller_re()?
        .captures(name_or_path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ExporterError::UnrecognizedDeviceName(name_or_path.to_string()))
}
