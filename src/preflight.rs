// SPDX-License-Identifier: AGPL-3.0-or-later

//! Startup checks: nvme-cli needs root and has to be on disk.

use std::path::{Path, PathBuf};

use crate::error::{ExporterError, Result};

/// Fail unless the process runs as root.
#[cfg(unix)]
pub fn check_root() -> Result<()> {
    if nix::unistd::Uid::effective().is_root() {
        Ok(())
    } else {
        Err(ExporterError::PermissionDenied(
            "you must be root to use nvme-cli".into(),
        ))
    }
}

#[cfg(not(unix))]
pub fn check_root() -> Result<()> {
    Err(ExporterError::Unsupported(
        "nvme-cli is only available on unix systems".into(),
    ))
}

/// Resolve `binary` the way a shell would.
///
/// Names containing a path separator are taken as-is; bare names are searched
/// for in `PATH`.
pub fn locate_binary(binary: &str) -> Result<PathBuf> {
    let search_path = std::env::var_os("PATH").unwrap_or_default();
    locate_in(binary, &search_path)
}

fn locate_in(binary: &str, search_path: &std::ffi::OsStr) -> Result<PathBuf> {
    let not_found = || {
        ExporterError::Config(format!("Cannot find {} command in path", binary))
    };

    if binary.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(binary);
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(not_found())
        };
    }

    std::env::split_paths(search_path)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(not_found)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run every startup check, returning the resolved nvme-cli path.
pub fn run(binary: &str) -> Result<PathBuf> {
    check_root()?;
    let path = locate_binary(binary)?;
    log::info!("using nvme-cli at {}", path.display());
    Ok(path)
}
