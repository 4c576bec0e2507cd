//! Local storage quota check
//!
//! Sums the bytes under the backup directory and compares them against the
//! configured quota before a new archive is pulled in.

use crate::error::CycleError;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

const BYTES_PER_GIGABYTE: f64 = 1024.0 * 1024.0 * 1024.0;

/// Result of a capacity check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityReport {
    pub warning: Option<String>,
    pub error: Option<CycleError>,
}

/// Total size of regular files under `path`, without following symlinks
pub fn directory_size(path: &Path) -> io::Result<u64> {
    let mut total = 0;

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = fs::symlink_metadata(entry.path())?;
        let file_type = metadata.file_type();

        if file_type.is_symlink() {
            continue;
        } else if file_type.is_dir() {
            total += directory_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }

    Ok(total)
}

/// Check the backup directory against its quota
pub fn check_local(directory: &Path, quota_gb: f64, warning_ratio: f64) -> CapacityReport {
    match directory_size(directory) {
        Ok(size) => {
            debug!("Backup directory {:?} holds {} bytes", directory, size);
            evaluate(size, quota_gb, warning_ratio)
        }
        Err(e) => CapacityReport {
            warning: None,
            error: Some(CycleError::LocalIo(format!(
                "Could not read backup directory {}: {}",
                directory.display(),
                e
            ))),
        },
    }
}

/// Classify a directory size against the quota
pub fn evaluate(size_bytes: u64, quota_gb: f64, warning_ratio: f64) -> CapacityReport {
    let ratio = (size_bytes as f64 / BYTES_PER_GIGABYTE) / quota_gb;

    if ratio >= 1.0 {
        return CapacityReport {
            warning: None,
            error: Some(CycleError::QuotaExceeded(format!(
                "Backup directory has reached the maximum size of {:?} GB",
                quota_gb
            ))),
        };
    }

    let warning = (ratio > warning_ratio).then(|| {
        format!(
            "Backup folder has ratio of {:?} of the maximum size of {:?} GB",
            round_to(ratio, 3),
            quota_gb
        )
    });

    CapacityReport {
        warning,
        error: None,
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
