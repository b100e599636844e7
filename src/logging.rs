//! Per-run log files.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Default directory for run logs, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

const LOG_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<dir>/organizer_<YYYYMMDD_HHMMSS>.log`
#[must_use]
pub fn log_file_path(dir: &Path, started: NaiveDateTime) -> PathBuf {
    dir.join(format!(
        "organizer_{}.log",
        started.format(LOG_TIMESTAMP_FORMAT)
    ))
}

/// Creates `dir` if needed and opens a fresh log file for this run.
///
/// # Errors
///
/// Returns an error if the directory or the file cannot be created.
pub fn create_log_file(dir: &Path, started: NaiveDateTime) -> Result<(PathBuf, File)> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let path = log_file_path(dir, started);
    let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
    Ok((path, file))
}
