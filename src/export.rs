//! Export batch naming.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const PREFIX_CHARS: usize = 5;
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One run's destination folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBatch {
    /// One more than the highest number already used by the project
    pub sequence_number: u64,

    /// Folder name: `{sequence:03}_{prefix}_{timestamp}`
    pub name: String,
}

/// Computes the next batch name for a project.
///
/// The sequence number is one more than the largest numeric prefix among
/// `existing` (text before the first `_`), so numbers never repeat even when
/// older batches are deleted. Names without a numeric prefix are ignored.
///
/// # Errors
///
/// Returns an error if an existing prefix is too large to be followed by
/// another number.
pub fn next_batch_name<I, S>(
    existing: I,
    project_name: &str,
    now: NaiveDateTime,
) -> Result<ExportBatch>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut highest = 0u64;
    for name in existing {
        let name = name.as_ref();
        let Some(digits) = numeric_prefix(name) else {
            continue;
        };
        let value: u64 = digits
            .parse()
            .map_err(|_| Error::sequence_exhausted(name))?;
        highest = highest.max(value);
    }

    let sequence_number = highest
        .checked_add(1)
        .ok_or_else(|| Error::sequence_exhausted(highest.to_string()))?;

    let prefix: String = project_name.chars().take(PREFIX_CHARS).collect();
    let name = format!(
        "{sequence_number:03}_{prefix}_{}",
        now.format(TIMESTAMP_FORMAT)
    );

    Ok(ExportBatch {
        sequence_number,
        name,
    })
}

/// Creates `<output_dir>/<project_name>/<next batch>` and returns its path.
///
/// # Errors
///
/// Returns an error if the project directory cannot be listed, the sequence
/// is exhausted, or the batch folder cannot be created.
pub fn create_export_folder(
    output_dir: &Path,
    project_name: &str,
    now: NaiveDateTime,
) -> Result<(ExportBatch, PathBuf)> {
    let project_dir = output_dir.join(project_name);
    fs::create_dir_all(&project_dir).map_err(|e| Error::io(&project_dir, e))?;

    let existing = existing_batches(&project_dir)?;
    let batch = next_batch_name(&existing, project_name, now)?;
    let path = project_dir.join(&batch.name);

    fs::create_dir(&path).map_err(|e| Error::io(&path, e))?;
    debug!("Created export folder {}", path.display());

    Ok((batch, path))
}

/// Lists the directory names directly inside a project output folder.
fn existing_batches(project_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(project_dir).map_err(|e| Error::io(project_dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(project_dir, e))?;
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Leading all-digit segment of a batch name, if any.
fn numeric_prefix(name: &str) -> Option<&str> {
    let head = name.split('_').next()?;
    if head.is_empty() || !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(head)
}
