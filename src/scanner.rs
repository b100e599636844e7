use crate::{
    error::{Error, Result},
    file::{Candidate, is_readable_text, normalize_separators},
    filter::IgnorePatterns,
    scorer::ImportanceRules,
};
use ignore::{DirEntry, WalkBuilder};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, trace, warn};

/// Statistics collected during scanning.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    /// Files visited after directory pruning
    pub total_files: usize,

    /// Files that became candidates
    pub candidates: usize,

    /// Files skipped by an ignore pattern
    pub ignored_files: usize,

    /// Files rejected by the text probe
    pub binary_files: usize,

    /// Walk or read errors (non-fatal)
    pub errors: usize,
}

/// Walks a project and produces scored candidates.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    ignore: IgnorePatterns,
    rules: ImportanceRules,
}

impl Scanner {
    /// Creates a scanner over `root_dir`.
    pub(crate) fn new(root_dir: impl Into<PathBuf>, ignore: IgnorePatterns, rules: ImportanceRules) -> Self {
        Self {
            root_dir: root_dir.into(),
            ignore,
            rules,
        }
    }

    /// Scans the root directory.
    ///
    /// Ignored directories are pruned before descent, so nothing beneath them
    /// is visited. Candidates come back sorted by relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if no candidate is found.
    pub(crate) fn scan(&self) -> Result<(Vec<Candidate>, ScanStats)> {
        let mut stats = ScanStats::default();
        let mut candidates = Vec::new();

        debug!("Starting scan of {}", self.root_dir.display());

        let root = self.root_dir.clone();
        let prune = self.ignore.clone();
        let walker = WalkBuilder::new(&self.root_dir)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                // Directories only; files are counted in the loop below
                if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
                    return true;
                }
                let keep = !prune.is_ignored(&relative_path(entry.path(), &root));
                if !keep {
                    trace!("Pruned directory {}", entry.path().display());
                }
                keep
            })
            .build();

        for result in walker {
            match result {
                Ok(entry) if is_file_entry(&entry) => {
                    stats.total_files += 1;
                    if let Some(candidate) = self.process_entry(&entry, &mut stats) {
                        candidates.push(candidate);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Walk error: {}", e);
                    stats.errors += 1;
                }
            }
        }

        stats.candidates = candidates.len();
        debug!(
            "Scan complete: {} total, {} candidates, {} ignored, {} binary, {} errors",
            stats.total_files, stats.candidates, stats.ignored_files, stats.binary_files, stats.errors
        );

        if candidates.is_empty() {
            return Err(Error::no_files(&self.root_dir));
        }

        // Sort for deterministic ordering
        candidates.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        Ok((candidates, stats))
    }

    /// Turns one file entry into a candidate, or records why it was skipped.
    fn process_entry(&self, entry: &DirEntry, stats: &mut ScanStats) -> Option<Candidate> {
        let path = entry.path();
        let relative = relative_path(path, &self.root_dir);

        if self.ignore.is_ignored(&relative) {
            trace!("Ignored {}", relative);
            stats.ignored_files += 1;
            return None;
        }

        match is_readable_text(path) {
            Ok(true) => {}
            Ok(false) => {
                trace!("Skipping non-text file {}", relative);
                stats.binary_files += 1;
                return None;
            }
            Err(e) => {
                warn!("Failed to probe {}: {}", relative, e);
                stats.errors += 1;
                return None;
            }
        }

        let size = match fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!("Failed to stat {}: {}", path.display(), e);
                stats.errors += 1;
                return None;
            }
        };

        let importance = self.rules.score(&relative);
        trace!("Candidate {} (importance {}, {} bytes)", relative, importance, size);

        Some(Candidate::new(relative, path, size, importance))
    }
}

/// Regular files, plus symlinks that resolve to a file. Links to
/// directories are never followed.
fn is_file_entry(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Some(t) if t.is_file() => true,
        Some(t) if t.is_symlink() => {
            let target_is_file = entry.path().is_file();
            if !target_is_file {
                trace!("Not following link {}", entry.path().display());
            }
            target_is_file
        }
        _ => false,
    }
}

/// Root-relative path with `/` separators.
pub(crate) fn relative_path(path: &Path, root: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    normalize_separators(&relative.to_string_lossy())
}
