//! Importance scoring.
//!
//! Each rule contributes a fixed weight and rules are additive, so a file that
//! is both an important format and an important filename scores the sum.

use crate::error::{Error, Result};
use crate::filter::pattern_lines;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Weight for an extension listed in `important_formats`.
pub const EXTENSION_WEIGHT: u32 = 10;
/// Weight for a filename listed in `important_files`.
pub const FILENAME_WEIGHT: u32 = 20;
/// Weight for a path containing one of `important_paths`.
pub const PATH_WEIGHT: u32 = 5;
/// Weight for a match in the important-files pattern list.
pub const PATTERN_WEIGHT: u32 = 15;

/// Contents written by `--init` when no important-files list exists.
pub const DEFAULT_IMPORTANT_FILES: &str = r"# Important files, one glob pattern per line.
# Patterns match the project-relative path or the filename; `**` spans directories.

# Manifests and configuration
Cargo.toml
pyproject.toml
setup.py
package.json
config.toml
config.ini
.env.example

# Documentation
README.md
CONTRIBUTING.md
LICENSE
docs/**/*.md

# Entry points
main.*
src/main.*
src/lib.rs
app.py
index.js
manage.py

# Core code
src/**/*.rs
src/**/*.py
lib/**/*.js

# Tests
tests/**
test_*.py
*_test.py
";

/// Compiled important-files pattern list.
#[derive(Debug, Clone)]
pub struct ImportantPatterns {
    set: GlobSet,
    len: usize,
}

impl ImportantPatterns {
    /// Compiles a list of glob patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut len = 0;

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern)
                .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
            builder.add(glob);
            len += 1;
        }

        let set = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build glob set: {e}")))?;

        Ok(Self { set, len })
    }

    /// Parses the contents of an important-files list.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn parse(text: &str) -> Result<Self> {
        Self::new(pattern_lines(text))
    }

    /// Loads an important-files list from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or contains an
    /// invalid pattern.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&text)
    }

    /// Returns true if the relative path or its filename matches any pattern.
    #[must_use]
    pub fn is_match(&self, relative_path: &str, file_name: &str) -> bool {
        self.set.is_match(relative_path) || self.set.is_match(file_name)
    }

    /// Number of compiled patterns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true when the list is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Immutable scoring rules.
#[derive(Debug, Clone, Default)]
pub struct ImportanceRules {
    formats: HashSet<String>,
    files: HashSet<String>,
    paths: Vec<String>,
    patterns: Option<ImportantPatterns>,
}

impl ImportanceRules {
    /// Creates rules from the configured lists.
    ///
    /// Formats are compared case-insensitively and may be given with or
    /// without the leading dot. Blank entries are dropped.
    #[must_use]
    pub fn new<F, N, P>(formats: F, files: N, paths: P) -> Self
    where
        F: IntoIterator,
        F::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let formats = non_blank(formats)
            .map(|ext| {
                let ext = ext.to_lowercase();
                if ext.starts_with('.') { ext } else { format!(".{ext}") }
            })
            .collect();

        Self {
            formats,
            files: non_blank(files).collect(),
            paths: non_blank(paths).map(|p| p.replace('\\', "/")).collect(),
            patterns: None,
        }
    }

    /// Attaches a compiled pattern list.
    #[must_use]
    pub fn with_patterns(mut self, patterns: ImportantPatterns) -> Self {
        self.patterns = Some(patterns);
        self
    }

    /// Loads the pattern list from disk, keeping the rules usable when that
    /// fails: the pattern rule is then skipped.
    #[must_use]
    pub fn with_patterns_from(self, path: &Path) -> Self {
        match ImportantPatterns::load(path) {
            Ok(patterns) => {
                debug!("Loaded {} important patterns from {}", patterns.len(), path.display());
                self.with_patterns(patterns)
            }
            Err(e) => {
                warn!("Skipping important-files rule: {e}");
                self
            }
        }
    }

    /// Returns true if a pattern list is attached.
    #[must_use]
    pub const fn has_patterns(&self) -> bool {
        self.patterns.is_some()
    }

    /// Scores a project-relative path.
    #[must_use]
    pub fn score(&self, relative_path: &str) -> u32 {
        score(relative_path, self)
    }
}

/// Computes the additive importance of a project-relative path.
#[must_use]
pub fn score(relative_path: &str, rules: &ImportanceRules) -> u32 {
    let normalized = relative_path.replace('\\', "/");
    let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
    let mut importance = 0;

    if let Some(ext) = extension_of(file_name) {
        if rules.formats.contains(&ext) {
            importance += EXTENSION_WEIGHT;
        }
    }

    if rules.files.contains(file_name) {
        importance += FILENAME_WEIGHT;
    }

    if rules.paths.iter().any(|p| normalized.contains(p.as_str())) {
        importance += PATH_WEIGHT;
    }

    if let Some(patterns) = &rules.patterns {
        if patterns.is_match(&normalized, file_name) {
            importance += PATTERN_WEIGHT;
        }
    }

    importance
}

/// Lowercase extension with its leading dot. Dotfiles such as `.bashrc` have
/// no extension.
fn extension_of(file_name: &str) -> Option<String> {
    let dot = file_name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    Some(file_name[dot..].to_lowercase())
}

fn non_blank<I>(items: I) -> impl Iterator<Item = String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
}
