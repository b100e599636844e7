//! Ignore-pattern filtering.
//!
//! Patterns come from a newline-delimited file. Entries ending in `/` are
//! directory patterns and match when the fragment occurs anywhere in the
//! normalized path. Every other entry is a glob matched against the base
//! filename only.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Contents written by `--init` when no ignore file exists.
pub const DEFAULT_IGNORE: &str = r"# Directories to exclude (must end with '/')
.git/
.idea/
.vscode/
__pycache__/
venv/
.venv/
node_modules/
target/
build/
dist/
tmp/
cache/
logs/
output/

# Files to exclude
*.pyc
*.pyo
*.pyd
.DS_Store
*.log
*.tmp
*.bak
*.swp
*.swo
.env
.env.*
*.lock
*.class
*.jar
*.bin
*.exe
*.dll
*.so
*.dylib

# Media
*.jpg
*.jpeg
*.png
*.gif
*.webp
*.mp3
*.mp4
*.mov
*.mkv

# Data and archives
*.csv
*.sqlite
*.db
*.parquet
*.tar
*.zip
*.gz
*.7z
*.rar
";

/// Compiled ignore patterns.
#[derive(Debug, Clone)]
pub struct IgnorePatterns {
    directories: GlobSet,
    files: GlobSet,
    len: usize,
}

impl Default for IgnorePatterns {
    fn default() -> Self {
        Self {
            directories: GlobSet::empty(),
            files: GlobSet::empty(),
            len: 0,
        }
    }
}

impl IgnorePatterns {
    /// Compiles patterns from an ordered list.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut directories = GlobSetBuilder::new();
        let mut files = GlobSetBuilder::new();
        let mut len = 0;

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }

            if let Some(fragment) = pattern.strip_suffix('/') {
                let fragment = fragment.trim_end_matches('/');
                if fragment.is_empty() {
                    continue;
                }
                directories.add(compile(pattern, &format!("*{fragment}*"))?);
            } else {
                files.add(compile(pattern, pattern)?);
            }
            len += 1;
        }

        Ok(Self {
            directories: build(directories)?,
            files: build(files)?,
            len,
        })
    }

    /// Parses the contents of an ignore file.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn parse(text: &str) -> Result<Self> {
        Self::new(pattern_lines(text))
    }

    /// Loads an ignore file. A missing file yields an empty pattern set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or contains an
    /// invalid pattern.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Ignore file {} not found, no paths will be ignored", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let patterns = Self::parse(&text)?;
        debug!("Loaded {} ignore patterns from {}", patterns.len(), path.display());
        Ok(patterns)
    }

    /// Returns true if the path, relative to the project root, is excluded.
    #[must_use]
    pub fn is_ignored(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");

        if self.directories.is_match(normalized.as_str()) {
            return true;
        }

        let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
        self.files.is_match(file_name)
    }

    /// Number of compiled patterns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true when no pattern was compiled.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Yields the meaningful lines of a pattern file: trimmed, without blank
/// lines or `#` comments.
pub(crate) fn pattern_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn compile(original: &str, glob: &str) -> Result<Glob> {
    Glob::new(glob).map_err(|e| Error::invalid_pattern(original, e.to_string()))
}

fn build(builder: GlobSetBuilder) -> Result<GlobSet> {
    builder
        .build()
        .map_err(|e| Error::config(format!("Failed to build glob set: {e}")))
}
