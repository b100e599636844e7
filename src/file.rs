use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const PROBE_SIZE: usize = 8192;

static BINARY_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "exe", "dll", "so", "dylib", "a", "o", "obj", "png", "jpg", "jpeg", "gif", "bmp", "ico",
        "webp", "mp3", "mp4", "avi", "mkv", "mov", "wav", "flac", "pdf", "doc", "docx", "xls",
        "xlsx", "ppt", "pptx", "zip", "tar", "gz", "bz2", "xz", "7z", "rar", "wasm", "pyc",
        "class",
    ]
    .into_iter()
    .collect()
});

/// A file discovered during the scan that passed ignore filtering and the
/// text probe.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// Path relative to the project root, always with `/` separators
    pub relative_path: String,

    /// Location on disk, used only to read the content
    #[serde(skip)]
    pub absolute_path: PathBuf,

    /// Size reported by filesystem metadata
    pub size_bytes: u64,

    /// Additive importance score, higher is more important
    pub importance: u32,

    /// Estimated token cost, filled in by the selector
    pub token_cost: usize,

    /// Decoded text, filled in by the selector
    #[serde(skip)]
    pub content: Option<String>,

    /// Set by the selector when the content could not be read; the file is
    /// then costed at zero and exported empty
    #[serde(skip)]
    pub unreadable: bool,
}

impl Candidate {
    /// Creates an unmeasured candidate.
    #[must_use]
    pub fn new(
        relative_path: impl Into<String>,
        absolute_path: impl Into<PathBuf>,
        size_bytes: u64,
        importance: u32,
    ) -> Self {
        Self {
            relative_path: normalize_separators(&relative_path.into()),
            absolute_path: absolute_path.into(),
            size_bytes,
            importance,
            token_cost: 0,
            content: None,
            unreadable: false,
        }
    }

    /// Returns the base filename.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Returns the flat filename used inside an export folder.
    #[must_use]
    pub fn export_name(&self) -> String {
        normalize_filename(&self.relative_path)
    }

    /// Returns the loaded content, or an empty string before loading.
    #[must_use]
    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Converts `\` separators to `/`.
#[must_use]
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Flattens a relative path into a single filename by replacing separators
/// with underscores.
#[must_use]
pub fn normalize_filename(path: &str) -> String {
    path.replace(['/', '\\'], "_")
}

/// Probes whether a file can be read as text.
///
/// Reads the first 8KB and rejects the file when it contains NUL bytes or is
/// not valid UTF-8. A multi-byte character cut off at the end of the sample is
/// tolerated.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub(crate) fn is_readable_text(path: &Path) -> Result<bool> {
    if has_binary_extension(path) {
        return Ok(false);
    }

    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::with_capacity(PROBE_SIZE, file);
    let mut buffer = [0u8; PROBE_SIZE];

    let bytes_read = reader.read(&mut buffer).map_err(|e| Error::io(path, e))?;
    let sample = &buffer[..bytes_read];

    if memchr::memchr(0, sample).is_some() {
        return Ok(false);
    }

    match std::str::from_utf8(sample) {
        Ok(_) => Ok(true),
        Err(e) => Ok(e.error_len().is_none()),
    }
}

/// Checks if a file extension suggests a binary file.
#[must_use]
pub(crate) fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(ext.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::io::Write;

    #[test]
    fn test_candidate_normalizes_separators() {
        let candidate = Candidate::new("src\\core\\main.py", "/p/src/core/main.py", 10, 5);
        assert_eq!(candidate.relative_path, "src/core/main.py");
        assert_eq!(candidate.file_name(), "main.py");
        assert_eq!(candidate.export_name(), "src_core_main.py");
    }

    #[test]
    fn test_candidate_content_defaults() {
        let mut candidate = Candidate::new("a.txt", "/p/a.txt", 3, 0);
        assert_eq!(candidate.content_str(), "");

        candidate.content = Some("one\ntwo".to_string());
        assert_eq!(candidate.content_str(), "one\ntwo");
    }

    #[test]
    fn test_normalize_filename() {
        assert_eq!(normalize_filename("a/b\\c.txt"), "a_b_c.txt");
        assert_eq!(normalize_filename("top.txt"), "top.txt");
    }

    #[test]
    fn test_text_file_is_readable() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("test.txt");
        file.write_str("Hello, world!\nsecond line\n").unwrap();

        assert!(is_readable_text(file.path()).unwrap());
    }

    #[test]
    fn test_empty_file_is_readable() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("empty.txt");
        file.touch().unwrap();

        assert!(is_readable_text(file.path()).unwrap());
    }

    #[test]
    fn test_nul_bytes_are_binary() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("data.dat");
        let mut f = File::create(file.path()).unwrap();
        f.write_all(&[b'a', 0, b'b']).unwrap();

        assert!(!is_readable_text(file.path()).unwrap());
    }

    #[test]
    fn test_invalid_utf8_is_binary() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("latin1.txt");
        file.write_binary(&[b'c', b'a', b'f', 0xE9, b' ', b'o', b'k']).unwrap();

        assert!(!is_readable_text(file.path()).unwrap());
    }

    #[test]
    fn test_binary_extension_short_circuits() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("image.PNG");
        file.write_str("not really an image").unwrap();

        assert!(!is_readable_text(file.path()).unwrap());
    }

    #[test]
    fn test_missing_file_errors() {
        let result = is_readable_text(Path::new("/nonexistent/file.txt"));
        assert!(result.is_err());
    }
}
