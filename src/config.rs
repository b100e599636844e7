use crate::error::{Error, Result};
use crate::scorer::ImportanceRules;
use crate::token::TokenizerKind;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_MAX_TOKENS: usize = 60_000;
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_IGNORE_FILE: &str = ".ignore";
const DEFAULT_IMPORTANT_FILES_PATH: &str = "important_files.txt";
const DEFAULT_IMPORTANT_FORMATS: &[&str] = &[".py", ".md", ".txt", ".json"];
const DEFAULT_IMPORTANT_FILES: &[&str] = &["README.md", "requirements.txt", "setup.py"];
const DEFAULT_IMPORTANT_PATHS: &[&str] = &["src/", "docs/"];

/// Contents written by `--init` when no settings file exists.
pub const DEFAULT_CONFIG: &str = r#"# Relative paths are resolved against the directory of this file.

[settings]
# Project to organize (required)
path = "."
output_dir = "output"
max_tokens = 60000
ignore = ".ignore"
important_files_path = "important_files.txt"
generate_structure = true
generate_readme = true
open_output_folder = true

[file_importance]
important_formats = ".rs,.py,.md,.txt,.toml,.json,.yaml,.yml,.sh,.js,.jsx,.ts,.tsx,.html,.css,.sql"
important_files = "README.md,Cargo.toml,pyproject.toml,setup.py,requirements.txt,package.json,Dockerfile,Makefile,LICENSE"
important_paths = "src/,docs/,scripts/,config/"

[api_settings]
extract_endpoints = false
"#;

/// Configuration for the organizer pipeline.
///
/// Use [`Config::builder()`] or [`ConfigBuilder::from_file`] to construct one.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Project directory to scan
    pub root_dir: PathBuf,

    /// Base directory for exports and reports
    pub output_dir: PathBuf,

    /// Token budget for one export batch
    pub max_tokens: usize,

    /// Ignore-pattern file
    pub ignore_file: PathBuf,

    /// Important-files pattern list
    pub important_files_path: PathBuf,

    /// Extensions that raise importance
    pub important_formats: Vec<String>,

    /// Exact filenames that raise importance
    pub important_files: Vec<String>,

    /// Path fragments that raise importance
    pub important_paths: Vec<String>,

    /// Write `<project>_structure.json` into the export folder
    pub generate_structure: bool,

    /// Write `<project>_README.md` into the export folder
    pub generate_readme: bool,

    /// Reveal the export folder once the run completes
    pub open_output_folder: bool,

    /// Write `<project>_endpoints.json` next to the file report
    pub extract_endpoints: bool,

    /// Tokenizer implementation to use
    pub tokenizer: TokenizerKind,

    /// Dry run mode (no file writes)
    pub dry_run: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_organizer::Config;
    ///
    /// let config = Config::builder()
    ///     .root_dir(".")
    ///     .max_tokens(30_000)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Root directory doesn't exist or is not a directory
    /// - The token budget is zero
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.exists() {
            return Err(Error::config(format!(
                "Project path does not exist: {}",
                self.root_dir.display()
            )));
        }

        if !self.root_dir.is_dir() {
            return Err(Error::config(format!(
                "Project path is not a directory: {}",
                self.root_dir.display()
            )));
        }

        if self.max_tokens == 0 {
            return Err(Error::config("max_tokens must be greater than 0"));
        }

        Ok(())
    }

    /// Returns the project name: the last component of the root directory.
    #[must_use]
    pub fn project_name(&self) -> String {
        let resolved = fs::canonicalize(&self.root_dir).unwrap_or_else(|_| self.root_dir.clone());
        resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    }

    /// Directory holding every batch and report for this project.
    #[must_use]
    pub fn project_output_dir(&self) -> PathBuf {
        self.output_dir.join(self.project_name())
    }

    /// Builds the scoring rules, loading the important-files list best-effort.
    #[must_use]
    pub fn importance_rules(&self) -> ImportanceRules {
        ImportanceRules::new(
            &self.important_formats,
            &self.important_files,
            &self.important_paths,
        )
        .with_patterns_from(&self.important_files_path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_tokens: DEFAULT_MAX_TOKENS,
            ignore_file: PathBuf::from(DEFAULT_IGNORE_FILE),
            important_files_path: PathBuf::from(DEFAULT_IMPORTANT_FILES_PATH),
            important_formats: to_strings(DEFAULT_IMPORTANT_FORMATS),
            important_files: to_strings(DEFAULT_IMPORTANT_FILES),
            important_paths: to_strings(DEFAULT_IMPORTANT_PATHS),
            generate_structure: true,
            generate_readme: true,
            open_output_folder: true,
            extract_endpoints: false,
            tokenizer: TokenizerKind::default(),
            dry_run: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    max_tokens: Option<usize>,
    ignore_file: Option<PathBuf>,
    important_files_path: Option<PathBuf>,
    important_formats: Option<Vec<String>>,
    important_files: Option<Vec<String>>,
    important_paths: Option<Vec<String>>,
    generate_structure: Option<bool>,
    generate_readme: Option<bool>,
    open_output_folder: Option<bool>,
    extract_endpoints: bool,
    tokenizer: Option<TokenizerKind>,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Reads a settings file into a builder.
    ///
    /// Relative `path`, `output_dir`, `ignore` and `important_files_path`
    /// entries are resolved against the settings file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, is not valid TOML, or lacks
    /// `settings.path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::config_not_found(path));
        }

        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let builder = Self::from_toml(&text, base)?;
        debug!("Configuration loaded from {}", path.display());
        Ok(builder)
    }

    /// Parses settings text. `base` anchors every relative path setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or lacks `settings.path`.
    pub fn from_toml(text: &str, base: &Path) -> Result<Self> {
        let file: SettingsFile = toml::from_str(text)?;
        let settings = file.settings;

        let root_dir = settings
            .path
            .ok_or_else(|| Error::config("Missing required setting: path in [settings]"))?;

        let anchor = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };

        Ok(Self {
            root_dir: Some(anchor(root_dir)),
            output_dir: settings.output_dir.map(anchor),
            max_tokens: settings.max_tokens,
            ignore_file: settings.ignore.map(anchor),
            important_files_path: settings.important_files_path.map(anchor),
            important_formats: file.file_importance.important_formats.map(StringList::into_vec),
            important_files: file.file_importance.important_files.map(StringList::into_vec),
            important_paths: file.file_importance.important_paths.map(StringList::into_vec),
            generate_structure: settings.generate_structure,
            generate_readme: settings.generate_readme,
            open_output_folder: settings.open_output_folder,
            extract_endpoints: file.api_settings.extract_endpoints.unwrap_or(false),
            tokenizer: None,
            dry_run: false,
        })
    }

    /// Sets the project directory to scan.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Sets the base output directory.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the token budget.
    #[must_use]
    pub fn max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Sets the ignore-pattern file.
    #[must_use]
    pub fn ignore_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignore_file = Some(path.into());
        self
    }

    /// Sets the important-files pattern list.
    #[must_use]
    pub fn important_files_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.important_files_path = Some(path.into());
        self
    }

    /// Sets the extensions that raise importance.
    #[must_use]
    pub fn important_formats(mut self, formats: Vec<String>) -> Self {
        self.important_formats = Some(formats);
        self
    }

    /// Sets the exact filenames that raise importance.
    #[must_use]
    pub fn important_files(mut self, files: Vec<String>) -> Self {
        self.important_files = Some(files);
        self
    }

    /// Sets the path fragments that raise importance.
    #[must_use]
    pub fn important_paths(mut self, paths: Vec<String>) -> Self {
        self.important_paths = Some(paths);
        self
    }

    /// Enables or disables the structure artifact.
    #[must_use]
    pub fn generate_structure(mut self, enabled: bool) -> Self {
        self.generate_structure = Some(enabled);
        self
    }

    /// Enables or disables the README artifact.
    #[must_use]
    pub fn generate_readme(mut self, enabled: bool) -> Self {
        self.generate_readme = Some(enabled);
        self
    }

    /// Enables or disables revealing the export folder.
    #[must_use]
    pub fn open_output_folder(mut self, enabled: bool) -> Self {
        self.open_output_folder = Some(enabled);
        self
    }

    /// Enables or disables endpoint extraction.
    #[must_use]
    pub fn extract_endpoints(mut self, enabled: bool) -> Self {
        self.extract_endpoints = enabled;
        self
    }

    /// Sets the tokenizer implementation.
    #[must_use]
    pub fn tokenizer(mut self, kind: TokenizerKind) -> Self {
        self.tokenizer = Some(kind);
        self
    }

    /// Enables dry run mode (no file writes).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();
        let config = Config {
            root_dir: self.root_dir.unwrap_or(defaults.root_dir),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            ignore_file: self.ignore_file.unwrap_or(defaults.ignore_file),
            important_files_path: self
                .important_files_path
                .unwrap_or(defaults.important_files_path),
            important_formats: self.important_formats.unwrap_or(defaults.important_formats),
            important_files: self.important_files.unwrap_or(defaults.important_files),
            important_paths: self.important_paths.unwrap_or(defaults.important_paths),
            generate_structure: self.generate_structure.unwrap_or(true),
            generate_readme: self.generate_readme.unwrap_or(true),
            open_output_folder: self.open_output_folder.unwrap_or(true),
            extract_endpoints: self.extract_endpoints,
            tokenizer: self.tokenizer.unwrap_or_default(),
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    settings: RawSettings,
    #[serde(default)]
    file_importance: RawImportance,
    #[serde(default)]
    api_settings: RawApiSettings,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    max_tokens: Option<usize>,
    ignore: Option<PathBuf>,
    important_files_path: Option<PathBuf>,
    generate_structure: Option<bool>,
    generate_readme: Option<bool>,
    open_output_folder: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawImportance {
    important_formats: Option<StringList>,
    important_files: Option<StringList>,
    important_paths: Option<StringList>,
}

#[derive(Debug, Default, Deserialize)]
struct RawApiSettings {
    extract_endpoints: Option<bool>,
}

/// A list given either as a comma-separated string or a TOML array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringList {
    Csv(String),
    Items(Vec<String>),
}

impl StringList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Csv(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Self::Items(items) => items,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
