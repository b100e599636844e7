//! # llm-organizer
//!
//! Picks the most important files of a project that fit in an LLM token
//! budget and exports them as a flat, numbered batch ready to paste or upload.
//!
//! ## Features
//!
//! - Directory pruning from a glob ignore list, before descent
//! - Importance scoring from extensions, filenames, path fragments and patterns
//! - Greedy budget filling, highest importance first, structure overhead included
//! - Numbered export batches with a `_SUMMARY.txt` accounting file
//! - Optional project tree, generated README and HTTP endpoint inventory
//!
//! ## Quick Start
//!
//! ```no_run
//! use llm_organizer::{Config, Pipeline, PipelineOutcome};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .root_dir("./my_project")
//!     .output_dir("./output")
//!     .max_tokens(60_000)
//!     .build()?;
//!
//! match Pipeline::new(config)?.run()? {
//!     PipelineOutcome::Completed(stats) => stats.print_summary(),
//!     PipelineOutcome::NothingSelected { .. } => eprintln!("nothing fits"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Scanner**: Walks the project, prunes ignored paths, scores candidates
//! 2. **Selector**: Costs candidates in tokens and fills the budget
//! 3. **Export**: Allocates the next batch folder and names it
//! 4. **Writer**: Copies files and renders the summary and artifacts

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod export;
mod file;
mod filter;
mod logging;
mod pipeline;
mod scanner;
mod scorer;
mod selector;
mod template;
mod token;
mod writer;

pub mod endpoints;
pub mod readme;
pub mod report;
pub mod structure;
pub mod summary;

pub use config::{Config, ConfigBuilder, DEFAULT_CONFIG};
pub use error::{Error, Result};
pub use export::{ExportBatch, create_export_folder, next_batch_name};
pub use file::{Candidate, normalize_filename, normalize_separators};
pub use filter::{DEFAULT_IGNORE, IgnorePatterns};
pub use logging::{DEFAULT_LOG_DIR, create_log_file, log_file_path};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineStats};
pub use scanner::ScanStats;
pub use scorer::{
    DEFAULT_IMPORTANT_FILES, EXTENSION_WEIGHT, FILENAME_WEIGHT, ImportanceRules,
    ImportantPatterns, PATH_WEIGHT, PATTERN_WEIGHT, score,
};
pub use selector::{
    ContentLoader, Excluded, ExclusionReason, FsLoader, SelectionResult, Selector,
};
pub use summary::{SummaryReport, build_summary};
pub use token::{TokenEstimator, TokenizerKind, estimate_structure};
pub use writer::{SUMMARY_FILE, write_default};

/// Runs the complete organizer pipeline with the given configuration.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - Root directory doesn't exist or is inaccessible
/// - No candidate files are found
/// - The export folder or its files cannot be written
///
/// # Examples
///
/// ```no_run
/// use llm_organizer::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .root_dir(".")
///     .build()?;
///
/// run(config)?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineOutcome> {
    Pipeline::new(config)?.run()
}
