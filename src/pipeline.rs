use crate::{
    config::Config,
    endpoints::{extract_endpoints, group_by_prefix},
    error::Result,
    export::create_export_folder,
    file::Candidate,
    filter::IgnorePatterns,
    readme::ReadmeContext,
    report::FileReport,
    scanner::{ScanStats, Scanner},
    selector::{SelectionResult, Selector},
    structure::{StructureNode, attach_content, build_structure},
    summary::{SummaryReport, build_summary},
    writer::Writer,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Project name derived from the root directory
    pub project_name: String,

    /// Files visited by the walker
    pub total_files: usize,

    /// Files that passed filtering and the text probe
    pub candidates: usize,

    /// Files skipped by an ignore pattern
    pub ignored_files: usize,

    /// Files rejected as non-text
    pub binary_files: usize,

    /// Files that made the cut
    pub selected_files: usize,

    /// Files left out for budget reasons
    pub excluded_files: usize,

    /// Tokens used, structure overhead included
    pub total_tokens: usize,

    /// Structure overhead
    pub structure_tokens: usize,

    /// Token budget
    pub max_tokens: usize,

    /// Files copied into the export folder
    pub files_written: usize,

    /// Auxiliary artifacts written
    pub artifacts_written: usize,

    /// Unique endpoints found (when extraction is enabled)
    pub endpoints_found: usize,

    /// Export folder, `None` on a dry run
    pub export_dir: Option<PathBuf>,

    /// Total execution time
    pub duration: Duration,

    /// Time spent scanning
    pub scan_duration: Duration,

    /// Time spent selecting
    pub select_duration: Duration,

    /// Time spent writing
    pub write_duration: Duration,
}

impl PipelineStats {
    fn new(project_name: String, scan: &ScanStats, summary: &SummaryReport) -> Self {
        Self {
            project_name,
            total_files: scan.total_files,
            candidates: scan.candidates,
            ignored_files: scan.ignored_files,
            binary_files: scan.binary_files,
            selected_files: summary.selected_count,
            excluded_files: summary.excluded_count,
            total_tokens: summary.total_tokens,
            structure_tokens: summary.structure_tokens,
            max_tokens: summary.max_tokens,
            ..Self::default()
        }
    }

    /// Budget usage as a percentage.
    #[must_use]
    pub fn usage_percent(&self) -> f64 {
        if self.max_tokens == 0 {
            0.0
        } else {
            self.total_tokens as f64 / self.max_tokens as f64 * 100.0
        }
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║            Export Summary                             ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!("║ Project:              {:<32}║", self.project_name);
        println!("║ Files Visited:        {:>8}                        ║", self.total_files);
        println!("║   - Candidates:       {:>8}                        ║", self.candidates);
        println!("║   - Ignored:          {:>8}                        ║", self.ignored_files);
        println!("║   - Non-text:         {:>8}                        ║", self.binary_files);
        println!("║                                                       ║");
        println!("║ Selected Files:       {:>8}                        ║", self.selected_files);
        println!("║ Excluded Files:       {:>8}                        ║", self.excluded_files);
        println!(
            "║ Tokens Used:          {:>8} / {:<8} ({:>5.1}%)      ║",
            self.total_tokens,
            self.max_tokens,
            self.usage_percent()
        );
        println!("║   - Structure:        {:>8}                        ║", self.structure_tokens);
        println!("║                                                       ║");
        match &self.export_dir {
            Some(dir) => {
                println!("║ Files Written:        {:>8}                        ║", self.files_written);
                println!("║ Artifacts Written:    {:>8}                        ║", self.artifacts_written);
                println!("║ Export Folder:                                        ║");
                println!("║   {}", dir.display());
            }
            None => println!("║ ⚠ No files were written (dry run mode)               ║"),
        }
        println!("║                                                       ║");
        println!("║ Timing Breakdown:                                     ║");
        println!("║   - Scanning:         {:>8.2}s                     ║", self.scan_duration.as_secs_f64());
        println!("║   - Selecting:        {:>8.2}s                     ║", self.select_duration.as_secs_f64());
        println!("║   - Writing:          {:>8.2}s                     ║", self.write_duration.as_secs_f64());
        println!("║   - Total:            {:>8.2}s                     ║", self.duration.as_secs_f64());
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Files were selected (and written, unless this was a dry run)
    Completed(PipelineStats),

    /// Not a single candidate fit in the budget; nothing was exported
    NothingSelected {
        /// Number of candidates that were evaluated
        candidates: usize,
        /// Overhead reserved before any file
        structure_tokens: usize,
        /// Token budget
        max_tokens: usize,
    },
}

/// Scan, select and export orchestrator.
pub struct Pipeline {
    config: Config,
    project_name: String,
    ignore: IgnorePatterns,
    scanner: Scanner,
    selector: Selector,
    writer: Writer,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The ignore file contains an invalid pattern
    /// - Writer initialization fails
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let ignore = IgnorePatterns::load(&config.ignore_file)?;
        let scanner = Scanner::new(&config.root_dir, ignore.clone(), config.importance_rules());
        let selector = Selector::with_fs(config.tokenizer.create());
        let writer = Writer::new()?;

        Ok(Self {
            project_name: config.project_name(),
            config,
            ignore,
            scanner,
            selector,
            writer,
        })
    }

    /// Executes the complete pipeline.
    ///
    /// # Process
    ///
    /// 1. **Scan**: walk the project, prune ignored paths, score candidates
    /// 2. **Select**: cost every candidate and fill the budget greedily
    /// 3. **Export**: create the numbered batch folder, copy the files and
    ///    write the summary, then the auxiliary artifacts
    ///
    /// # Errors
    ///
    /// Returns an error if scanning finds nothing or the export folder and
    /// its core files cannot be written. Auxiliary artifacts only log.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use llm_organizer::{Config, Pipeline, PipelineOutcome};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .root_dir("./my_project")
    ///     .build()?;
    ///
    /// if let PipelineOutcome::Completed(stats) = Pipeline::new(config)?.run()? {
    ///     stats.print_summary();
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(root_dir = %self.config.root_dir.display()))]
    pub fn run(self) -> Result<PipelineOutcome> {
        let start_time = Instant::now();

        info!("Starting pipeline for project '{}'", self.project_name);

        // Stage 1: Scanning
        info!("Stage 1/3: Scanning project...");
        let scan_start = Instant::now();
        let (candidates, scan_stats) = self.scanner.scan()?;
        let scan_duration = scan_start.elapsed();

        info!(
            "✓ Found {} candidates ({} visited, {} ignored, {} non-text) in {:.2}s",
            scan_stats.candidates,
            scan_stats.total_files,
            scan_stats.ignored_files,
            scan_stats.binary_files,
            scan_duration.as_secs_f64()
        );

        // Stage 2: Selection
        info!("Stage 2/3: Selecting files within {} tokens...", self.config.max_tokens);
        let select_start = Instant::now();
        let selection = self.selector.select(candidates, self.config.max_tokens);
        let select_duration = select_start.elapsed();

        if selection.is_empty() {
            warn!(
                "No file fits in {} tokens ({} reserved for the structure of {} candidates)",
                self.config.max_tokens,
                selection.structure_tokens,
                selection.candidate_count()
            );
            return Ok(PipelineOutcome::NothingSelected {
                candidates: selection.candidate_count(),
                structure_tokens: selection.structure_tokens,
                max_tokens: self.config.max_tokens,
            });
        }

        let summary = build_summary(&selection, self.config.max_tokens);
        info!(
            "✓ Selected {} of {} files, {} / {} tokens ({}%)",
            summary.selected_count,
            summary.analyzed_count(),
            summary.total_tokens,
            summary.max_tokens,
            summary.usage_display()
        );

        let mut stats = PipelineStats::new(self.project_name.clone(), &scan_stats, &summary);
        stats.scan_duration = scan_duration;
        stats.select_duration = select_duration;

        // Stage 3: Export
        let write_start = Instant::now();
        if self.config.dry_run {
            warn!("Dry run mode enabled - skipping file writes");
            self.log_dry_run(&summary);
        } else {
            info!("Stage 3/3: Writing export...");
            self.export(&selection, &summary, &mut stats)?;
        }
        stats.write_duration = write_start.elapsed();
        stats.duration = start_time.elapsed();

        info!(
            "✓ Pipeline completed successfully in {:.2}s",
            stats.duration.as_secs_f64()
        );

        Ok(PipelineOutcome::Completed(stats))
    }

    /// Writes the batch folder, its files and every enabled artifact.
    fn export(
        &self,
        selection: &SelectionResult,
        summary: &SummaryReport,
        stats: &mut PipelineStats,
    ) -> Result<()> {
        let now = chrono::Local::now();
        let date = now.format(DATE_FORMAT).to_string();
        let project = self.project_name.as_str();

        let (batch, export_dir) =
            create_export_folder(&self.config.output_dir, project, now.naive_local())?;
        let project_dir = self.config.project_output_dir();
        info!("Export batch #{} at {}", batch.sequence_number, export_dir.display());

        stats.files_written = self.writer.copy_files(&export_dir, &selection.selected)?;
        self.writer
            .write_summary(&export_dir, project, &date, summary)?;

        let report = FileReport::new(project, date, selection);
        best_effort(stats, "file report", || {
            self.writer.write_report(&project_dir, &report)
        });

        if self.config.generate_structure || self.config.generate_readme {
            match self.structure(&selection.selected) {
                Ok(tree) => self.write_tree_artifacts(&export_dir, &tree, selection, stats),
                Err(e) => warn!("Skipping structure and README: {e}"),
            }
        }

        if self.config.extract_endpoints {
            self.write_endpoints(&project_dir, selection, stats);
        }

        stats.export_dir = Some(export_dir);
        Ok(())
    }

    fn structure(&self, selected: &[Candidate]) -> Result<StructureNode> {
        let mut tree = build_structure(&self.config.root_dir, &self.ignore)?;
        attach_content(&mut tree, selected);
        Ok(tree)
    }

    fn write_tree_artifacts(
        &self,
        export_dir: &Path,
        tree: &StructureNode,
        selection: &SelectionResult,
        stats: &mut PipelineStats,
    ) {
        if self.config.generate_structure {
            best_effort(stats, "structure", || {
                self.writer
                    .write_structure(export_dir, &self.project_name, tree)
            });
        }

        if self.config.generate_readme {
            let readme = ReadmeContext::new(
                &self.project_name,
                tree,
                &selection.selected,
                self.config.max_tokens,
            );
            best_effort(stats, "README", || self.writer.write_readme(export_dir, &readme));
        }
    }

    fn write_endpoints(&self, project_dir: &Path, selection: &SelectionResult, stats: &mut PipelineStats) {
        info!("Extracting API endpoints...");
        let endpoints = extract_endpoints(&selection.selected);
        stats.endpoints_found = endpoints.len();

        if endpoints.is_empty() {
            info!("No API endpoints found");
            return;
        }

        info!("Found {} unique endpoints", endpoints.len());
        let groups = group_by_prefix(&endpoints);
        best_effort(stats, "endpoints", || {
            self.writer
                .write_endpoints(project_dir, &self.project_name, &groups)
        });
    }

    /// Logs what a real run would have exported.
    fn log_dry_run(&self, summary: &SummaryReport) {
        for group in &summary.selected {
            for file in &group.files {
                info!(
                    "  [{}] {} ({} tokens)",
                    group.importance, file.path, file.tokens
                );
            }
        }
        info!(
            "{} files would be exported to {}",
            summary.selected_count,
            self.config.project_output_dir().display()
        );
    }
}

/// Runs an auxiliary write: failures are logged and skipped.
fn best_effort<F>(stats: &mut PipelineStats, what: &str, write: F)
where
    F: FnOnce() -> Result<PathBuf>,
{
    match write() {
        Ok(path) => {
            stats.artifacts_written += 1;
            debug!("Wrote {} to {}", what, path.display());
        }
        Err(e) => warn!("Failed to write {what}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn project(temp: &TempDir) -> std::path::PathBuf {
        let root = temp.child("demo");
        root.child("README.md").write_str("# Demo\nSmall demo project.\n").unwrap();
        root.child("src/app.py")
            .write_str("@app.route('/api/users')\ndef users():\n    return []\n")
            .unwrap();
        root.child("notes.txt").write_str("remember the milk").unwrap();
        root.path().to_path_buf()
    }

    fn config(temp: &TempDir, root: &Path) -> crate::config::ConfigBuilder {
        Config::builder()
            .root_dir(root)
            .output_dir(temp.path().join("out"))
            .ignore_file(temp.path().join(".ignore"))
            .important_files_path(temp.path().join("important_files.txt"))
    }

    #[test]
    fn test_pipeline_exports_batch() {
        let temp = TempDir::new().unwrap();
        let root = project(&temp);

        let config = config(&temp, &root).extract_endpoints(true).build().unwrap();
        let outcome = Pipeline::new(config).unwrap().run().unwrap();

        let PipelineOutcome::Completed(stats) = outcome else {
            panic!("expected an export");
        };
        assert_eq!(stats.selected_files, 3);
        assert_eq!(stats.files_written, 3);
        assert_eq!(stats.endpoints_found, 1);
        // report, structure, README, endpoints
        assert_eq!(stats.artifacts_written, 4);

        let export_dir = stats.export_dir.unwrap();
        assert!(export_dir.join("src_app.py").is_file());
        assert!(export_dir.join("_SUMMARY.txt").is_file());
        assert!(export_dir.join("demo_structure.json").is_file());
        assert!(export_dir.join("demo_README.md").is_file());

        let project_dir = temp.path().join("out/demo");
        assert!(project_dir.join("demo_file_report.json").is_file());
        assert!(project_dir.join("demo_endpoints.json").is_file());
    }

    #[test]
    fn test_pipeline_dry_run() {
        let temp = TempDir::new().unwrap();
        let root = project(&temp);

        let config = config(&temp, &root).dry_run(true).build().unwrap();
        let outcome = Pipeline::new(config).unwrap().run().unwrap();

        let PipelineOutcome::Completed(stats) = outcome else {
            panic!("expected a completed dry run");
        };
        assert_eq!(stats.files_written, 0);
        assert!(stats.export_dir.is_none());
        assert!(!temp.child("out").exists());
    }

    #[test]
    fn test_pipeline_nothing_fits() {
        let temp = TempDir::new().unwrap();
        let root = project(&temp);

        let config = config(&temp, &root).max_tokens(1).build().unwrap();
        let outcome = Pipeline::new(config).unwrap().run().unwrap();

        assert!(matches!(
            outcome,
            PipelineOutcome::NothingSelected { candidates: 3, max_tokens: 1, .. }
        ));
        assert!(!temp.child("out").exists());
    }

    #[test]
    fn test_pipeline_skips_disabled_artifacts() {
        let temp = TempDir::new().unwrap();
        let root = project(&temp);

        let config = config(&temp, &root)
            .generate_structure(false)
            .generate_readme(false)
            .build()
            .unwrap();
        let PipelineOutcome::Completed(stats) = Pipeline::new(config).unwrap().run().unwrap() else {
            panic!("expected an export");
        };

        // file report only
        assert_eq!(stats.artifacts_written, 1);
        assert!(!stats.export_dir.unwrap().join("demo_structure.json").exists());
    }

    #[test]
    fn test_invalid_ignore_pattern_is_fatal() {
        let temp = TempDir::new().unwrap();
        let root = project(&temp);
        temp.child(".ignore").write_str("[broken\n").unwrap();

        let config = config(&temp, &root).build().unwrap();
        assert!(Pipeline::new(config).is_err());
    }

    #[test]
    fn test_usage_percent() {
        let stats = PipelineStats {
            total_tokens: 450,
            max_tokens: 600,
            ..PipelineStats::default()
        };
        assert!((stats.usage_percent() - 75.0).abs() < f64::EPSILON);
    }
}
