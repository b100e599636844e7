use crate::{
    endpoints::EndpointGroups,
    error::{Error, Result},
    file::Candidate,
    readme::ReadmeContext,
    report::FileReport,
    structure::{self, StructureNode},
    summary::SummaryReport,
    template::TemplateEngine,
};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Name of the accounting file inside every export folder.
pub const SUMMARY_FILE: &str = "_SUMMARY.txt";

/// Writes the files and artifacts of an export batch.
pub(crate) struct Writer {
    template_engine: TemplateEngine,
}

impl Writer {
    /// Creates a new writer.
    ///
    /// # Errors
    ///
    /// Returns an error if template engine initialization fails.
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            template_engine: TemplateEngine::new()?,
        })
    }

    /// Copies each selected file into `export_dir` under its flattened name.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written.
    pub(crate) fn copy_files(&self, export_dir: &Path, selected: &[Candidate]) -> Result<usize> {
        for candidate in selected {
            let path = export_dir.join(candidate.export_name());
            write_file_atomic(&path, candidate.content_str())?;
            debug!("Copied {} to {}", candidate.relative_path, path.display());
        }

        info!("Copied {} files to {}", selected.len(), export_dir.display());
        Ok(selected.len())
    }

    /// Writes `_SUMMARY.txt` into the export folder.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub(crate) fn write_summary(
        &self,
        export_dir: &Path,
        project_name: &str,
        export_date: &str,
        summary: &SummaryReport,
    ) -> Result<PathBuf> {
        let content = self
            .template_engine
            .render_summary(project_name, export_date, summary)?;
        let path = export_dir.join(SUMMARY_FILE);
        write_file_atomic(&path, &content)?;
        Ok(path)
    }

    /// Writes the JSON and text file reports into the project folder.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, rendering or writing fails.
    pub(crate) fn write_report(&self, project_dir: &Path, report: &FileReport) -> Result<PathBuf> {
        let name = &report.project_name;

        let json_path = project_dir.join(format!("{name}_file_report.json"));
        write_file_atomic(&json_path, &serde_json::to_string_pretty(report)?)?;

        let text_path = project_dir.join(format!("{name}_file_report.txt"));
        write_file_atomic(&text_path, &self.template_engine.render_report(report)?)?;

        debug!("File report written to {}", text_path.display());
        Ok(text_path)
    }

    /// Writes `<project>_structure.json` into the export folder.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub(crate) fn write_structure(
        &self,
        export_dir: &Path,
        project_name: &str,
        tree: &StructureNode,
    ) -> Result<PathBuf> {
        let path = export_dir.join(format!("{project_name}_structure.json"));
        write_file_atomic(&path, &structure::to_json(tree)?)?;
        Ok(path)
    }

    /// Writes `<project>_README.md` into the export folder.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub(crate) fn write_readme(&self, export_dir: &Path, readme: &ReadmeContext) -> Result<PathBuf> {
        let path = export_dir.join(format!("{}_README.md", readme.project_name));
        write_file_atomic(&path, &self.template_engine.render_readme(readme)?)?;
        Ok(path)
    }

    /// Writes `<project>_endpoints.json` into the project folder.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub(crate) fn write_endpoints(
        &self,
        project_dir: &Path,
        project_name: &str,
        groups: &EndpointGroups,
    ) -> Result<PathBuf> {
        let path = project_dir.join(format!("{project_name}_endpoints.json"));
        write_file_atomic(&path, &serde_json::to_string_pretty(groups)?)?;
        Ok(path)
    }
}

/// Writes a file through a temporary sibling and a rename, so readers never
/// see a partial file.
pub(crate) fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;

    Ok(())
}

/// Writes a file only when nothing exists at `path` yet, unless `force`.
/// Returns whether the file was written.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default(path: &Path, content: &str, force: bool) -> Result<bool> {
    if path.exists() && !force {
        debug!("Keeping existing {}", path.display());
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    write_file_atomic(path, content)?;
    Ok(true)
}
