//! Per-run file inclusion report.

use crate::selector::SelectionResult;
use crate::summary::{ImportanceGroup, SummaryEntry, group_by_importance};
use serde::Serialize;

/// A file that made it into the batch.
#[derive(Debug, Clone, Serialize)]
pub struct SelectedFile {
    /// Project-relative path
    pub path: String,
    /// Importance score
    pub importance: u32,
    /// Estimated token cost
    pub tokens: usize,
    /// Size on disk in bytes
    pub size: u64,
}

/// A file that was left out.
#[derive(Debug, Clone, Serialize)]
pub struct ExcludedFile {
    /// Project-relative path
    pub path: String,
    /// Importance score
    pub importance: u32,
    /// Size on disk in bytes
    pub size: u64,
    /// Why it was left out
    pub reason: String,
}

/// Which files were exported and which were left out, written next to the
/// batches of a project.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Project name
    pub project_name: String,
    /// When the report was produced
    pub report_date: String,
    /// Selected plus excluded files
    pub total_files_analyzed: usize,
    /// Number of selected files
    pub selected_files_count: usize,
    /// Number of excluded files
    pub excluded_files_count: usize,
    /// Selected files in selection order
    pub selected_files: Vec<SelectedFile>,
    /// Excluded files in evaluation order
    pub excluded_files: Vec<ExcludedFile>,
}

impl FileReport {
    /// Builds the report of one selection.
    #[must_use]
    pub fn new(project_name: &str, report_date: String, result: &SelectionResult) -> Self {
        let selected_files: Vec<SelectedFile> = result
            .selected
            .iter()
            .map(|c| SelectedFile {
                path: c.relative_path.clone(),
                importance: c.importance,
                tokens: c.token_cost,
                size: c.size_bytes,
            })
            .collect();

        let excluded_files: Vec<ExcludedFile> = result
            .excluded
            .iter()
            .map(|e| ExcludedFile {
                path: e.candidate.relative_path.clone(),
                importance: e.candidate.importance,
                size: e.candidate.size_bytes,
                reason: e.reason.to_string(),
            })
            .collect();

        Self {
            project_name: project_name.to_string(),
            report_date,
            total_files_analyzed: selected_files.len() + excluded_files.len(),
            selected_files_count: selected_files.len(),
            excluded_files_count: excluded_files.len(),
            selected_files,
            excluded_files,
        }
    }

    /// Selected files grouped by importance, highest first.
    #[must_use]
    pub fn selected_groups(&self) -> Vec<ImportanceGroup> {
        group_by_importance(self.selected_files.iter().map(|f| {
            (
                f.importance,
                SummaryEntry {
                    path: f.path.clone(),
                    tokens: f.tokens,
                    size_bytes: f.size,
                    reason: None,
                },
            )
        }))
    }

    /// Excluded files grouped by importance, highest first.
    #[must_use]
    pub fn excluded_groups(&self) -> Vec<ImportanceGroup> {
        group_by_importance(self.excluded_files.iter().map(|f| {
            (
                f.importance,
                SummaryEntry {
                    path: f.path.clone(),
                    tokens: 0,
                    size_bytes: f.size,
                    reason: Some(f.reason.clone()),
                },
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Candidate;
    use crate::selector::{ExclusionReason, Excluded};

    fn costed(path: &str, importance: u32, tokens: usize, size: u64) -> Candidate {
        let mut c = Candidate::new(path, path, size, importance);
        c.token_cost = tokens;
        c
    }

    fn report() -> FileReport {
        let result = SelectionResult {
            selected: vec![costed("README.md", 20, 12, 40), costed("src/a.py", 15, 30, 90)],
            excluded: vec![Excluded {
                candidate: costed("data.json", 10, 5000, 20000),
                reason: ExclusionReason::BudgetExceeded,
            }],
            structure_tokens: 4,
            total_tokens: 46,
        };
        FileReport::new("demo", "2024-03-09 10:00:00".to_string(), &result)
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(report()).unwrap();

        assert_eq!(json["project_name"], "demo");
        assert_eq!(json["total_files_analyzed"], 3);
        assert_eq!(json["selected_files_count"], 2);
        assert_eq!(json["excluded_files_count"], 1);
        assert_eq!(json["selected_files"][1]["path"], "src/a.py");
        assert_eq!(json["selected_files"][1]["tokens"], 30);
        assert_eq!(json["selected_files"][1]["size"], 90);
        assert_eq!(json["excluded_files"][0]["reason"], "Token limit exceeded");
        assert!(json["excluded_files"][0].get("tokens").is_none());
    }

    #[test]
    fn test_groups() {
        let report = report();
        let selected = report.selected_groups();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].importance, 20);

        let excluded = report.excluded_groups();
        assert_eq!(excluded[0].files[0].path, "data.json");
    }
}
