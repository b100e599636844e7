//! Selection accounting.

use crate::file::Candidate;
use crate::selector::SelectionResult;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// One file line in a summary group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    /// Project-relative path
    pub path: String,

    /// Estimated token cost
    pub tokens: usize,

    /// Size on disk
    pub size_bytes: u64,

    /// Exclusion reason, only for excluded files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Files sharing one importance level, in selection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportanceGroup {
    /// Shared importance score
    pub importance: u32,

    /// Files at this level
    pub files: Vec<SummaryEntry>,
}

/// Structured accounting of one selection.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    /// Files in the batch
    pub selected_count: usize,

    /// Files left out
    pub excluded_count: usize,

    /// Tokens used, structure overhead included
    pub total_tokens: usize,

    /// Overhead reserved for the path manifest
    pub structure_tokens: usize,

    /// Token budget
    pub max_tokens: usize,

    /// `total_tokens` as a percentage of `max_tokens`
    pub usage_percent: f64,

    /// Selected files grouped by importance, highest first
    pub selected: Vec<ImportanceGroup>,

    /// Excluded files grouped by importance, highest first
    pub excluded: Vec<ImportanceGroup>,

    /// Selected files whose content could not be read; exported empty
    pub unreadable: Vec<String>,
}

impl SummaryReport {
    /// Budget usage with one decimal, e.g. `"80.0"`.
    #[must_use]
    pub fn usage_display(&self) -> String {
        format!("{:.1}", self.usage_percent)
    }

    /// Total number of evaluated candidates.
    #[must_use]
    pub const fn analyzed_count(&self) -> usize {
        self.selected_count + self.excluded_count
    }
}

/// Builds the accounting for a selection. Pure.
#[must_use]
pub fn build_summary(result: &SelectionResult, max_tokens: usize) -> SummaryReport {
    let usage_percent = if max_tokens == 0 {
        0.0
    } else {
        result.total_tokens as f64 / max_tokens as f64 * 100.0
    };

    let selected = group_by_importance(result.selected.iter().map(|c| entry(c, None)));
    let excluded = group_by_importance(
        result
            .excluded
            .iter()
            .map(|e| entry(&e.candidate, Some(e.reason.to_string()))),
    );

    let unreadable = result
        .selected
        .iter()
        .filter(|c| c.unreadable)
        .map(|c| c.relative_path.clone())
        .collect();

    SummaryReport {
        selected_count: result.selected.len(),
        excluded_count: result.excluded.len(),
        total_tokens: result.total_tokens,
        structure_tokens: result.structure_tokens,
        max_tokens,
        usage_percent,
        selected,
        excluded,
        unreadable,
    }
}

fn entry(candidate: &Candidate, reason: Option<String>) -> (u32, SummaryEntry) {
    (
        candidate.importance,
        SummaryEntry {
            path: candidate.relative_path.clone(),
            tokens: candidate.token_cost,
            size_bytes: candidate.size_bytes,
            reason,
        },
    )
}

/// Groups entries by importance (descending), keeping input order inside
/// each group.
pub(crate) fn group_by_importance<I>(entries: I) -> Vec<ImportanceGroup>
where
    I: IntoIterator<Item = (u32, SummaryEntry)>,
{
    let mut groups: BTreeMap<Reverse<u32>, Vec<SummaryEntry>> = BTreeMap::new();
    for (importance, entry) in entries {
        groups.entry(Reverse(importance)).or_default().push(entry);
    }

    groups
        .into_iter()
        .map(|(Reverse(importance), files)| ImportanceGroup { importance, files })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{ExclusionReason, Excluded};

    fn costed(path: &str, importance: u32, tokens: usize) -> Candidate {
        let mut c = Candidate::new(path, path, 10, importance);
        c.token_cost = tokens;
        c
    }

    fn result() -> SelectionResult {
        SelectionResult {
            selected: vec![
                costed("README.md", 30, 20),
                costed("src/b.py", 15, 25),
                costed("src/a.py", 15, 30),
                costed("notes.txt", 0, 5),
            ],
            excluded: vec![Excluded {
                candidate: costed("big.json", 10, 900),
                reason: ExclusionReason::BudgetExceeded,
            }],
            structure_tokens: 0,
            total_tokens: 80,
        }
    }

    #[test]
    fn test_totals_and_percentage() {
        let summary = build_summary(&result(), 100);

        assert_eq!(summary.selected_count, 4);
        assert_eq!(summary.excluded_count, 1);
        assert_eq!(summary.analyzed_count(), 5);
        assert_eq!(summary.total_tokens, 80);
        assert_eq!(summary.usage_display(), "80.0");
    }

    #[test]
    fn test_groups_sorted_desc_with_selection_order() {
        let summary = build_summary(&result(), 100);

        let levels: Vec<u32> = summary.selected.iter().map(|g| g.importance).collect();
        assert_eq!(levels, vec![30, 15, 0]);

        let fifteen: Vec<&str> = summary.selected[1].files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(fifteen, vec!["src/b.py", "src/a.py"]);
    }

    #[test]
    fn test_excluded_entries_carry_reason() {
        let summary = build_summary(&result(), 100);

        assert_eq!(summary.excluded.len(), 1);
        assert_eq!(
            summary.excluded[0].files[0].reason.as_deref(),
            Some("Token limit exceeded")
        );
    }

    #[test]
    fn test_unreadable_selected_files_listed() {
        let mut r = result();
        r.selected[3].unreadable = true;
        r.excluded[0].candidate.unreadable = true;

        let summary = build_summary(&r, 100);
        assert_eq!(summary.unreadable, vec!["notes.txt"]);
    }

    #[test]
    fn test_zero_budget_has_zero_percent() {
        let summary = build_summary(&SelectionResult::default(), 0);
        assert_eq!(summary.usage_display(), "0.0");
        assert!(summary.selected.is_empty());
    }

    #[test]
    fn test_rounding_to_one_decimal() {
        let mut r = result();
        r.total_tokens = 1;
        let summary = build_summary(&r, 3);
        assert_eq!(summary.usage_display(), "33.3");
    }
}
