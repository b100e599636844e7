//! Token-budgeted selection.
//!
//! Candidates are ordered by importance (descending), size (ascending) and
//! path, then greedily accepted while the running total stays within the
//! budget. A candidate that does not fit is excluded and the walk continues,
//! so a large low-priority file never blocks a smaller one behind it.

use crate::file::Candidate;
use crate::token::{TokenEstimator, estimate_structure};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Source of candidate content.
pub trait ContentLoader: Send + Sync {
    /// Returns the decoded text of a candidate, or `None` when it cannot be
    /// read. Failures must not panic.
    fn load(&self, candidate: &Candidate) -> Option<String>;
}

/// Reads candidate content from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl ContentLoader for FsLoader {
    fn load(&self, candidate: &Candidate) -> Option<String> {
        match fs::read_to_string(&candidate.absolute_path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(
                    "Failed to read {}: {e}, counting it as empty",
                    candidate.absolute_path.display()
                );
                None
            }
        }
    }
}

/// Why a candidate was left out of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Adding the candidate would overflow the remaining budget
    BudgetExceeded,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BudgetExceeded => f.write_str("Token limit exceeded"),
        }
    }
}

/// A candidate that did not make the cut.
#[derive(Debug, Clone)]
pub struct Excluded {
    /// The rejected candidate, with its token cost filled in
    pub candidate: Candidate,

    /// Why it was rejected
    pub reason: ExclusionReason,
}

/// Output of [`Selector::select`].
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    /// Accepted candidates in selection order
    pub selected: Vec<Candidate>,

    /// Rejected candidates in evaluation order
    pub excluded: Vec<Excluded>,

    /// Cost reserved for the path manifest of the whole candidate set
    pub structure_tokens: usize,

    /// `structure_tokens` plus the cost of every selected candidate
    pub total_tokens: usize,
}

impl SelectionResult {
    /// Returns true when no candidate fit in the budget.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Number of candidates that were evaluated.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.selected.len() + self.excluded.len()
    }
}

/// Greedy token-budget selector.
#[derive(Clone)]
pub struct Selector {
    estimator: Arc<dyn TokenEstimator>,
    loader: Arc<dyn ContentLoader>,
}

impl Selector {
    /// Creates a selector with an explicit content source.
    #[must_use]
    pub fn new(estimator: Arc<dyn TokenEstimator>, loader: Arc<dyn ContentLoader>) -> Self {
        Self { estimator, loader }
    }

    /// Creates a selector that reads content from disk.
    #[must_use]
    pub fn with_fs(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self::new(estimator, Arc::new(FsLoader))
    }

    /// Selects the candidates that fit in `max_tokens`.
    ///
    /// An empty `selected` list is a valid result, not an error.
    #[must_use]
    pub fn select(&self, mut candidates: Vec<Candidate>, max_tokens: usize) -> SelectionResult {
        candidates.sort_by(priority_order);

        for candidate in &mut candidates {
            let content = self.loader.load(candidate);
            candidate.unreadable = content.is_none();
            let content = content.unwrap_or_default();
            candidate.token_cost = self.estimator.estimate(&content);
            candidate.content = Some(content);
        }

        let structure_tokens = estimate_structure(
            self.estimator.as_ref(),
            candidates.iter().map(|c| c.relative_path.as_str()),
        );
        debug!(
            "Reserved {} tokens for the structure of {} candidates",
            structure_tokens,
            candidates.len()
        );

        let mut running_total = structure_tokens;
        let mut selected = Vec::new();
        let mut excluded = Vec::new();

        for candidate in candidates {
            match running_total.checked_add(candidate.token_cost) {
                Some(next) if next <= max_tokens => {
                    trace!(
                        "Selected {} ({} tokens, importance {})",
                        candidate.relative_path, candidate.token_cost, candidate.importance
                    );
                    if candidate.unreadable {
                        warn!(
                            "{} could not be read, exporting it as an empty file",
                            candidate.relative_path
                        );
                    }
                    running_total = next;
                    selected.push(candidate);
                }
                _ => {
                    trace!(
                        "Excluded {} ({} tokens would exceed {})",
                        candidate.relative_path, candidate.token_cost, max_tokens
                    );
                    excluded.push(Excluded {
                        candidate,
                        reason: ExclusionReason::BudgetExceeded,
                    });
                }
            }
        }

        SelectionResult {
            selected,
            excluded,
            structure_tokens,
            total_tokens: running_total,
        }
    }
}

/// Total order: importance desc, size asc, path asc.
fn priority_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.importance
        .cmp(&a.importance)
        .then_with(|| a.size_bytes.cmp(&b.size_bytes))
        .then_with(|| a.relative_path.cmp(&b.relative_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    /// Content is the relative path; cost comes from a lookup table.
    struct Table(HashMap<String, usize>);

    impl TokenEstimator for Table {
        fn estimate(&self, text: &str) -> usize {
            self.0.get(text).copied().unwrap_or(0)
        }
    }

    struct PathAsContent;

    impl ContentLoader for PathAsContent {
        fn load(&self, candidate: &Candidate) -> Option<String> {
            Some(candidate.relative_path.clone())
        }
    }

    struct Unreadable;

    impl ContentLoader for Unreadable {
        fn load(&self, _candidate: &Candidate) -> Option<String> {
            None
        }
    }

    fn candidate(path: &str, importance: u32, size: u64) -> Candidate {
        Candidate::new(path, format!("/p/{path}"), size, importance)
    }

    fn selector(costs: &[(&str, usize)]) -> Selector {
        let table = costs.iter().map(|(p, c)| ((*p).to_string(), *c)).collect();
        Selector::new(Arc::new(Table(table)), Arc::new(PathAsContent))
    }

    fn paths(items: &[Candidate]) -> Vec<&str> {
        items.iter().map(|c| c.relative_path.as_str()).collect()
    }

    #[test]
    fn test_tie_broken_by_size_and_skip_continues() {
        let selector = selector(&[("A", 50), ("B", 30), ("C", 1000)]);
        let candidates = vec![
            candidate("A", 10, 100),
            candidate("B", 10, 50),
            candidate("C", 5, 10),
        ];

        let result = selector.select(candidates, 100);

        assert_eq!(result.structure_tokens, 0);
        assert_eq!(paths(&result.selected), vec!["B", "A"]);
        assert_eq!(result.excluded.len(), 1);
        assert_eq!(result.excluded[0].candidate.relative_path, "C");
        assert_eq!(result.excluded[0].reason, ExclusionReason::BudgetExceeded);
        assert_eq!(result.total_tokens, 80);
    }

    #[test]
    fn test_large_file_does_not_block_smaller_one() {
        let selector = selector(&[("big", 90), ("small", 10), ("tiny", 5)]);
        let candidates = vec![
            candidate("big", 20, 1),
            candidate("small", 10, 1),
            candidate("tiny", 5, 1),
        ];

        let result = selector.select(candidates, 20);

        assert_eq!(paths(&result.selected), vec!["small", "tiny"]);
        assert_eq!(result.excluded[0].candidate.relative_path, "big");
        assert_eq!(result.excluded[0].candidate.token_cost, 90);
        assert_eq!(result.total_tokens, 15);
    }

    #[test]
    fn test_structure_overhead_is_reserved() {
        let selector = Selector::new(
            Arc::new(crate::token::SimpleTokenizer),
            Arc::new(PathAsContent),
        );
        // "aaaa\n" is 2 tokens of overhead, the file itself costs 1
        let result = selector.select(vec![candidate("aaaa", 0, 1)], 2);

        assert_eq!(result.structure_tokens, 2);
        assert!(result.is_empty());
        assert_eq!(result.total_tokens, 2);
    }

    #[test]
    fn test_nothing_fits_is_empty_result() {
        let selector = selector(&[("A", 500)]);
        let result = selector.select(vec![candidate("A", 1, 1)], 100);

        assert!(result.is_empty());
        assert_eq!(result.candidate_count(), 1);
    }

    #[test]
    fn test_empty_input() {
        let selector = selector(&[]);
        let result = selector.select(Vec::new(), 100);

        assert!(result.is_empty());
        assert!(result.excluded.is_empty());
        assert_eq!(result.total_tokens, 0);
    }

    #[test]
    fn test_unreadable_content_costs_zero() {
        let selector = Selector::new(
            Arc::new(Table(HashMap::new())),
            Arc::new(Unreadable),
        );
        let result = selector.select(vec![candidate("locked.txt", 3, 10)], 1);

        assert_eq!(result.selected.len(), 1);
        assert_eq!(result.selected[0].token_cost, 0);
        assert_eq!(result.selected[0].content_str(), "");
        assert!(result.selected[0].unreadable);
    }

    #[test]
    fn test_invalid_utf8_past_probe_is_flagged() {
        use assert_fs::prelude::*;

        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("latin1.txt");
        let mut bytes = vec![b'a'; 9000];
        bytes.push(0xE9);
        file.write_binary(&bytes).unwrap();
        assert!(crate::file::is_readable_text(file.path()).unwrap());

        let selector = Selector::with_fs(Arc::new(crate::token::SimpleTokenizer));
        let result = selector.select(vec![Candidate::new("latin1.txt", file.path(), 9001, 0)], 1000);

        assert_eq!(result.selected.len(), 1);
        assert!(result.selected[0].unreadable);
        assert_eq!(result.selected[0].token_cost, 0);
    }

    #[test]
    fn test_fs_loader_reads_content() {
        use assert_fs::prelude::*;

        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("main.py");
        file.write_str("print('hi')\n").unwrap();

        let loaded = FsLoader.load(&Candidate::new("main.py", file.path(), 12, 0));
        assert_eq!(loaded.as_deref(), Some("print('hi')\n"));

        let missing = FsLoader.load(&Candidate::new("gone.py", temp.path().join("gone.py"), 0, 0));
        assert!(missing.is_none());
    }

    #[test]
    fn test_exclusion_reason_display() {
        assert_eq!(ExclusionReason::BudgetExceeded.to_string(), "Token limit exceeded");
    }

    fn arb_candidates() -> impl Strategy<Value = Vec<(u32, u64, usize)>> {
        prop::collection::vec((0u32..40, 0u64..500, 0usize..200), 0..24)
    }

    fn build(specs: &[(u32, u64, usize)]) -> (Selector, Vec<Candidate>) {
        let names: Vec<String> = (0..specs.len()).map(|i| format!("f{i:02}")).collect();
        let costs: Vec<(&str, usize)> = names
            .iter()
            .zip(specs)
            .map(|(n, (_, _, cost))| (n.as_str(), *cost))
            .collect();
        let candidates = names
            .iter()
            .zip(specs)
            .map(|(n, (importance, size, _))| candidate(n, *importance, *size))
            .collect();
        (selector(&costs), candidates)
    }

    proptest! {
        #[test]
        fn prop_budget_never_exceeded(specs in arb_candidates(), max_tokens in 0usize..2000) {
            let (selector, candidates) = build(&specs);
            let result = selector.select(candidates, max_tokens);

            prop_assert!(result.total_tokens <= max_tokens || result.selected.is_empty());
            prop_assert_eq!(result.candidate_count(), specs.len());
        }

        #[test]
        fn prop_input_order_does_not_matter(specs in arb_candidates(), max_tokens in 0usize..2000) {
            let (selector, candidates) = build(&specs);
            let mut reversed = candidates.clone();
            reversed.reverse();

            let first = selector.select(candidates, max_tokens);
            let second = selector.select(reversed, max_tokens);

            prop_assert_eq!(paths(&first.selected), paths(&second.selected));
            prop_assert_eq!(first.total_tokens, second.total_tokens);
        }

        #[test]
        fn prop_selection_order_is_priority_order(specs in arb_candidates(), max_tokens in 0usize..2000) {
            let (selector, candidates) = build(&specs);
            let result = selector.select(candidates, max_tokens);

            for pair in result.selected.windows(2) {
                prop_assert_ne!(priority_order(&pair[0], &pair[1]), Ordering::Greater);
            }
        }

        #[test]
        fn prop_larger_budget_keeps_priority_prefix(
            specs in arb_candidates(),
            max_tokens in 0usize..2000,
            extra in 0usize..2000,
        ) {
            let (selector, candidates) = build(&specs);
            let mut ordered = candidates.clone();
            ordered.sort_by(priority_order);

            // Leading run accepted before the first overflow at the small budget
            let mut total = 0;
            let mut prefix = Vec::new();
            for c in &ordered {
                let cost = specs[c.relative_path[1..].parse::<usize>().unwrap()].2;
                if total + cost > max_tokens {
                    break;
                }
                total += cost;
                prefix.push(c.relative_path.clone());
            }

            let small = selector.select(candidates.clone(), max_tokens);
            let large = selector.select(candidates, max_tokens + extra);
            let small_paths = paths(&small.selected);
            let large_paths = paths(&large.selected);

            for path in &prefix {
                prop_assert!(small_paths.contains(&path.as_str()));
                prop_assert!(large_paths.contains(&path.as_str()));
            }
        }

        #[test]
        fn prop_everything_fits_under_sufficient_budget(specs in arb_candidates()) {
            let (selector, candidates) = build(&specs);
            let sum: usize = specs.iter().map(|s| s.2).sum();
            let result = selector.select(candidates, sum);

            prop_assert!(result.excluded.is_empty());
            prop_assert_eq!(result.total_tokens, sum);
        }
    }
}
