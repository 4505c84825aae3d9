// ABOUTME: Maps per-axis evaluations back onto the transcript lines they describe
// ABOUTME: First-match prefix heuristic; lossy for duplicate lines and long statements
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! # Statement Reconciliation
//!
//! The transcript is split on `\n` and blank lines are dropped; a line's index
//! is its position among the remaining lines. For every evaluation, in axis
//! order and then list order:
//!
//! 1. take the evaluation's source text (`statement`, else `content`)
//! 2. keep its first 50 characters
//! 3. find the first line containing that prefix
//! 4. attach the evaluation under its axis if that line has none yet for the axis
//!
//! Anything else is dropped. Lines with no evaluation for an axis are unscored
//! for that axis. The heuristic is applied as-is: duplicate lines always
//! resolve to the earliest one, and prefix collisions are not disambiguated.

use crate::constants::limits::STATEMENT_MATCH_PREFIX_CHARS;
use counsel_core::models::{AnalysisResult, AnalysisStatement, EvaluationAxis};
use serde::Serialize;
use std::collections::BTreeMap;

/// One transcript line with the evaluations attached to it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledStatement {
    /// Position among non-blank lines
    pub index: usize,
    /// The line as written
    pub statement: String,
    /// Evaluation per axis; absent axes are unscored
    pub evaluations: BTreeMap<EvaluationAxis, AnalysisStatement>,
}

/// Non-blank transcript lines, in order
#[must_use]
pub fn transcript_lines(text: &str) -> Vec<&str> {
    text.split('\n').filter(|line| !line.trim().is_empty()).collect()
}

/// First `STATEMENT_MATCH_PREFIX_CHARS` characters of `text`
fn match_prefix(text: &str) -> &str {
    text.char_indices()
        .nth(STATEMENT_MATCH_PREFIX_CHARS)
        .map_or(text, |(end, _)| &text[..end])
}

/// Index of the line an evaluation's text points at, if any
#[must_use]
pub fn locate_statement(lines: &[&str], source_text: &str) -> Option<usize> {
    let prefix = match_prefix(source_text);
    lines.iter().position(|line| line.contains(prefix))
}

/// Attach evaluations to transcript lines
///
/// With `only_axis`, evaluations of other axes are ignored.
#[must_use]
pub fn reconcile(
    text: &str,
    analysis: &AnalysisResult,
    only_axis: Option<EvaluationAxis>,
) -> Vec<ReconciledStatement> {
    let lines = transcript_lines(text);
    let mut reconciled: Vec<ReconciledStatement> = lines
        .iter()
        .enumerate()
        .map(|(index, line)| ReconciledStatement {
            index,
            statement: (*line).to_owned(),
            evaluations: BTreeMap::new(),
        })
        .collect();

    for (axis, evaluations) in analysis.iter() {
        if only_axis.is_some_and(|only| only != axis) {
            continue;
        }
        for evaluation in evaluations {
            let Some(source) = evaluation.source_text() else {
                continue;
            };
            let Some(index) = locate_statement(&lines, source) else {
                continue;
            };
            reconciled[index]
                .evaluations
                .entry(axis)
                .or_insert_with(|| evaluation.clone());
        }
    }

    reconciled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(statement: &str, feedback: &str) -> AnalysisStatement {
        AnalysisStatement {
            statement: statement.to_owned(),
            feedback: Some(feedback.to_owned()),
            ..AnalysisStatement::default()
        }
    }

    fn empathy_only(evals: Vec<AnalysisStatement>) -> AnalysisResult {
        AnalysisResult::from_axes(vec![], vec![], evals, vec![])
    }

    #[test]
    fn test_exact_line_attaches_to_its_index() {
        let result = reconcile("A\nB\nC", &empathy_only(vec![eval("B", "ok")]), None);
        assert_eq!(result.len(), 3);
        assert!(result[0].evaluations.is_empty());
        assert_eq!(
            result[1].evaluations[&EvaluationAxis::Empathy].feedback.as_deref(),
            Some("ok")
        );
        assert!(result[2].evaluations.is_empty());
    }

    #[test]
    fn test_long_statement_with_unmatched_prefix_dropped() {
        let long = "X".repeat(60);
        let result = reconcile("A\nB\nC", &empathy_only(vec![eval(&long, "nope")]), None);
        assert!(result.iter().all(|line| line.evaluations.is_empty()));
    }

    #[test]
    fn test_only_first_fifty_chars_must_match() {
        let line = format!("Counselor: {}", "a".repeat(80));
        let statement = format!("{}{}", "a".repeat(50), "TRAILING TEXT NOT IN LINE");
        let result = reconcile(&line, &empathy_only(vec![eval(&statement, "hit")]), None);
        assert!(result[0].evaluations.contains_key(&EvaluationAxis::Empathy));
    }

    #[test]
    fn test_blank_lines_do_not_count() {
        let result = reconcile("A\n\n   \nB", &empathy_only(vec![eval("B", "ok")]), None);
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].statement, "B");
        assert!(result[1].evaluations.contains_key(&EvaluationAxis::Empathy));
    }

    #[test]
    fn test_duplicate_lines_resolve_to_first_and_first_claim_wins() {
        let analysis = empathy_only(vec![eval("Hello", "first"), eval("Hello", "second")]);
        let result = reconcile("Hello\nHello", &analysis, None);
        assert_eq!(
            result[0].evaluations[&EvaluationAxis::Empathy].feedback.as_deref(),
            Some("first")
        );
        assert!(result[1].evaluations.is_empty());
    }

    #[test]
    fn test_axes_claim_independently() {
        let analysis = AnalysisResult::from_axes(
            vec![eval("B", "cct")],
            vec![],
            vec![eval("B", "empathy")],
            vec![],
        );
        let result = reconcile("A\nB", &analysis, None);
        assert_eq!(result[1].evaluations.len(), 2);

        let filtered = reconcile("A\nB", &analysis, Some(EvaluationAxis::Cct));
        assert_eq!(filtered[1].evaluations.len(), 1);
        assert!(filtered[1].evaluations.contains_key(&EvaluationAxis::Cct));
    }

    #[test]
    fn test_content_fallback_and_empty_source_skipped() {
        let by_content = AnalysisStatement {
            content: Some("C".to_owned()),
            ..AnalysisStatement::default()
        };
        let empty = AnalysisStatement::default();
        let result = reconcile("A\nB\nC", &empathy_only(vec![empty, by_content]), None);
        assert!(result[0].evaluations.is_empty());
        assert!(result[2].evaluations.contains_key(&EvaluationAxis::Empathy));
    }

    #[test]
    fn test_prefix_respects_char_boundaries() {
        let japanese = "カウンセラー".repeat(10);
        assert_eq!(match_prefix(&japanese).chars().count(), 50);
        assert_eq!(match_prefix("short"), "short");
    }
}
