//! Aggregated plagiarism result and the human-readable report.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use fingerprint::PositionRange;
use matcher::{Comparison, MatchConfig};
use serde::{Deserialize, Serialize};

use crate::SubmissionId;

/// Informational markers on a result. None of them is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultFlag {
    /// The target had fewer tokens than one shingle; nothing was compared.
    InsufficientContent,
    /// More candidates shared fingerprints than `max_candidates`; only the
    /// best ones were compared.
    CandidateLimitExceeded,
    /// At least one candidate could not be compared and was skipped.
    PartialComparison,
}

impl ResultFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultFlag::InsufficientContent => "INSUFFICIENT_CONTENT",
            ResultFlag::CandidateLimitExceeded => "CANDIDATE_LIMIT_EXCEEDED",
            ResultFlag::PartialComparison => "PARTIAL_COMPARISON",
        }
    }
}

/// Severity band of the top score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Severity::Critical
        } else if score >= 50.0 {
            Severity::High
        } else if score >= 20.0 {
            Severity::Moderate
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Moderate => "MODERATE",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL: very high similarity detected",
            Severity::High => "WARNING: high similarity detected",
            Severity::Moderate => "NOTE: moderate similarity detected",
            Severity::Low => "Low similarity, likely original work",
        }
    }
}

/// One relevant match against another submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetail {
    pub matched_submission_id: SubmissionId,
    pub shared_fingerprint_count: usize,
    /// Containment of the target in the matched submission, 0-100.
    pub score: f64,
    /// Symmetric Jaccard overlap, 0-100.
    pub overlap: f64,
    /// Ranges of the target's canonical text shared with the match.
    pub matched_ranges: Vec<PositionRange>,
}

/// Outcome of one completed check.
///
/// Always written whole: a new check replaces the previous result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagiarismResult {
    /// Highest containment score among compared candidates, 0-100.
    pub similarity_score: f64,
    /// Mean score over all compared candidates.
    pub average_score: f64,
    /// Matches above the relevance threshold, best first.
    pub matches: Vec<MatchDetail>,
    /// Candidates that were actually compared.
    pub total_comparisons: usize,
    /// Comparisons that cleared the relevance threshold.
    pub matched_comparisons: usize,
    /// Candidates the index returned, before capping.
    pub candidates_considered: usize,
    pub flags: Vec<ResultFlag>,
    pub severity: Severity,
    /// Canonical text with the top match's shared passages marked.
    pub highlighted_text: Option<String>,
    pub computed_at: DateTime<Utc>,
}

impl PlagiarismResult {
    /// Zero-score result for a document too short to fingerprint.
    pub fn insufficient_content(computed_at: DateTime<Utc>) -> Self {
        Self {
            similarity_score: 0.0,
            average_score: 0.0,
            matches: Vec::new(),
            total_comparisons: 0,
            matched_comparisons: 0,
            candidates_considered: 0,
            flags: vec![ResultFlag::InsufficientContent],
            severity: Severity::Low,
            highlighted_text: None,
            computed_at,
        }
    }

    /// Fold per-candidate comparisons into one result.
    ///
    /// `comparisons` holds only the candidates that compared successfully.
    /// Matches are ordered by score, then shared count, then id.
    pub fn aggregate(
        comparisons: Vec<(SubmissionId, Comparison)>,
        candidates_considered: usize,
        mut flags: Vec<ResultFlag>,
        cfg: &MatchConfig,
        canonical_text: Option<&str>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        let total = comparisons.len();
        let similarity_score = comparisons
            .iter()
            .map(|(_, c)| c.score)
            .fold(0.0_f64, f64::max);
        let average_score = if total == 0 {
            0.0
        } else {
            comparisons.iter().map(|(_, c)| c.score).sum::<f64>() / total as f64
        };

        let mut matches: Vec<MatchDetail> = comparisons
            .into_iter()
            .filter(|(_, c)| cfg.is_relevant(c.score))
            .map(|(id, c)| MatchDetail {
                matched_submission_id: id,
                shared_fingerprint_count: c.shared_fingerprint_count,
                score: c.score,
                overlap: c.overlap,
                matched_ranges: c.matched_ranges,
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(b.shared_fingerprint_count.cmp(&a.shared_fingerprint_count))
                .then(a.matched_submission_id.cmp(&b.matched_submission_id))
        });

        flags.sort_by_key(|f| f.as_str());
        flags.dedup();

        let highlighted_text = match (matches.first(), canonical_text) {
            (Some(top), Some(text)) => Some(highlight(text, &top.matched_ranges)),
            _ => None,
        };

        Self {
            similarity_score,
            average_score,
            matched_comparisons: matches.len(),
            matches,
            total_comparisons: total,
            candidates_considered,
            flags,
            severity: Severity::from_score(similarity_score),
            highlighted_text,
            computed_at,
        }
    }

    pub fn has_flag(&self, flag: ResultFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Multi-line report for reviewers.
    pub fn render_report(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== Plagiarism Detection Report ===");
        let _ = writeln!(report, "Similarity Score: {:.2}%", self.similarity_score);
        let _ = writeln!(report, "Average Score: {:.2}%", self.average_score);
        let _ = writeln!(report, "Total Comparisons: {}", self.total_comparisons);
        let _ = writeln!(report, "Matched Comparisons: {}", self.matched_comparisons);
        let _ = writeln!(report, "Candidates Considered: {}", self.candidates_considered);
        if !self.flags.is_empty() {
            let flags: Vec<&str> = self.flags.iter().map(ResultFlag::as_str).collect();
            let _ = writeln!(report, "Flags: {}", flags.join(", "));
        }
        let _ = writeln!(report);
        let _ = writeln!(report, "{}", self.severity.summary());
        if !self.matches.is_empty() {
            let _ = writeln!(report);
            let _ = writeln!(report, "Top matches:");
            for (rank, m) in self.matches.iter().take(5).enumerate() {
                let _ = writeln!(
                    report,
                    "  {}. submission {}: {:.2}% ({} shared fingerprints, {:.2}% overlap)",
                    rank + 1,
                    m.matched_submission_id,
                    m.score,
                    m.shared_fingerprint_count,
                    m.overlap
                );
            }
        }
        report
    }
}

/// Wrap each range of `text` in `[SIMILAR: ...]`.
///
/// Ranges are byte offsets into `text`, sorted and non-overlapping. Offsets
/// that are out of bounds or split a character are clamped.
pub fn highlight(text: &str, ranges: &[PositionRange]) -> String {
    let mut out = String::with_capacity(text.len() + ranges.len() * 12);
    let mut cursor = 0;
    for range in ranges {
        let start = floor_boundary(text, range.start_byte.max(cursor));
        let end = floor_boundary(text, range.end_byte);
        if end <= start {
            continue;
        }
        out.push_str(&text[cursor..start]);
        out.push_str("[SIMILAR: ");
        out.push_str(&text[start..end]);
        out.push(']');
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn floor_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison(score: f64, shared: usize, ranges: Vec<PositionRange>) -> Comparison {
        Comparison {
            score,
            overlap: score / 2.0,
            shared_fingerprint_count: shared,
            target_fingerprint_count: 40,
            candidate_fingerprint_count: 40,
            matched_ranges: ranges,
        }
    }

    fn bytes(start_byte: usize, end_byte: usize) -> PositionRange {
        PositionRange {
            start_token: 0,
            end_token: 0,
            start_byte,
            end_byte,
        }
    }

    #[test]
    fn aggregate_orders_and_filters() {
        let result = PlagiarismResult::aggregate(
            vec![
                (3, comparison(2.5, 1, vec![])),
                (1, comparison(60.0, 24, vec![])),
                (2, comparison(90.0, 36, vec![])),
                (4, comparison(60.0, 24, vec![])),
            ],
            4,
            vec![],
            &MatchConfig::default(),
            None,
            Utc::now(),
        );
        let ids: Vec<SubmissionId> = result
            .matches
            .iter()
            .map(|m| m.matched_submission_id)
            .collect();
        assert_eq!(ids, vec![2, 1, 4]);
        assert_eq!(result.similarity_score, 90.0);
        assert_eq!(result.total_comparisons, 4);
        assert_eq!(result.matched_comparisons, 3);
        assert!((result.average_score - 53.125).abs() < 1e-9);
        assert_eq!(result.severity, Severity::Critical);
    }

    #[test]
    fn top_score_counts_irrelevant_candidates() {
        let result = PlagiarismResult::aggregate(
            vec![(1, comparison(2.5, 1, vec![]))],
            1,
            vec![],
            &MatchConfig::default(),
            Some("some text"),
            Utc::now(),
        );
        assert_eq!(result.similarity_score, 2.5);
        assert!(result.matches.is_empty());
        assert!(result.highlighted_text.is_none());
    }

    #[test]
    fn flags_are_deduplicated() {
        let result = PlagiarismResult::aggregate(
            vec![],
            0,
            vec![
                ResultFlag::PartialComparison,
                ResultFlag::CandidateLimitExceeded,
                ResultFlag::PartialComparison,
            ],
            &MatchConfig::default(),
            None,
            Utc::now(),
        );
        assert_eq!(result.flags.len(), 2);
        assert!(result.has_flag(ResultFlag::PartialComparison));
        assert_eq!(result.similarity_score, 0.0);
        assert_eq!(result.average_score, 0.0);
    }

    #[test]
    fn severity_bands() {
        assert_eq!(Severity::from_score(100.0), Severity::Critical);
        assert_eq!(Severity::from_score(80.0), Severity::Critical);
        assert_eq!(Severity::from_score(79.9), Severity::High);
        assert_eq!(Severity::from_score(50.0), Severity::High);
        assert_eq!(Severity::from_score(20.0), Severity::Moderate);
        assert_eq!(Severity::from_score(19.99), Severity::Low);
        assert_eq!(Severity::from_score(0.0), Severity::Low);
    }

    #[test]
    fn highlight_wraps_ranges() {
        let text = "one two three four five";
        let marked = highlight(text, &[bytes(4, 13), bytes(19, 23)]);
        assert_eq!(marked, "one [SIMILAR: two three] four [SIMILAR: five]");
    }

    #[test]
    fn highlight_clamps_bad_offsets() {
        let text = "héllo world";
        // byte 2 is inside 'é'
        let marked = highlight(text, &[bytes(0, 2), bytes(7, 999)]);
        assert_eq!(marked, "[SIMILAR: h]éllo [SIMILAR: world]");
        assert_eq!(highlight(text, &[]), text);
    }

    #[test]
    fn aggregate_highlights_top_match() {
        let text = "rivers carve deep valleys";
        let result = PlagiarismResult::aggregate(
            vec![
                (1, comparison(30.0, 4, vec![bytes(0, 6)])),
                (2, comparison(70.0, 9, vec![bytes(13, 25)])),
            ],
            2,
            vec![],
            &MatchConfig::default(),
            Some(text),
            Utc::now(),
        );
        assert_eq!(
            result.highlighted_text.as_deref(),
            Some("rivers carve [SIMILAR: deep valleys]")
        );
    }

    #[test]
    fn report_mentions_scores_and_matches() {
        let result = PlagiarismResult::aggregate(
            vec![(7, comparison(85.0, 34, vec![]))],
            1,
            vec![ResultFlag::CandidateLimitExceeded],
            &MatchConfig::default(),
            None,
            Utc::now(),
        );
        let report = result.render_report();
        assert!(report.starts_with("=== Plagiarism Detection Report ==="));
        assert!(report.contains("Similarity Score: 85.00%"));
        assert!(report.contains("Total Comparisons: 1"));
        assert!(report.contains("CANDIDATE_LIMIT_EXCEEDED"));
        assert!(report.contains("CRITICAL"));
        assert!(report.contains("1. submission 7: 85.00%"));
    }

    #[test]
    fn insufficient_content_is_zero() {
        let result = PlagiarismResult::insufficient_content(Utc::now());
        assert_eq!(result.similarity_score, 0.0);
        assert!(result.has_flag(ResultFlag::InsufficientContent));
        assert_eq!(result.severity, Severity::Low);
        assert!(result.render_report().contains("INSUFFICIENT_CONTENT"));
    }
}
