use fingerprint::PositionRange;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Comparator tuning, the `matcher` section of the pipeline config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchConfig {
    /// A comparison is reported only when its score is strictly above this
    /// value (0-100).
    #[serde(default = "MatchConfig::default_min_relevance")]
    pub min_relevance: f64,
    /// At most this many candidates, best first, are compared per check.
    #[serde(default = "MatchConfig::default_max_candidates")]
    pub max_candidates: usize,
    /// Compare candidates on the rayon pool.
    #[serde(default = "MatchConfig::default_parallel")]
    pub parallel: bool,
}

impl MatchConfig {
    pub(crate) fn default_min_relevance() -> f64 {
        5.0
    }

    pub(crate) fn default_max_candidates() -> usize {
        50
    }

    pub(crate) fn default_parallel() -> bool {
        true
    }

    pub fn with_min_relevance(mut self, min_relevance: f64) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !(0.0..=100.0).contains(&self.min_relevance) {
            return Err(MatchError::InvalidConfig(format!(
                "min_relevance must be within 0..=100 (got {})",
                self.min_relevance
            )));
        }
        if self.max_candidates == 0 {
            return Err(MatchError::InvalidConfig(
                "max_candidates must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// True when `score` clears the relevance threshold.
    pub fn is_relevant(&self, score: f64) -> bool {
        score > self.min_relevance
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_relevance: Self::default_min_relevance(),
            max_candidates: Self::default_max_candidates(),
            parallel: Self::default_parallel(),
        }
    }
}

/// Outcome of comparing a target fingerprint set against one candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    /// Share of the target's distinct fingerprints found in the candidate,
    /// 0-100.
    pub score: f64,
    /// Jaccard similarity of the two distinct hash sets, 0-100. Unlike
    /// `score` it does not depend on which side is the target.
    pub overlap: f64,
    pub shared_fingerprint_count: usize,
    pub target_fingerprint_count: usize,
    pub candidate_fingerprint_count: usize,
    /// Target ranges covered by shared fingerprints, merged when they touch,
    /// in position order.
    pub matched_ranges: Vec<PositionRange>,
}

/// Errors produced by the comparison layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
    /// The two sets were produced with different fingerprint parameters and
    /// their hashes cannot be compared.
    #[error("incompatible fingerprint sets: {0}")]
    Incompatible(String),
}
