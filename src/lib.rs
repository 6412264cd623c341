//! Plagiarism checking for assignment submissions.
//!
//! This crate ties the pipeline crates together behind one entry point,
//! [`PlagiarismChecker`]:
//!
//! 1. `ingest` pulls text out of the uploaded PDF/DOC/DOCX/TXT file.
//! 2. `canonical` normalizes it into a token stream.
//! 3. `fingerprint` selects winnowed k-gram fingerprints.
//! 4. `index` records them per assignment and proposes candidates.
//! 5. `matcher` scores each candidate by containment.
//!
//! Documents are fingerprinted and indexed eagerly on upload. A check later
//! asks the index for candidates, compares them, and writes one
//! [`PlagiarismResult`] back to the submission.
//!
//! ```
//! use bytes::Bytes;
//! use plagcheck::{CheckOutcome, PlagiarismChecker, UploadRequest};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let checker = PlagiarismChecker::in_memory().unwrap();
//! let text = Bytes::from_static(b"the quick brown fox jumps over the lazy dog");
//!
//! let first = checker
//!     .upload(UploadRequest::new(1, 10, "a.txt", text.clone()))
//!     .await
//!     .unwrap();
//! let second = checker
//!     .upload(UploadRequest::new(1, 11, "b.txt", text))
//!     .await
//!     .unwrap();
//!
//! let CheckOutcome::Completed(result) = checker.check(second.submission.id).await.unwrap() else {
//!     panic!("check was discarded");
//! };
//! assert_eq!(result.similarity_score, 100.0);
//! assert_eq!(result.matches[0].matched_submission_id, first.submission.id);
//! # });
//! ```

pub mod config;
pub mod orchestrator;
pub mod result;
pub mod store;
pub mod submission;

pub use canonical::{canonicalize, CanonicalError, CanonicalizeConfig, CanonicalizedDocument};
pub use fingerprint::{
    fingerprint_document, FingerprintConfig, FingerprintError, FingerprintSet, PositionRange,
};
pub use index::{AssignmentId, IndexConfig, IndexError, SimilarityIndexes, SubmissionId};
pub use ingest::{extract_text, DocumentFormat, ExtractedText, IngestConfig, IngestError};
pub use matcher::{compare, Comparator, Comparison, MatchConfig, MatchError};

pub use crate::config::{ConfigLoadError, OrchestratorConfig, PlagcheckConfig};
pub use crate::orchestrator::{
    CheckAck, CheckOutcome, DiscardReason, PlagiarismChecker, UploadReceipt, UploadRequest,
};
pub use crate::result::{highlight, MatchDetail, PlagiarismResult, ResultFlag, Severity};
pub use crate::store::{AssignmentStore, InMemoryStore, StoreError, SubmissionStore};
pub use crate::submission::{
    transition, FailureRecord, Submission, SubmissionDocument, SubmissionEvent, SubmissionStatus,
    TransitionError,
};

use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;

pub type StudentId = u64;

/// Everything the checker can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("unsupported document format: {file_name}")]
    UnsupportedFormat { file_name: String },

    #[error("text extraction failed: {reason}")]
    ExtractionFailure { reason: String },

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("a check is already in progress for submission {submission_id}")]
    CheckInProgress { submission_id: SubmissionId },

    #[error("submission {submission_id} not found")]
    NotFound { submission_id: SubmissionId },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("submission {submission_id} is referenced by the results of {referenced_by:?}")]
    ReferencedByResults {
        submission_id: SubmissionId,
        referenced_by: Vec<SubmissionId>,
    },

    #[error("grade {score} is outside 0..=100")]
    InvalidGrade { score: u32 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A background task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            EngineError::ExtractionFailure { .. } => "EXTRACTION_FAILURE",
            EngineError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            EngineError::CheckInProgress { .. } => "CHECK_IN_PROGRESS",
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::InvalidTransition(_) => "INVALID_TRANSITION",
            EngineError::ReferencedByResults { .. } => "REFERENCED_BY_RESULTS",
            EngineError::InvalidGrade { .. } => "BAD_REQUEST",
            EngineError::Store(StoreError::NotFound(_)) => "NOT_FOUND",
            EngineError::Store(StoreError::Conflict { .. }) => "CONFLICT",
            EngineError::Store(_) => "STORE_UNAVAILABLE",
            EngineError::Index(_) => "INDEX_ERROR",
            EngineError::InvalidConfig(_) => "INVALID_CONFIG",
            EngineError::Internal(_) => "INTERNAL",
        }
    }

    pub(crate) fn timeout(limit: Duration) -> Self {
        EngineError::ExtractionFailure {
            reason: format!("extraction timed out after {} ms", limit.as_millis()),
        }
    }
}

impl From<IngestError> for EngineError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedFormat { file_name } => {
                EngineError::UnsupportedFormat { file_name }
            }
            IngestError::PayloadTooLarge(msg) => EngineError::PayloadTooLarge(msg),
            IngestError::InvalidConfig(msg) => EngineError::InvalidConfig(msg),
            other => EngineError::ExtractionFailure {
                reason: other.to_string(),
            },
        }
    }
}

impl From<CanonicalError> for EngineError {
    fn from(err: CanonicalError) -> Self {
        EngineError::InvalidConfig(err.to_string())
    }
}

impl From<FingerprintError> for EngineError {
    fn from(err: FingerprintError) -> Self {
        EngineError::InvalidConfig(err.to_string())
    }
}

impl From<MatchError> for EngineError {
    fn from(err: MatchError) -> Self {
        EngineError::InvalidConfig(err.to_string())
    }
}

/// Metrics observer for extraction and checks.
pub trait EngineMetrics: Send + Sync {
    fn record_extraction(&self, latency: Duration, result: Result<(), EngineError>);
    fn record_check(&self, latency: Duration, result: Result<(), EngineError>);
    /// Candidates compared by one check.
    fn record_comparisons(&self, count: usize);
}

/// Install or clear the global engine metrics recorder.
pub fn set_engine_metrics(recorder: Option<Arc<dyn EngineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn EngineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn EngineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn EngineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn EngineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    pub(crate) fn record_extraction(self, result: Result<(), EngineError>) {
        self.recorder.record_extraction(self.start.elapsed(), result);
    }

    pub(crate) fn record_check(self, result: Result<(), EngineError>) {
        self.recorder.record_check(self.start.elapsed(), result);
    }

    pub(crate) fn record_comparisons(&self, count: usize) {
        self.recorder.record_comparisons(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_errors_map_to_engine_taxonomy() {
        let err: EngineError = DocumentFormat::from_file_name("scan.png").unwrap_err().into();
        assert_eq!(err.code(), "UNSUPPORTED_FORMAT");

        let err: EngineError = IngestError::PayloadTooLarge("big".into()).into();
        assert_eq!(err, EngineError::PayloadTooLarge("big".into()));

        let err: EngineError = extract_text("broken.docx", b"not a zip", &IngestConfig::default())
            .unwrap_err()
            .into();
        assert_eq!(err.code(), "EXTRACTION_FAILURE");
    }

    #[test]
    fn store_not_found_keeps_not_found_code() {
        assert_eq!(EngineError::Store(StoreError::NotFound(3)).code(), "NOT_FOUND");
        let conflict = StoreError::Conflict {
            id: 3,
            expected: 1,
            found: 2,
        };
        assert_eq!(EngineError::Store(conflict).code(), "CONFLICT");
        assert_eq!(
            EngineError::Store(StoreError::Unavailable("down".into())).code(),
            "STORE_UNAVAILABLE"
        );
    }

    #[test]
    fn timeout_is_an_extraction_failure() {
        let err = EngineError::timeout(Duration::from_millis(250));
        assert_eq!(err.code(), "EXTRACTION_FAILURE");
        assert!(err.to_string().contains("250 ms"));
    }
}
