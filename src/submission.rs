//! Submission record and its lifecycle.
//!
//! ```text
//! UPLOADED ──check──▶ CHECKING ──done──▶ CHECKED ──grade──▶ GRADED
//!     ▲                  │  ▲                │
//!     └────abort─────────┘  └─────check──────┘
//! ```
//!
//! A failed check returns the submission to whichever state it left. A
//! resubmission resets anything but `GRADED` to `UPLOADED`.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use fingerprint::FingerprintSet;
use ingest::DocumentFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::result::PlagiarismResult;
use crate::{AssignmentId, StudentId, SubmissionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Uploaded,
    Checking,
    Checked,
    Graded,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Uploaded => "UPLOADED",
            SubmissionStatus::Checking => "CHECKING",
            SubmissionStatus::Checked => "CHECKED",
            SubmissionStatus::Graded => "GRADED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Graded)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that moves a submission between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionEvent {
    CheckRequested,
    CheckCompleted,
    /// The check failed before a result was written; go back to `restore`.
    CheckAborted { restore: SubmissionStatus },
    Graded,
    Resubmitted,
    /// The student withdrew the submission. The status does not change; the
    /// record is deleted afterwards.
    Withdrawn,
}

impl fmt::Display for SubmissionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionEvent::CheckRequested => f.write_str("check requested"),
            SubmissionEvent::CheckCompleted => f.write_str("check completed"),
            SubmissionEvent::CheckAborted { restore } => write!(f, "check aborted (restore {restore})"),
            SubmissionEvent::Graded => f.write_str("graded"),
            SubmissionEvent::Resubmitted => f.write_str("resubmitted"),
            SubmissionEvent::Withdrawn => f.write_str("withdrawn"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply '{event}' to a {from} submission")]
pub struct TransitionError {
    pub from: SubmissionStatus,
    pub event: SubmissionEvent,
}

/// The lifecycle table. Every state/event pair is listed.
///
/// `CHECKING` accepts another `CheckRequested`: the per-submission lease, not
/// the stored status, decides whether a check is in flight. A status left at
/// `CHECKING` by a crashed process can then still be re-checked.
pub fn transition(
    from: SubmissionStatus,
    event: SubmissionEvent,
) -> Result<SubmissionStatus, TransitionError> {
    use SubmissionEvent as E;
    use SubmissionStatus as S;

    let next = match (from, event) {
        (S::Uploaded | S::Checked | S::Checking, E::CheckRequested) => Some(S::Checking),
        (S::Checking, E::CheckCompleted) => Some(S::Checked),
        (S::Checking, E::CheckAborted { restore: S::Uploaded }) => Some(S::Uploaded),
        (S::Checking, E::CheckAborted { restore: S::Checked }) => Some(S::Checked),
        (S::Checking, E::CheckAborted { .. }) => None,
        (S::Checked, E::Graded) => Some(S::Graded),
        (S::Uploaded | S::Checking | S::Checked, E::Resubmitted) => Some(S::Uploaded),
        (S::Uploaded | S::Checking | S::Checked, E::Withdrawn) => Some(from),
        (S::Uploaded | S::Checked, E::CheckCompleted | E::CheckAborted { .. }) => None,
        (S::Uploaded | S::Checking, E::Graded) => None,
        (S::Graded, _) => None,
    };
    next.ok_or(TransitionError { from, event })
}

/// The uploaded file as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDocument {
    pub file_name: String,
    /// `None` when the extension is not one we can read.
    pub format: Option<DocumentFormat>,
    pub content: Bytes,
}

/// Why the last extraction or check attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Stable error code, e.g. `EXTRACTION_FAILURE`.
    pub code: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub assignment_id: AssignmentId,
    pub student_id: StudentId,
    pub document: SubmissionDocument,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    /// Bumped on every resubmission. A check only writes its result if the
    /// revision it started from is still current.
    pub revision: u32,
    /// Store-managed optimistic concurrency token.
    pub version: u64,
    /// Canonical text the fingerprints were computed from.
    pub normalized_text: Option<String>,
    pub fingerprints: Option<FingerprintSet>,
    pub score: Option<u8>,
    pub feedback: Option<String>,
    pub plagiarism_result: Option<PlagiarismResult>,
    pub last_failure: Option<FailureRecord>,
}

impl Submission {
    /// A fresh `UPLOADED` record. The store assigns `id` and `version`.
    pub fn new(
        assignment_id: AssignmentId,
        student_id: StudentId,
        document: SubmissionDocument,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            assignment_id,
            student_id,
            document,
            submitted_at: now,
            updated_at: now,
            status: SubmissionStatus::Uploaded,
            revision: 1,
            version: 0,
            normalized_text: None,
            fingerprints: None,
            score: None,
            feedback: None,
            plagiarism_result: None,
            last_failure: None,
        }
    }

    /// Apply `event` to the status.
    pub fn apply(&mut self, event: SubmissionEvent) -> Result<SubmissionStatus, TransitionError> {
        self.status = transition(self.status, event)?;
        Ok(self.status)
    }

    /// Replace the document, dropping everything derived from the old one.
    pub fn resubmit(
        &mut self,
        document: SubmissionDocument,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.apply(SubmissionEvent::Resubmitted)?;
        self.document = document;
        self.revision += 1;
        self.submitted_at = now;
        self.updated_at = now;
        self.normalized_text = None;
        self.fingerprints = None;
        self.plagiarism_result = None;
        self.last_failure = None;
        Ok(())
    }

    /// True when this submission's result lists `other` as a match.
    pub fn references(&self, other: SubmissionId) -> bool {
        self.plagiarism_result
            .as_ref()
            .is_some_and(|result| result.matches.iter().any(|m| m.matched_submission_id == other))
    }
}
