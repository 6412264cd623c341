//! Upload, check, grade and withdraw.
//!
//! [`PlagiarismChecker`] drives a submission through its lifecycle. Uploads
//! are extracted and fingerprinted straight away so the assignment index is
//! always populated before anyone asks for a check.
//!
//! A check runs in two halves. [`PlagiarismChecker::begin_check`] takes the
//! per-submission lease and moves the record to `CHECKING`. The second half
//! compares candidates and writes the result only if the record still holds
//! the revision the check started from. Anything else discards the result.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fingerprint::FingerprintSet;
use index::{IndexError, SimilarityIndexes};
use ingest::DocumentFormat;
use matcher::Comparator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PlagcheckConfig;
use crate::result::{PlagiarismResult, ResultFlag};
use crate::store::{AssignmentStore, InMemoryStore, StoreError, SubmissionStore};
use crate::submission::{
    FailureRecord, Submission, SubmissionDocument, SubmissionEvent, SubmissionStatus,
};
use crate::{AssignmentId, EngineError, MetricsSpan, StudentId, SubmissionId};

/// A document handed in by a student.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub assignment_id: AssignmentId,
    pub student_id: StudentId,
    pub file_name: String,
    pub content: Bytes,
}

impl UploadRequest {
    pub fn new(
        assignment_id: AssignmentId,
        student_id: StudentId,
        file_name: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            assignment_id,
            student_id,
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// What an upload produced.
///
/// The submission is stored even when extraction fails; `extraction_error`
/// then says why it has no fingerprints.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub submission: Submission,
    pub resubmission: bool,
    pub extraction_error: Option<EngineError>,
    /// A background check was started (`auto_check`).
    pub check_requested: bool,
}

/// Acknowledgement for a check started in the background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAck {
    pub submission_id: SubmissionId,
    pub status: SubmissionStatus,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// The submission was deleted while the check ran.
    Withdrawn,
    /// A new document replaced the one being checked.
    Resubmitted,
    /// Someone else wrote the record first.
    ConcurrentUpdate,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::Withdrawn => "withdrawn",
            DiscardReason::Resubmitted => "resubmitted",
            DiscardReason::ConcurrentUpdate => "concurrent_update",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Completed(PlagiarismResult),
    /// The comparison ran but its result was not written.
    Discarded { reason: DiscardReason },
}

impl CheckOutcome {
    pub fn result(&self) -> Option<&PlagiarismResult> {
        match self {
            CheckOutcome::Completed(result) => Some(result),
            CheckOutcome::Discarded { .. } => None,
        }
    }
}

/// Held while a check for one submission is in flight.
struct CheckLease {
    in_flight: Arc<DashMap<SubmissionId, ()>>,
    submission_id: SubmissionId,
}

impl CheckLease {
    fn acquire(
        in_flight: &Arc<DashMap<SubmissionId, ()>>,
        submission_id: SubmissionId,
    ) -> Result<Self, EngineError> {
        match in_flight.entry(submission_id) {
            Entry::Occupied(_) => Err(EngineError::CheckInProgress { submission_id }),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(Self {
                    in_flight: Arc::clone(in_flight),
                    submission_id,
                })
            }
        }
    }
}

impl Drop for CheckLease {
    fn drop(&mut self) {
        self.in_flight.remove(&self.submission_id);
    }
}

/// A check that has taken its lease and is waiting to compare.
pub(crate) struct PendingCheck {
    lease: CheckLease,
    submission: Submission,
    previous: SubmissionStatus,
    metrics: Option<MetricsSpan>,
}

struct Prepared {
    canonical_text: String,
    fingerprints: FingerprintSet,
}

struct Inner {
    cfg: Arc<PlagcheckConfig>,
    submissions: Arc<dyn SubmissionStore>,
    assignments: Arc<dyn AssignmentStore>,
    indexes: Arc<SimilarityIndexes>,
    comparator: Comparator,
    in_flight: Arc<DashMap<SubmissionId, ()>>,
}

/// Entry point for everything that touches submissions.
///
/// Cheap to clone; clones share stores, indexes and leases.
#[derive(Clone)]
pub struct PlagiarismChecker {
    inner: Arc<Inner>,
}

impl fmt::Debug for PlagiarismChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlagiarismChecker")
            .field("config", &self.inner.cfg)
            .field("checks_in_flight", &self.inner.in_flight.len())
            .finish()
    }
}

impl PlagiarismChecker {
    /// Build a checker over one store that serves both lookups.
    pub fn new<S>(cfg: PlagcheckConfig, store: Arc<S>) -> Result<Self, EngineError>
    where
        S: SubmissionStore + AssignmentStore + 'static,
    {
        cfg.validate()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        let indexes = Arc::new(SimilarityIndexes::open(&cfg.index)?);
        let submissions: Arc<dyn SubmissionStore> = store.clone();
        let assignments: Arc<dyn AssignmentStore> = store;
        Self::with_parts(cfg, submissions, assignments, indexes)
    }

    pub fn with_parts(
        cfg: PlagcheckConfig,
        submissions: Arc<dyn SubmissionStore>,
        assignments: Arc<dyn AssignmentStore>,
        indexes: Arc<SimilarityIndexes>,
    ) -> Result<Self, EngineError> {
        cfg.validate()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        let comparator = Comparator::new(cfg.matcher.clone())?;
        Ok(Self {
            inner: Arc::new(Inner {
                cfg: Arc::new(cfg),
                submissions,
                assignments,
                indexes,
                comparator,
                in_flight: Arc::new(DashMap::new()),
            }),
        })
    }

    /// Default configuration over an [`InMemoryStore`] and in-memory index.
    pub fn in_memory() -> Result<Self, EngineError> {
        Self::new(PlagcheckConfig::default(), Arc::new(InMemoryStore::new()))
    }

    pub fn config(&self) -> &PlagcheckConfig {
        &self.inner.cfg
    }

    pub fn indexes(&self) -> &SimilarityIndexes {
        &self.inner.indexes
    }

    /// Number of checks currently holding a lease.
    pub fn checks_in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Store a document and fingerprint it.
    ///
    /// A student's second upload to the same assignment replaces the first
    /// one unless it has been graded. Extraction failures are recorded on the
    /// submission and reported in the receipt; only size, transition and
    /// storage problems fail the call.
    pub async fn upload(&self, req: UploadRequest) -> Result<UploadReceipt, EngineError> {
        let inner = &self.inner;
        if let Some(limit) = inner.cfg.ingest.max_payload_bytes {
            if req.content.len() > limit {
                return Err(EngineError::PayloadTooLarge(format!(
                    "document is {} bytes, limit is {limit}",
                    req.content.len()
                )));
            }
        }

        let now = Utc::now();
        let document = SubmissionDocument {
            format: DocumentFormat::from_file_name(&req.file_name).ok(),
            file_name: req.file_name,
            content: req.content,
        };

        let existing = inner
            .assignments
            .list_submissions(req.assignment_id)
            .await?
            .into_iter()
            .find(|s| s.student_id == req.student_id);
        let resubmission = existing.is_some();
        let mut submission = match existing {
            Some(mut current) => {
                current.resubmit(document, now)?;
                inner.indexes.remove(current.assignment_id, current.id)?;
                inner.submissions.update(current).await?
            }
            None => {
                inner
                    .submissions
                    .create(Submission::new(
                        req.assignment_id,
                        req.student_id,
                        document,
                        now,
                    ))
                    .await?
            }
        };
        info!(
            submission_id = submission.id,
            assignment_id = submission.assignment_id,
            student_id = submission.student_id,
            revision = submission.revision,
            resubmission,
            file_name = %submission.document.file_name,
            "upload"
        );

        let extraction_error = match self.prepare(&submission).await {
            Ok(Prepared {
                canonical_text,
                fingerprints,
            }) => {
                submission = self
                    .save_prepared(submission, |s| {
                        s.normalized_text = Some(canonical_text.clone());
                        s.fingerprints = Some(fingerprints.clone());
                    })
                    .await?;
                self.index_if_present(&submission).await?;
                None
            }
            Err(err) => {
                warn!(
                    submission_id = submission.id,
                    code = err.code(),
                    error = %err,
                    "upload_extraction_failed"
                );
                let failure = failure_record(&err);
                submission = self
                    .save_prepared(submission, |s| s.last_failure = Some(failure.clone()))
                    .await?;
                Some(err)
            }
        };

        let mut check_requested = false;
        if extraction_error.is_none() && inner.cfg.orchestrator.auto_check {
            match self.request_check(submission.id).await {
                Ok(_) => {
                    check_requested = true;
                    if let Some(current) = inner.submissions.get(submission.id).await? {
                        submission = current;
                    }
                }
                Err(err) => warn!(
                    submission_id = submission.id,
                    error = %err,
                    "auto_check_failed"
                ),
            }
        }

        Ok(UploadReceipt {
            submission,
            resubmission,
            extraction_error,
            check_requested,
        })
    }

    /// Run a check to completion.
    pub async fn check(&self, submission_id: SubmissionId) -> Result<CheckOutcome, EngineError> {
        let pending = self.begin_check(submission_id).await?;
        self.finish_check(pending).await
    }

    /// Start a check and return once the submission is `CHECKING`.
    ///
    /// The comparison continues on the tokio runtime. Its outcome is visible
    /// through [`PlagiarismChecker::result`].
    pub async fn request_check(&self, submission_id: SubmissionId) -> Result<CheckAck, EngineError> {
        let pending = self.begin_check(submission_id).await?;
        let ack = CheckAck {
            submission_id,
            status: pending.submission.status,
            requested_at: Utc::now(),
        };
        let checker = self.clone();
        tokio::spawn(async move {
            if let Err(err) = checker.finish_check(pending).await {
                warn!(submission_id, code = err.code(), error = %err, "check_failed");
            }
        });
        Ok(ack)
    }

    /// Take the lease, move to `CHECKING` and make sure the target has
    /// fingerprints and an index entry.
    pub(crate) async fn begin_check(
        &self,
        submission_id: SubmissionId,
    ) -> Result<PendingCheck, EngineError> {
        let lease = CheckLease::acquire(&self.inner.in_flight, submission_id)?;
        let metrics = MetricsSpan::start();

        match self.start_checking(submission_id).await {
            Ok((submission, previous)) => Ok(PendingCheck {
                lease,
                submission,
                previous,
                metrics,
            }),
            Err(err) => {
                if let Some(span) = metrics {
                    span.record_check(Err(err.clone()));
                }
                Err(err)
            }
        }
    }

    async fn start_checking(
        &self,
        submission_id: SubmissionId,
    ) -> Result<(Submission, SubmissionStatus), EngineError> {
        let inner = &self.inner;
        let mut submission = self.load(submission_id).await?;
        let previous = match submission.status {
            // Left behind by a check that never finished.
            SubmissionStatus::Checking if submission.plagiarism_result.is_some() => {
                SubmissionStatus::Checked
            }
            SubmissionStatus::Checking => SubmissionStatus::Uploaded,
            other => other,
        };
        submission.apply(SubmissionEvent::CheckRequested)?;
        submission.updated_at = Utc::now();
        let submission = inner.submissions.update(submission).await?;
        info!(
            submission_id,
            assignment_id = submission.assignment_id,
            revision = submission.revision,
            from = %previous,
            "check_started"
        );

        let revision = submission.revision;
        match self.ready_target(submission).await {
            Ok(submission) => Ok((submission, previous)),
            Err(err) => {
                self.abort_check(submission_id, revision, previous, &err).await;
                Err(err)
            }
        }
    }

    async fn ready_target(&self, mut submission: Submission) -> Result<Submission, EngineError> {
        if submission.fingerprints.is_none() {
            let prepared = self.prepare(&submission).await?;
            submission.normalized_text = Some(prepared.canonical_text);
            submission.fingerprints = Some(prepared.fingerprints);
            submission.last_failure = None;
            submission.updated_at = Utc::now();
            submission = self.inner.submissions.update(submission).await?;
        }
        if !self
            .inner
            .indexes
            .contains(submission.assignment_id, submission.id)?
        {
            // A withdrawal racing this point leaves nothing behind; the
            // final write then discards the result.
            self.index_if_present(&submission).await?;
        }
        Ok(submission)
    }

    /// Compare, aggregate and conditionally write. Releases the lease.
    pub(crate) async fn finish_check(
        &self,
        pending: PendingCheck,
    ) -> Result<CheckOutcome, EngineError> {
        let PendingCheck {
            lease,
            submission,
            previous,
            metrics,
        } = pending;

        let outcome = match self.run_comparisons(&submission, metrics.as_ref()).await {
            Ok(result) => self.write_result(&submission, result).await,
            Err(err) => Err(err),
        };
        if let Err(err) = &outcome {
            self.abort_check(submission.id, submission.revision, previous, err)
                .await;
        }
        if let Some(span) = metrics {
            span.record_check(outcome.as_ref().map(|_| ()).map_err(Clone::clone));
        }
        drop(lease);
        outcome
    }

    async fn run_comparisons(
        &self,
        target: &Submission,
        metrics: Option<&MetricsSpan>,
    ) -> Result<PlagiarismResult, EngineError> {
        let inner = &self.inner;
        let computed_at = Utc::now();
        let target_set = target
            .fingerprints
            .clone()
            .ok_or_else(|| EngineError::ExtractionFailure {
                reason: format!("submission {} has no fingerprints", target.id),
            })?;

        if target_set.is_insufficient() {
            info!(submission_id = target.id, "insufficient_content");
            return Ok(PlagiarismResult::insufficient_content(computed_at));
        }

        let mut candidates = match inner.indexes.candidates_for(target.assignment_id, target.id) {
            Err(IndexError::NotIndexed { .. }) => {
                if self.index_if_present(target).await? {
                    inner.indexes.candidates_for(target.assignment_id, target.id)?
                } else {
                    // Withdrawn or replaced; the write below discards the result.
                    Vec::new()
                }
            }
            other => other?,
        };
        let candidates_considered = candidates.len();
        let mut flags = Vec::new();
        if candidates.len() > inner.cfg.matcher.max_candidates {
            candidates.truncate(inner.cfg.matcher.max_candidates);
            flags.push(ResultFlag::CandidateLimitExceeded);
        }

        let mut corpus: HashMap<SubmissionId, Submission> = inner
            .assignments
            .list_submissions(target.assignment_id)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let mut loaded: Vec<(SubmissionId, FingerprintSet)> = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            match corpus
                .remove(&candidate.submission_id)
                .and_then(|s| s.fingerprints)
            {
                Some(set) => loaded.push((candidate.submission_id, set)),
                None => {
                    warn!(
                        submission_id = target.id,
                        candidate_id = candidate.submission_id,
                        "candidate_skipped"
                    );
                    flags.push(ResultFlag::PartialComparison);
                }
            }
        }
        debug!(
            submission_id = target.id,
            candidates_considered,
            loaded = loaded.len(),
            "candidates_loaded"
        );

        let comparator = inner.comparator.clone();
        let (ids, results) = tokio::task::spawn_blocking(move || {
            let sets: Vec<&FingerprintSet> = loaded.iter().map(|(_, set)| set).collect();
            let results = comparator.compare_all(&target_set, &sets);
            let ids: Vec<SubmissionId> = loaded.iter().map(|(id, _)| *id).collect();
            (ids, results)
        })
        .await
        .map_err(|e| EngineError::Internal(format!("comparison task failed: {e}")))?;

        let mut comparisons = Vec::with_capacity(results.len());
        for (candidate_id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(comparison) => comparisons.push((candidate_id, comparison)),
                Err(err) => {
                    warn!(
                        submission_id = target.id,
                        candidate_id,
                        error = %err,
                        "candidate_skipped"
                    );
                    flags.push(ResultFlag::PartialComparison);
                }
            }
        }
        if let Some(span) = metrics {
            span.record_comparisons(comparisons.len());
        }

        Ok(PlagiarismResult::aggregate(
            comparisons,
            candidates_considered,
            flags,
            &inner.cfg.matcher,
            target.normalized_text.as_deref(),
            computed_at,
        ))
    }

    async fn write_result(
        &self,
        checked: &Submission,
        result: PlagiarismResult,
    ) -> Result<CheckOutcome, EngineError> {
        let id = checked.id;
        let Some(mut current) = self.inner.submissions.get(id).await? else {
            self.drop_index_entry(checked.assignment_id, id)?;
            return Ok(discard(id, DiscardReason::Withdrawn));
        };
        if current.revision != checked.revision {
            return Ok(discard(id, DiscardReason::Resubmitted));
        }
        if current.apply(SubmissionEvent::CheckCompleted).is_err() {
            return Ok(discard(id, DiscardReason::ConcurrentUpdate));
        }
        current.plagiarism_result = Some(result.clone());
        current.last_failure = None;
        current.updated_at = Utc::now();

        match self.inner.submissions.update(current).await {
            Ok(_) => {
                info!(
                    submission_id = id,
                    similarity_score = result.similarity_score,
                    matches = result.matches.len(),
                    comparisons = result.total_comparisons,
                    severity = result.severity.as_str(),
                    "check_completed"
                );
                Ok(CheckOutcome::Completed(result))
            }
            Err(StoreError::NotFound(_)) => {
                self.drop_index_entry(checked.assignment_id, id)?;
                Ok(discard(id, DiscardReason::Withdrawn))
            }
            Err(StoreError::Conflict { .. }) => Ok(discard(id, DiscardReason::ConcurrentUpdate)),
            Err(err) => Err(err.into()),
        }
    }

    /// Put the submission back where it was before the check, if it is still
    /// the same revision and still `CHECKING`.
    async fn abort_check(
        &self,
        submission_id: SubmissionId,
        revision: u32,
        restore: SubmissionStatus,
        err: &EngineError,
    ) {
        warn!(
            submission_id,
            code = err.code(),
            error = %err,
            restore = %restore,
            "check_aborted"
        );
        if let Err(restore_err) = self
            .restore_status(submission_id, revision, restore, failure_record(err))
            .await
        {
            warn!(submission_id, error = %restore_err, "check_restore_failed");
        }
    }

    async fn restore_status(
        &self,
        submission_id: SubmissionId,
        revision: u32,
        restore: SubmissionStatus,
        failure: FailureRecord,
    ) -> Result<(), EngineError> {
        let Some(mut current) = self.inner.submissions.get(submission_id).await? else {
            return Ok(());
        };
        if current.revision != revision || current.status != SubmissionStatus::Checking {
            return Ok(());
        }
        current.apply(SubmissionEvent::CheckAborted { restore })?;
        current.last_failure = Some(failure);
        current.updated_at = Utc::now();
        self.inner.submissions.update(current).await?;
        Ok(())
    }

    /// Record a grade. Only a `CHECKED` submission can be graded.
    pub async fn grade(
        &self,
        submission_id: SubmissionId,
        score: u32,
        feedback: Option<String>,
    ) -> Result<Submission, EngineError> {
        let score = u8::try_from(score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or(EngineError::InvalidGrade { score })?;
        let mut submission = self.load(submission_id).await?;
        submission.apply(SubmissionEvent::Graded)?;
        submission.score = Some(score);
        submission.feedback = feedback;
        submission.updated_at = Utc::now();
        let submission = self.inner.submissions.update(submission).await?;
        info!(submission_id, score, "graded");
        Ok(submission)
    }

    /// Delete a submission and its index entry.
    ///
    /// Refused once graded, and while another submission's stored result
    /// lists it as a match.
    pub async fn withdraw(&self, submission_id: SubmissionId) -> Result<(), EngineError> {
        let inner = &self.inner;
        let submission = self.load(submission_id).await?;
        crate::submission::transition(submission.status, SubmissionEvent::Withdrawn)?;

        let referenced_by: Vec<SubmissionId> = inner
            .assignments
            .list_submissions(submission.assignment_id)
            .await?
            .iter()
            .filter(|other| other.id != submission_id && other.references(submission_id))
            .map(|other| other.id)
            .collect();
        if !referenced_by.is_empty() {
            return Err(EngineError::ReferencedByResults {
                submission_id,
                referenced_by,
            });
        }

        inner.submissions.delete(submission_id).await?;
        inner
            .indexes
            .remove(submission.assignment_id, submission_id)?;
        info!(
            submission_id,
            assignment_id = submission.assignment_id,
            "withdrawn"
        );
        Ok(())
    }

    pub async fn submission(&self, submission_id: SubmissionId) -> Result<Submission, EngineError> {
        self.load(submission_id).await
    }

    /// The stored result, or `None` if no check has completed.
    pub async fn result(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Option<PlagiarismResult>, EngineError> {
        Ok(self.load(submission_id).await?.plagiarism_result)
    }

    /// Every checked submission of an assignment, highest score first.
    pub async fn assignment_results(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<(SubmissionId, PlagiarismResult)>, EngineError> {
        let mut results: Vec<(SubmissionId, PlagiarismResult)> = self
            .inner
            .assignments
            .list_submissions(assignment_id)
            .await?
            .into_iter()
            .filter_map(|s| s.plagiarism_result.map(|r| (s.id, r)))
            .collect();
        results.sort_by(|(a_id, a), (b_id, b)| {
            b.similarity_score
                .total_cmp(&a.similarity_score)
                .then(a_id.cmp(b_id))
        });
        Ok(results)
    }

    pub async fn assignment_submissions(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Submission>, EngineError> {
        Ok(self.inner.assignments.list_submissions(assignment_id).await?)
    }

    pub async fn student_submissions(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Submission>, EngineError> {
        Ok(self.inner.submissions.list_for_student(student_id).await?)
    }

    async fn load(&self, submission_id: SubmissionId) -> Result<Submission, EngineError> {
        self.inner
            .submissions
            .get(submission_id)
            .await?
            .ok_or(EngineError::NotFound { submission_id })
    }

    /// Persist what `prepare` produced.
    ///
    /// A check started while the upload was preparing bumps the record's
    /// version. The write is then retried once against the reloaded record,
    /// unless that record is a newer revision or already has fingerprints.
    async fn save_prepared<F>(
        &self,
        mut submission: Submission,
        apply: F,
    ) -> Result<Submission, EngineError>
    where
        F: Fn(&mut Submission),
    {
        let revision = submission.revision;
        apply(&mut submission);
        submission.updated_at = Utc::now();
        let submission_id = submission.id;
        match self.inner.submissions.update(submission).await {
            Ok(saved) => Ok(saved),
            Err(StoreError::Conflict { .. }) => {
                let mut current = self.load(submission_id).await?;
                if current.revision != revision || current.fingerprints.is_some() {
                    debug!(submission_id, "prepared_write_superseded");
                    return Ok(current);
                }
                debug!(submission_id, version = current.version, "prepared_write_retry");
                apply(&mut current);
                current.updated_at = Utc::now();
                Ok(self.inner.submissions.update(current).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Index `submission`, then confirm the record still holds that revision.
    ///
    /// Returns `false` when it was withdrawn or replaced in the meantime. The
    /// index then reflects whatever the store holds now.
    async fn index_if_present(&self, submission: &Submission) -> Result<bool, EngineError> {
        self.index_submission(submission)?;
        match self.inner.submissions.get(submission.id).await? {
            Some(current) if current.revision == submission.revision => Ok(true),
            Some(current) if current.fingerprints.is_some() => {
                self.index_submission(&current)?;
                Ok(false)
            }
            _ => {
                self.drop_index_entry(submission.assignment_id, submission.id)?;
                Ok(false)
            }
        }
    }

    fn drop_index_entry(
        &self,
        assignment_id: AssignmentId,
        submission_id: SubmissionId,
    ) -> Result<(), EngineError> {
        if self.inner.indexes.remove(assignment_id, submission_id)? {
            info!(submission_id, assignment_id, "stale_index_entry_removed");
        }
        Ok(())
    }

    fn index_submission(&self, submission: &Submission) -> Result<(), EngineError> {
        if let Some(fingerprints) = &submission.fingerprints {
            self.inner.indexes.insert(
                submission.assignment_id,
                submission.id,
                submission.submitted_at,
                fingerprints,
            )?;
        }
        Ok(())
    }

    /// Extract, canonicalize and fingerprint off the async runtime, bounded
    /// by `extraction_timeout_ms`.
    async fn prepare(&self, submission: &Submission) -> Result<Prepared, EngineError> {
        let cfg = Arc::clone(&self.inner.cfg);
        let limit = cfg.orchestrator.extraction_timeout();
        let submission_id = submission.id;
        let file_name = submission.document.file_name.clone();
        let content = submission.document.content.clone();
        let metrics = MetricsSpan::start();

        // A timed-out task keeps running on the blocking pool; its output is
        // dropped.
        let task = tokio::task::spawn_blocking(move || {
            prepare_blocking(&cfg, submission_id, &file_name, &content)
        });
        let result = match tokio::time::timeout(limit, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(EngineError::ExtractionFailure {
                reason: format!("extraction task failed: {join_err}"),
            }),
            Err(_) => Err(EngineError::timeout(limit)),
        };

        if let Some(span) = metrics {
            span.record_extraction(result.as_ref().map(|_| ()).map_err(Clone::clone));
        }
        result
    }
}

fn prepare_blocking(
    cfg: &PlagcheckConfig,
    submission_id: SubmissionId,
    file_name: &str,
    content: &[u8],
) -> Result<Prepared, EngineError> {
    let extracted = ingest::extract_text(file_name, content, &cfg.ingest)?;
    let doc = canonical::canonicalize(submission_id.to_string(), &extracted.text, &cfg.canonical)?;
    let fingerprints = fingerprint::fingerprint_document(&doc, &cfg.fingerprint)?;
    Ok(Prepared {
        canonical_text: doc.canonical_text,
        fingerprints,
    })
}

fn failure_record(err: &EngineError) -> FailureRecord {
    FailureRecord {
        code: err.code().to_string(),
        message: err.to_string(),
        at: Utc::now(),
    }
}

fn discard(submission_id: SubmissionId, reason: DiscardReason) -> CheckOutcome {
    info!(submission_id, reason = reason.as_str(), "result_discarded");
    CheckOutcome::Discarded { reason }
}
