//! Submission persistence boundary.
//!
//! The checker only talks to storage through [`SubmissionStore`] and
//! [`AssignmentStore`]. [`InMemoryStore`] implements both for tests, the CLI
//! and single-process deployments.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use crate::submission::Submission;
use crate::{AssignmentId, StudentId, SubmissionId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("submission {0} not found")]
    NotFound(SubmissionId),
    /// The record changed since it was read.
    #[error("submission {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        id: SubmissionId,
        expected: u64,
        found: u64,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn get(&self, id: SubmissionId) -> Result<Option<Submission>, StoreError>;

    /// Persist a new record. The store assigns `id` and `version`.
    async fn create(&self, submission: Submission) -> Result<Submission, StoreError>;

    /// Replace a record if its stored `version` still equals
    /// `submission.version`. Returns the record with its new version.
    async fn update(&self, submission: Submission) -> Result<Submission, StoreError>;

    async fn delete(&self, id: SubmissionId) -> Result<(), StoreError>;

    /// Ordered by submission time, then id.
    async fn list_for_student(&self, student_id: StudentId) -> Result<Vec<Submission>, StoreError>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Ordered by submission time, then id.
    async fn list_submissions(&self, assignment_id: AssignmentId) -> Result<Vec<Submission>, StoreError>;
}

/// `DashMap`-backed store. Nothing survives a restart.
#[derive(Debug)]
pub struct InMemoryStore {
    submissions: DashMap<SubmissionId, Submission>,
    next_id: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            submissions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    fn collect_sorted<F>(&self, keep: F) -> Vec<Submission>
    where
        F: Fn(&Submission) -> bool,
    {
        let mut out: Vec<Submission> = self
            .submissions
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by_key(|s| (s.submitted_at, s.id));
        out
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn get(&self, id: SubmissionId) -> Result<Option<Submission>, StoreError> {
        Ok(self.submissions.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, mut submission: Submission) -> Result<Submission, StoreError> {
        submission.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        submission.version = 1;
        self.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn update(&self, mut submission: Submission) -> Result<Submission, StoreError> {
        let mut entry = self
            .submissions
            .get_mut(&submission.id)
            .ok_or(StoreError::NotFound(submission.id))?;
        let found = entry.value().version;
        if found != submission.version {
            return Err(StoreError::Conflict {
                id: submission.id,
                expected: submission.version,
                found,
            });
        }
        submission.version = found + 1;
        *entry.value_mut() = submission.clone();
        Ok(submission)
    }

    async fn delete(&self, id: SubmissionId) -> Result<(), StoreError> {
        self.submissions
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_for_student(&self, student_id: StudentId) -> Result<Vec<Submission>, StoreError> {
        Ok(self.collect_sorted(|s| s.student_id == student_id))
    }
}

#[async_trait]
impl AssignmentStore for InMemoryStore {
    async fn list_submissions(&self, assignment_id: AssignmentId) -> Result<Vec<Submission>, StoreError> {
        Ok(self.collect_sorted(|s| s.assignment_id == assignment_id))
    }
}
