//! Per-assignment index registry with durable backing.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use fingerprint::FingerprintSet;
use hashbrown::HashMap;
use log::{debug, info, warn};

use crate::codec::StoredDocument;
use crate::similarity::{Candidate, InsertOutcome, SimilarityIndex};
use crate::{
    AssignmentId, IndexBackend, IndexConfig, IndexError, SubmissionId, INDEX_SCHEMA_VERSION,
};

/// All similarity indexes, one per assignment.
///
/// In-memory [`SimilarityIndex`]es answer queries. Every mutation is first
/// written to the [`IndexBackend`] so that [`open`](Self::open) can rebuild the
/// same state after a restart.
///
/// ```
/// use chrono::Utc;
/// use canonical::{canonicalize, CanonicalizeConfig};
/// use fingerprint::{fingerprint_document, FingerprintConfig};
/// use index::{IndexConfig, SimilarityIndexes};
///
/// let indexes = SimilarityIndexes::open(&IndexConfig::default()).unwrap();
/// let text = "the quick brown fox jumps over the lazy dog";
/// let doc = canonicalize("1", text, &CanonicalizeConfig::default()).unwrap();
/// let set = fingerprint_document(&doc, &FingerprintConfig::default()).unwrap();
///
/// indexes.insert(7, 1, Utc::now(), &set).unwrap();
/// indexes.insert(7, 2, Utc::now(), &set).unwrap();
///
/// let candidates = indexes.candidates_for(7, 2).unwrap();
/// assert_eq!(candidates[0].submission_id, 1);
/// ```
pub struct SimilarityIndexes {
    backend: Box<dyn IndexBackend>,
    cfg: IndexConfig,
    indexes: RwLock<HashMap<AssignmentId, Arc<SimilarityIndex>>>,
}

impl SimilarityIndexes {
    /// Build the configured backend and load everything it holds.
    pub fn open(cfg: &IndexConfig) -> Result<Self, IndexError> {
        let backend = cfg.backend.build()?;
        Self::with_backend(cfg.clone(), backend)
    }

    /// Use a caller-supplied backend and load everything it holds.
    pub fn with_backend(cfg: IndexConfig, backend: Box<dyn IndexBackend>) -> Result<Self, IndexError> {
        let registry = Self {
            backend,
            cfg,
            indexes: RwLock::new(HashMap::new()),
        };
        registry.rebuild()?;
        Ok(registry)
    }

    fn rebuild(&self) -> Result<(), IndexError> {
        let mut loaded = 0usize;
        self.backend.scan(&mut |key, value| {
            let stored = self.cfg.compression.decode(value).map_err(|err| {
                warn!("index record {key} is unreadable: {err}");
                IndexError::Corrupt {
                    key: key.to_string(),
                    reason: err.to_string(),
                }
            })?;
            if stored.schema_version != INDEX_SCHEMA_VERSION {
                return Err(IndexError::Corrupt {
                    key: key.to_string(),
                    reason: format!("unsupported schema version {}", stored.schema_version),
                });
            }
            let submitted_at = DateTime::<Utc>::from_timestamp_micros(stored.submitted_at_micros)
                .ok_or_else(|| IndexError::Corrupt {
                    key: key.to_string(),
                    reason: "timestamp out of range".to_string(),
                })?;
            self.for_assignment(stored.assignment_id)?.insert_hashes(
                stored.submission_id,
                submitted_at,
                stored.hashes,
            )?;
            loaded += 1;
            Ok(())
        })?;
        if loaded > 0 {
            info!("rebuilt similarity indexes from {loaded} stored submissions");
        }
        Ok(())
    }

    fn registry_lock_err() -> IndexError {
        IndexError::backend("poisoned lock")
    }

    /// The index for `assignment_id`, created empty on first use.
    pub fn for_assignment(&self, assignment_id: AssignmentId) -> Result<Arc<SimilarityIndex>, IndexError> {
        if let Some(index) = self.get(assignment_id)? {
            return Ok(index);
        }
        let mut indexes = self
            .indexes
            .write()
            .map_err(|_| Self::registry_lock_err())?;
        let index = indexes
            .entry(assignment_id)
            .or_insert_with(|| Arc::new(SimilarityIndex::new(assignment_id)));
        Ok(Arc::clone(index))
    }

    /// The index for `assignment_id`, if anything was ever indexed there.
    pub fn get(&self, assignment_id: AssignmentId) -> Result<Option<Arc<SimilarityIndex>>, IndexError> {
        let indexes = self
            .indexes
            .read()
            .map_err(|_| Self::registry_lock_err())?;
        Ok(indexes.get(&assignment_id).cloned())
    }

    /// Persist and index a submission's fingerprints.
    pub fn insert(
        &self,
        assignment_id: AssignmentId,
        submission_id: SubmissionId,
        submitted_at: DateTime<Utc>,
        fingerprints: &FingerprintSet,
    ) -> Result<InsertOutcome, IndexError> {
        let stored = StoredDocument {
            schema_version: INDEX_SCHEMA_VERSION,
            assignment_id,
            submission_id,
            submitted_at_micros: submitted_at.timestamp_micros(),
            hashes: fingerprints.distinct_hashes(),
        };
        let index = self.for_assignment(assignment_id)?;

        // Skip the write when nothing changed. Timestamps are compared at
        // the stored precision.
        let submitted_at = DateTime::<Utc>::from_timestamp_micros(stored.submitted_at_micros)
            .unwrap_or(submitted_at);
        if index.contains(submission_id)? {
            let current = self
                .backend
                .get(&StoredDocument::key(assignment_id, submission_id))?
                .map(|bytes| self.cfg.compression.decode(&bytes))
                .transpose()?;
            if current.as_ref() == Some(&stored) {
                return Ok(InsertOutcome::Unchanged);
            }
        }

        let payload = self.cfg.compression.encode(&stored)?;
        self.backend
            .put(&StoredDocument::key(assignment_id, submission_id), &payload)?;
        let outcome = index.insert_hashes(submission_id, submitted_at, stored.hashes)?;
        debug!(
            "indexed submission {submission_id} in assignment {assignment_id}: {outcome:?}"
        );
        Ok(outcome)
    }

    /// Remove a submission from the backend and its assignment index.
    pub fn remove(&self, assignment_id: AssignmentId, submission_id: SubmissionId) -> Result<bool, IndexError> {
        self.backend
            .delete(&StoredDocument::key(assignment_id, submission_id))?;
        match self.get(assignment_id)? {
            Some(index) => index.remove(submission_id),
            None => Ok(false),
        }
    }

    pub fn candidates_for(
        &self,
        assignment_id: AssignmentId,
        submission_id: SubmissionId,
    ) -> Result<Vec<Candidate>, IndexError> {
        match self.get(assignment_id)? {
            Some(index) => index.candidates_for(submission_id),
            None => Err(IndexError::NotIndexed { submission_id }),
        }
    }

    pub fn contains(&self, assignment_id: AssignmentId, submission_id: SubmissionId) -> Result<bool, IndexError> {
        match self.get(assignment_id)? {
            Some(index) => index.contains(submission_id),
            None => Ok(false),
        }
    }

    /// Number of assignments with an index.
    pub fn assignment_count(&self) -> Result<usize, IndexError> {
        Ok(self
            .indexes
            .read()
            .map_err(|_| Self::registry_lock_err())?
            .len())
    }

    pub fn flush(&self) -> Result<(), IndexError> {
        self.backend.flush()
    }
}
