//! In-memory inverted index for one assignment.

use std::cmp::Reverse;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use fingerprint::FingerprintSet;
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::{AssignmentId, IndexError, SubmissionId};

/// Another submission that shares fingerprints with the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub submission_id: SubmissionId,
    /// Distinct fingerprint hashes shared with the target.
    pub shared_hashes: usize,
    pub submitted_at: DateTime<Utc>,
}

/// What [`SimilarityIndex::insert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The submission was indexed with different content or timestamp; its
    /// old postings were dropped.
    Replaced,
    /// Same hashes and timestamp were already indexed.
    Unchanged,
}

#[derive(Debug, Clone)]
struct DocumentEntry {
    submitted_at: DateTime<Utc>,
    /// Sorted, deduplicated.
    hashes: Vec<u64>,
}

#[derive(Debug, Default)]
struct IndexState {
    postings: HashMap<u64, HashSet<SubmissionId>>,
    documents: HashMap<SubmissionId, DocumentEntry>,
}

impl IndexState {
    fn unlink(&mut self, id: SubmissionId, hashes: &[u64]) {
        for hash in hashes {
            if let Some(bucket) = self.postings.get_mut(hash) {
                bucket.remove(&id);
                if bucket.is_empty() {
                    self.postings.remove(hash);
                }
            }
        }
    }
}

/// Fingerprint hash to submission ids, scoped to one assignment.
///
/// Reads and writes may interleave from many threads. A reader that started
/// before an insert may not see it.
#[derive(Debug)]
pub struct SimilarityIndex {
    assignment_id: AssignmentId,
    state: RwLock<IndexState>,
}

impl SimilarityIndex {
    pub fn new(assignment_id: AssignmentId) -> Self {
        Self {
            assignment_id,
            state: RwLock::new(IndexState::default()),
        }
    }

    pub fn assignment_id(&self) -> AssignmentId {
        self.assignment_id
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, IndexState>, IndexError> {
        self.state
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexState>, IndexError> {
        self.state
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))
    }

    /// Index a submission's fingerprints.
    ///
    /// Calling it again with identical content is a no-op. Calling it with
    /// different content replaces the previous postings.
    pub fn insert(
        &self,
        submission_id: SubmissionId,
        submitted_at: DateTime<Utc>,
        fingerprints: &FingerprintSet,
    ) -> Result<InsertOutcome, IndexError> {
        self.insert_hashes(submission_id, submitted_at, fingerprints.distinct_hashes())
    }

    pub(crate) fn insert_hashes(
        &self,
        submission_id: SubmissionId,
        submitted_at: DateTime<Utc>,
        hashes: Vec<u64>,
    ) -> Result<InsertOutcome, IndexError> {
        let mut state = self.write()?;

        let outcome = match state.documents.get(&submission_id) {
            Some(existing)
                if existing.hashes == hashes && existing.submitted_at == submitted_at =>
            {
                return Ok(InsertOutcome::Unchanged);
            }
            Some(existing) => {
                let old = existing.hashes.clone();
                state.unlink(submission_id, &old);
                InsertOutcome::Replaced
            }
            None => InsertOutcome::Inserted,
        };

        for &hash in &hashes {
            state.postings.entry(hash).or_default().insert(submission_id);
        }
        state.documents.insert(
            submission_id,
            DocumentEntry {
                submitted_at,
                hashes,
            },
        );
        Ok(outcome)
    }

    /// Drop a submission and its postings. Returns whether it was indexed.
    pub fn remove(&self, submission_id: SubmissionId) -> Result<bool, IndexError> {
        let mut state = self.write()?;
        match state.documents.remove(&submission_id) {
            Some(entry) => {
                state.unlink(submission_id, &entry.hashes);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Other submissions sharing at least one fingerprint with `submission_id`.
    ///
    /// Ordered by shared count (highest first), then earlier submission, then
    /// lower id. Never contains the target itself.
    pub fn candidates_for(&self, submission_id: SubmissionId) -> Result<Vec<Candidate>, IndexError> {
        let state = self.read()?;
        let target = state
            .documents
            .get(&submission_id)
            .ok_or(IndexError::NotIndexed { submission_id })?;

        let mut counts: HashMap<SubmissionId, usize> = HashMap::new();
        for hash in &target.hashes {
            if let Some(bucket) = state.postings.get(hash) {
                for &other in bucket {
                    if other != submission_id {
                        *counts.entry(other).or_default() += 1;
                    }
                }
            }
        }

        let mut candidates: Vec<Candidate> = counts
            .into_iter()
            .filter_map(|(id, shared_hashes)| {
                state.documents.get(&id).map(|entry| Candidate {
                    submission_id: id,
                    shared_hashes,
                    submitted_at: entry.submitted_at,
                })
            })
            .collect();
        candidates.sort_by_key(|c| (Reverse(c.shared_hashes), c.submitted_at, c.submission_id));
        Ok(candidates)
    }

    pub fn contains(&self, submission_id: SubmissionId) -> Result<bool, IndexError> {
        Ok(self.read()?.documents.contains_key(&submission_id))
    }

    /// Number of indexed submissions.
    pub fn len(&self) -> Result<usize, IndexError> {
        Ok(self.read()?.documents.len())
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    /// Distinct hashes the two indexed submissions have in common.
    pub fn shared_hash_count(&self, a: SubmissionId, b: SubmissionId) -> Result<usize, IndexError> {
        let state = self.read()?;
        let lookup = |id: SubmissionId| {
            state
                .documents
                .get(&id)
                .ok_or(IndexError::NotIndexed { submission_id: id })
        };
        let (left, right) = (lookup(a)?, lookup(b)?);
        Ok(sorted_intersection_len(&left.hashes, &right.hashes))
    }
}

fn sorted_intersection_len(a: &[u64], b: &[u64]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn index_with(docs: &[(SubmissionId, i64, &[u64])]) -> SimilarityIndex {
        let index = SimilarityIndex::new(1);
        for &(id, secs, hashes) in docs {
            let mut hashes = hashes.to_vec();
            hashes.sort_unstable();
            hashes.dedup();
            index.insert_hashes(id, at(secs), hashes).unwrap();
        }
        index
    }

    #[test]
    fn candidates_ranked_by_shared_count() {
        let index = index_with(&[
            (1, 0, &[1, 2, 3, 4]),
            (2, 1, &[1, 2, 3, 9]),
            (3, 2, &[4, 10, 11]),
            (4, 3, &[50, 51]),
        ]);
        let candidates = index.candidates_for(1).unwrap();
        let ids: Vec<(SubmissionId, usize)> = candidates
            .iter()
            .map(|c| (c.submission_id, c.shared_hashes))
            .collect();
        assert_eq!(ids, vec![(2, 3), (3, 1)]);
    }

    #[test]
    fn ties_go_to_earlier_submission_then_lower_id() {
        let index = index_with(&[
            (10, 5, &[1, 2]),
            (11, 3, &[1, 2]),
            (12, 3, &[1, 2]),
            (13, 1, &[1, 2]),
        ]);
        let ids: Vec<SubmissionId> = index
            .candidates_for(10)
            .unwrap()
            .into_iter()
            .map(|c| c.submission_id)
            .collect();
        assert_eq!(ids, vec![13, 11, 12]);
    }

    #[test]
    fn never_returns_self_and_is_symmetric() {
        let index = index_with(&[(1, 0, &[7, 8]), (2, 1, &[8, 9])]);
        let for_one = index.candidates_for(1).unwrap();
        let for_two = index.candidates_for(2).unwrap();
        assert!(for_one.iter().all(|c| c.submission_id != 1));
        assert_eq!(for_one[0].submission_id, 2);
        assert_eq!(for_two[0].submission_id, 1);
        assert_eq!(for_one[0].shared_hashes, for_two[0].shared_hashes);
    }

    #[test]
    fn duplicate_insert_is_idempotent() {
        let index = index_with(&[(1, 0, &[1, 2, 3]), (2, 0, &[2, 3])]);
        let outcome = index.insert_hashes(1, at(0), vec![1, 2, 3]).unwrap();
        assert_eq!(outcome, InsertOutcome::Unchanged);
        assert_eq!(index.len().unwrap(), 2);
        assert_eq!(index.candidates_for(2).unwrap()[0].shared_hashes, 2);
    }

    #[test]
    fn reinsert_with_new_content_replaces_postings() {
        let index = index_with(&[(1, 0, &[1, 2, 3]), (2, 0, &[1, 2, 3])]);
        let outcome = index.insert_hashes(1, at(10), vec![7, 8]).unwrap();
        assert_eq!(outcome, InsertOutcome::Replaced);
        assert!(index.candidates_for(2).unwrap().is_empty());
    }

    #[test]
    fn remove_drops_postings() {
        let index = index_with(&[(1, 0, &[1, 2]), (2, 0, &[2, 3])]);
        assert!(index.remove(1).unwrap());
        assert!(!index.remove(1).unwrap());
        assert!(!index.contains(1).unwrap());
        assert!(index.candidates_for(2).unwrap().is_empty());
        assert!(index.state.read().unwrap().postings.get(&1).is_none());
    }

    #[test]
    fn unknown_target_is_not_indexed() {
        let index = SimilarityIndex::new(1);
        assert!(matches!(
            index.candidates_for(5),
            Err(IndexError::NotIndexed { submission_id: 5 })
        ));
        assert!(index.is_empty().unwrap());
    }

    #[test]
    fn shared_hash_count_matches_candidates() {
        let index = index_with(&[(1, 0, &[1, 3, 5, 7]), (2, 0, &[3, 4, 5, 6, 7])]);
        assert_eq!(index.shared_hash_count(1, 2).unwrap(), 3);
        assert_eq!(index.shared_hash_count(2, 1).unwrap(), 3);
        assert!(index.shared_hash_count(1, 9).is_err());
    }

    #[test]
    fn concurrent_inserts_and_reads() {
        use std::sync::Arc;
        use std::thread;

        let index = Arc::new(SimilarityIndex::new(1));
        index.insert_hashes(0, at(0), (0..64).collect()).unwrap();

        let handles: Vec<_> = (1..=8u64)
            .map(|id| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    index
                        .insert_hashes(id, at(id as i64), (0..id).collect())
                        .unwrap();
                    index.candidates_for(0).unwrap().len()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap() >= 1);
        }
        assert_eq!(index.candidates_for(0).unwrap().len(), 8);
    }
}
