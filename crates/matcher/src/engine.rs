use fingerprint::{FingerprintSet, PositionRange};
use hashbrown::HashSet;
use rayon::prelude::*;

use crate::types::{Comparison, MatchConfig, MatchError};


/// Compare `target` against `candidate` by containment.
///
/// The score is the share of the target's distinct fingerprint hashes that
/// also occur in the candidate, scaled to 0-100. A target without
/// fingerprints scores 0 against everything.
pub fn compare(target: &FingerprintSet, candidate: &FingerprintSet) -> Result<Comparison, MatchError> {
    if !target.is_compatible_with(candidate) {
        let (t, c) = (&target.meta, &candidate.meta);
        return Err(MatchError::Incompatible(format!(
            "target k={} w={} seed={:#x} v{}/{} vs candidate k={} w={} seed={:#x} v{}/{}",
            t.k,
            t.w,
            t.seed,
            t.fingerprint_version,
            t.config_version,
            c.k,
            c.w,
            c.seed,
            c.fingerprint_version,
            c.config_version,
        )));
    }

    let target_hashes = target.distinct_hashes();
    let candidate_hashes = candidate.distinct_hashes();
    let shared: HashSet<u64> = sorted_intersection(&target_hashes, &candidate_hashes);

    let shared_count = shared.len();
    let union = target_hashes.len() + candidate_hashes.len() - shared_count;

    Ok(Comparison {
        score: percentage(shared_count, target_hashes.len()),
        overlap: percentage(shared_count, union),
        shared_fingerprint_count: shared_count,
        target_fingerprint_count: target_hashes.len(),
        candidate_fingerprint_count: candidate_hashes.len(),
        matched_ranges: matched_ranges(target, &shared),
    })
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn sorted_intersection(a: &[u64], b: &[u64]) -> HashSet<u64> {
    let mut out = HashSet::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.insert(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Target ranges whose hash is shared, merged when adjacent or overlapping.
fn matched_ranges(target: &FingerprintSet, shared: &HashSet<u64>) -> Vec<PositionRange> {
    let mut ranges: Vec<PositionRange> = Vec::new();
    for fp in target.fingerprints.iter().filter(|fp| shared.contains(&fp.hash)) {
        match ranges.last_mut() {
            Some(last) if last.touches(&fp.range) => *last = last.merge(&fp.range),
            _ => ranges.push(fp.range),
        }
    }
    ranges
}

/// Runs a batch of independent comparisons for one check.
#[derive(Debug, Clone, Default)]
pub struct Comparator {
    cfg: MatchConfig,
}

impl Comparator {
    pub fn new(cfg: MatchConfig) -> Result<Self, MatchError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Compare `target` against every candidate.
    ///
    /// One result per candidate, in input order. A failed comparison does not
    /// affect the others. Runs on the rayon pool when `parallel` is set.
    pub fn compare_all(
        &self,
        target: &FingerprintSet,
        candidates: &[&FingerprintSet],
    ) -> Vec<Result<Comparison, MatchError>> {
        if self.cfg.parallel && candidates.len() > 1 {
            candidates
                .par_iter()
                .map(|candidate| compare(target, candidate))
                .collect()
        } else {
            candidates
                .iter()
                .map(|candidate| compare(target, candidate))
                .collect()
        }
    }
}
