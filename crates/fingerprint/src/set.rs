//! Fingerprint set types.
//!
//! The schema and metadata are a persistence contract: stored sets are
//! decoded by the index on restart. Any incompatible change needs a new
//! `FINGERPRINT_VERSION`.

use serde::{Deserialize, Serialize};

/// Where one fingerprinted shingle sits in the canonical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionRange {
    /// Index of the first token of the shingle.
    pub start_token: usize,
    /// One past the last token of the shingle.
    pub end_token: usize,
    /// Byte offset of the first token in the canonical text.
    pub start_byte: usize,
    /// Byte offset just past the last token in the canonical text.
    pub end_byte: usize,
}

impl PositionRange {
    /// True when the two ranges share a token or touch end to start.
    pub fn touches(&self, other: &PositionRange) -> bool {
        self.start_token <= other.end_token && other.start_token <= self.end_token
    }

    /// Smallest range covering both.
    pub fn merge(&self, other: &PositionRange) -> PositionRange {
        PositionRange {
            start_token: self.start_token.min(other.start_token),
            end_token: self.end_token.max(other.end_token),
            start_byte: self.start_byte.min(other.start_byte),
            end_byte: self.end_byte.max(other.end_byte),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub hash: u64,
    pub range: PositionRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintMeta {
    pub fingerprint_version: u16,
    pub algorithm_name: String,
    pub k: usize,
    pub w: usize,
    pub seed: u64,
    pub config_version: u32,
    /// Number of tokens the set was computed from.
    pub token_count: usize,
}

/// Winnowed fingerprints of one document, ordered by position.
///
/// The same hash may appear at several positions. Similarity counts are taken
/// over [`distinct_hashes`](FingerprintSet::distinct_hashes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintSet {
    pub fingerprints: Vec<Fingerprint>,
    pub meta: FingerprintMeta,
}

impl FingerprintSet {
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// The document had fewer than `k` tokens, so no shingle could be formed.
    pub fn is_insufficient(&self) -> bool {
        self.meta.token_count < self.meta.k
    }

    /// Sorted, deduplicated fingerprint hashes.
    pub fn distinct_hashes(&self) -> Vec<u64> {
        let mut hashes: Vec<u64> = self.fingerprints.iter().map(|f| f.hash).collect();
        hashes.sort_unstable();
        hashes.dedup();
        hashes
    }

    /// Both sets were produced with identical shingling parameters.
    pub fn is_compatible_with(&self, other: &FingerprintSet) -> bool {
        let (a, b) = (&self.meta, &other.meta);
        a.fingerprint_version == b.fingerprint_version
            && a.k == b.k
            && a.w == b.w
            && a.seed == b.seed
            && a.config_version == b.config_version
    }
}
