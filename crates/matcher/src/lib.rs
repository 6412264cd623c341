//! # Plagcheck Matcher (`matcher`)
//!
//! Scores a target submission's fingerprints against a candidate's.
//!
//! The primary score is *containment*: the fraction of the target's distinct
//! fingerprint hashes that also appear in the candidate, scaled to 0-100. It
//! answers "how much of this submission appears elsewhere" regardless of how
//! long the other document is. A symmetric Jaccard `overlap` is reported
//! alongside it.
//!
//! Every comparison also returns the target's matched position ranges,
//! merged when they touch, for highlighting.
//!
//! Candidates come from the similarity index. Nothing in this crate looks
//! at the index; scoring depends only on the two fingerprint sets.
//!
//! ```
//! use canonical::{canonicalize, CanonicalizeConfig};
//! use fingerprint::{fingerprint_document, FingerprintConfig};
//! use matcher::{compare, Comparator, MatchConfig};
//!
//! let text = "the quick brown fox jumps over the lazy dog";
//! let doc = canonicalize("a", text, &CanonicalizeConfig::default()).unwrap();
//! let set = fingerprint_document(&doc, &FingerprintConfig::default()).unwrap();
//!
//! let cmp = compare(&set, &set).unwrap();
//! assert_eq!(cmp.score, 100.0);
//!
//! let comparator = Comparator::new(MatchConfig::default()).unwrap();
//! let results = comparator.compare_all(&set, &[&set, &set]);
//! assert_eq!(results.len(), 2);
//! ```

pub mod engine;
pub mod types;

pub use crate::engine::{compare, Comparator};
pub use crate::types::{Comparison, MatchConfig, MatchError};
