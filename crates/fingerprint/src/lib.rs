//! # Document fingerprinting
//!
//! Turns a canonical token stream into a compact set of position-tagged
//! fingerprints that survive local edits. Two documents that share a long
//! enough passage share at least one fingerprint, which is what the
//! similarity index and the comparator build on.
//!
//! ## Contract
//!
//! - Input is canonical tokens from the `canonical` crate, in order.
//! - Nothing here normalizes or tokenizes text.
//! - Pure function of `(tokens, config)`: identical input yields a
//!   byte-identical [`FingerprintSet`] on every run and every machine.
//!
//! ## Pipeline
//!
//! 1. **Shingling**: every run of `k` consecutive tokens is hashed into a
//!    64-bit value. Tokens are hashed with seeded xxh3, then combined with a
//!    polynomial rolling hash so each step is O(1).
//! 2. **Winnowing**: within every window of `w` consecutive shingle hashes the
//!    minimum is kept, ties going to the rightmost occurrence. Each selected
//!    position is emitted once.
//!
//! Documents with fewer than `k` tokens produce an empty set whose
//! [`is_insufficient`](FingerprintSet::is_insufficient) is true.
//!
//! ## Example
//!
//! ```
//! use canonical::{canonicalize, CanonicalizeConfig};
//! use fingerprint::{fingerprint_document, FingerprintConfig};
//!
//! let doc = canonicalize(
//!     "sub-1",
//!     "The quick brown fox jumps over the lazy dog",
//!     &CanonicalizeConfig::default(),
//! )
//! .unwrap();
//! let set = fingerprint_document(&doc, &FingerprintConfig::default()).unwrap();
//!
//! assert!(!set.is_empty());
//! assert!(!set.is_insufficient());
//! assert_eq!(set.meta.token_count, 9);
//! ```

pub mod config;
mod set;
mod shingles;

use canonical::{CanonicalizedDocument, Token};

pub use crate::config::{FingerprintConfig, FingerprintError, DEFAULT_SEED};
pub use crate::set::{Fingerprint, FingerprintMeta, FingerprintSet, PositionRange};
use crate::shingles::{make_shingles_rolling, winnow_minq};

/// Current fingerprint algorithm version.
pub const FINGERPRINT_VERSION: u16 = 1;

/// Human-readable algorithm identifier.
pub const FINGERPRINT_ALGORITHM: &str = "rolling_winnow_v1";

/// Fingerprint a canonicalized document.
pub fn fingerprint_document(
    doc: &CanonicalizedDocument,
    cfg: &FingerprintConfig,
) -> Result<FingerprintSet, FingerprintError> {
    fingerprint_tokens(&doc.tokens, cfg)
}

/// Fingerprint a token stream. Position ranges use the tokens' byte offsets.
pub fn fingerprint_tokens(
    tokens: &[Token],
    cfg: &FingerprintConfig,
) -> Result<FingerprintSet, FingerprintError> {
    cfg.validate()?;

    let shingles = make_shingles_rolling(tokens, cfg.k, cfg.seed);
    let fingerprints = winnow_minq(&shingles, cfg.w)
        .into_iter()
        .map(|sel| {
            let first = &tokens[sel.start_idx];
            let last = &tokens[sel.start_idx + cfg.k - 1];
            Fingerprint {
                hash: sel.hash,
                range: PositionRange {
                    start_token: sel.start_idx,
                    end_token: sel.start_idx + cfg.k,
                    start_byte: first.start,
                    end_byte: last.end,
                },
            }
        })
        .collect();

    Ok(FingerprintSet {
        fingerprints,
        meta: FingerprintMeta {
            fingerprint_version: FINGERPRINT_VERSION,
            algorithm_name: FINGERPRINT_ALGORITHM.to_string(),
            k: cfg.k,
            w: cfg.w,
            seed: cfg.seed,
            config_version: cfg.version,
            token_count: tokens.len(),
        },
    })
}

#[cfg(test)]
mod tests {
    use canonical::{canonicalize, CanonicalizeConfig};

    use super::*;

    fn doc(text: &str) -> CanonicalizedDocument {
        canonicalize("sub", text, &CanonicalizeConfig::default()).unwrap()
    }

    #[test]
    fn identical_text_identical_sets() {
        let cfg = FingerprintConfig::default();
        let text = "It was the best of times, it was the worst of times, it was the age of wisdom";
        let a = fingerprint_document(&doc(text), &cfg).unwrap();
        let b = fingerprint_document(&doc(text), &cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[test]
    fn formatting_differences_do_not_matter() {
        let cfg = FingerprintConfig::default();
        let a = fingerprint_document(&doc("The Quick brown fox, jumps over the lazy dog."), &cfg)
            .unwrap();
        let b = fingerprint_document(&doc("the quick   BROWN fox jumps\nover the lazy dog"), &cfg)
            .unwrap();
        assert_eq!(a.distinct_hashes(), b.distinct_hashes());
    }

    #[test]
    fn short_document_is_insufficient() {
        let set = fingerprint_document(&doc("only three tokens"), &FingerprintConfig::default())
            .unwrap();
        assert!(set.is_empty());
        assert!(set.is_insufficient());
        assert_eq!(set.meta.token_count, 3);

        let empty = fingerprint_document(&doc(""), &FingerprintConfig::default()).unwrap();
        assert!(empty.is_insufficient());
    }

    #[test]
    fn exactly_k_tokens_yields_one_fingerprint() {
        let set = fingerprint_document(&doc("one two three four five"), &FingerprintConfig::default())
            .unwrap();
        assert_eq!(set.len(), 1);
        assert!(!set.is_insufficient());
    }

    #[test]
    fn ranges_point_into_canonical_text() {
        let d = doc("Alpha beta gamma delta epsilon zeta eta theta iota kappa");
        let cfg = FingerprintConfig::default().with_k(3).with_w(2);
        let set = fingerprint_document(&d, &cfg).unwrap();
        assert!(!set.is_empty());
        for fp in &set.fingerprints {
            let r = fp.range;
            assert_eq!(r.end_token - r.start_token, 3);
            assert_eq!(r.start_byte, d.tokens[r.start_token].start);
            assert_eq!(r.end_byte, d.tokens[r.end_token - 1].end);
            let shingle = &d.canonical_text[r.start_byte..r.end_byte];
            assert_eq!(shingle.split(' ').count(), 3);
        }
        assert!(set
            .fingerprints
            .windows(2)
            .all(|w| w[0].range.start_token < w[1].range.start_token));
    }

    #[test]
    fn shared_passage_shares_fingerprints() {
        let cfg = FingerprintConfig::default();
        let passage = "mitochondria generate most of the chemical energy needed to power the cell";
        let a = fingerprint_document(&doc(&format!("Introduction to biology. {passage}")), &cfg)
            .unwrap();
        let b = fingerprint_document(&doc(&format!("{passage} and that is all I know")), &cfg)
            .unwrap();
        let hb = b.distinct_hashes();
        let shared = a
            .distinct_hashes()
            .into_iter()
            .filter(|h| hb.binary_search(h).is_ok())
            .count();
        assert!(shared > 0);
    }

    #[test]
    fn meta_records_parameters() {
        let cfg = FingerprintConfig::default().with_seed(7);
        let set = fingerprint_document(&doc("a b c d e f"), &cfg).unwrap();
        assert_eq!(set.meta.k, 5);
        assert_eq!(set.meta.w, 4);
        assert_eq!(set.meta.seed, 7);
        assert_eq!(set.meta.fingerprint_version, FINGERPRINT_VERSION);
        assert_eq!(set.meta.algorithm_name, FINGERPRINT_ALGORITHM);
    }

    #[test]
    fn invalid_config_rejected() {
        let err = fingerprint_document(&doc("a b c"), &FingerprintConfig::new().with_w(0))
            .unwrap_err();
        assert_eq!(err, FingerprintError::InvalidConfigW { w: 0 });
    }
}
