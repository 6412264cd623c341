//! SHA-256 content identity of a canonical document.
//!
//! ```text
//! hash_canonical_bytes: SHA-256(version.to_be_bytes() || 0x00 || canonical_text_bytes)
//! ```
//!
//! The version prefix keeps hashes from different normalizer versions apart
//! even for identical text.

use sha2::{Digest, Sha256};

/// Compute the canonical identity hash for canonical text and version.
///
/// ```rust
/// use canonical::hash_canonical_bytes;
///
/// let v1 = hash_canonical_bytes(1, b"hello world");
/// let v2 = hash_canonical_bytes(2, b"hello world");
/// assert_ne!(v1, v2);
/// assert_eq!(v1, hash_canonical_bytes(1, b"hello world"));
/// ```
pub fn hash_canonical_bytes(canonical_version: u32, canonical_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_version.to_be_bytes());
    hasher.update([0]);
    hasher.update(canonical_bytes);
    hex::encode(hasher.finalize())
}
