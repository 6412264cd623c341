//! Output type of the canonical text pipeline.

use serde::{Deserialize, Serialize};

use crate::config::CanonicalizeConfig;
use crate::token::Token;

/// The canonical representation of one submission's text.
///
/// For a fixed [`CanonicalizeConfig`] and input text every field is
/// deterministic, on any machine.
///
/// ```text
/// CanonicalizedDocument
/// ├── doc_id: String               # submission identifier, trimmed
/// ├── canonical_text: String       # normalized text, single-space separated
/// ├── tokens: Vec<Token>           # byte spans into canonical_text
/// ├── sha256_hex: String           # version-aware content hash
/// ├── canonical_version: u32
/// └── config: CanonicalizeConfig   # snapshot used to produce this document
/// ```
///
/// ```rust
/// use canonical::{canonicalize, CanonicalizeConfig};
///
/// let doc = canonicalize("sub-17", "The Quick, brown fox!", &CanonicalizeConfig::default()).unwrap();
/// assert_eq!(doc.canonical_text, "the quick brown fox");
/// assert_eq!(doc.tokens.len(), 4);
/// assert_eq!(&doc.canonical_text[doc.tokens[1].start..doc.tokens[1].end], "quick");
/// assert_eq!(doc.sha256_hex.len(), 64);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalizedDocument {
    pub doc_id: String,

    /// Text after Unicode normalization, case folding, punctuation stripping
    /// and whitespace collapsing. Token offsets and fingerprint position
    /// ranges index into this string.
    pub canonical_text: String,

    /// Tokens in order of appearance. With `retain_stop_words` off, stop words
    /// are missing here but still present in `canonical_text`.
    pub tokens: Vec<Token>,

    /// `SHA-256(version.to_be_bytes() || 0x00 || canonical_text)` as hex.
    ///
    /// Two submissions with the same hash normalize to identical text.
    pub sha256_hex: String,

    pub canonical_version: u32,

    pub config: CanonicalizeConfig,
}

impl CanonicalizedDocument {
    /// True when normalization left no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Canonical text covered by the byte span `[start, end)`, clamped to the
    /// text and to char boundaries.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let text = self.canonical_text.as_str();
        let mut end = end.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut start = start.min(end);
        while !text.is_char_boundary(start) {
            start -= 1;
        }
        &text[start..end]
    }
}
