//! Canonical text layer of the plagiarism checker.
//!
//! Extracted submission text goes in; a deterministic, versioned token stream
//! comes out. The fingerprint stage shingles these tokens, and highlighting
//! maps fingerprint positions back through the token byte offsets.
//!
//! ## What we do
//!
//! - Unicode NFKC normalization (configurable)
//! - Locale-free lowercasing, grapheme by grapheme
//! - Punctuation and symbols act as delimiters and disappear
//! - Whitespace collapses to single spaces
//! - Optional removal of English stop words from the token stream
//! - Version-aware SHA-256 content hash
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock calls, no OS/locale dependence. Same text and config give
//! the same document on any machine.

mod config;
mod document;
mod error;
mod hash;
mod pipeline;
mod stopwords;
mod token;

pub use crate::config::CanonicalizeConfig;
pub use crate::document::CanonicalizedDocument;
pub use crate::error::CanonicalError;
pub use crate::hash::hash_canonical_bytes;
pub use crate::pipeline::canonicalize;
pub use crate::stopwords::is_stop_word;
pub use crate::token::Token;
