//! # Plagcheck Index
//!
//! Per-assignment inverted indexes from fingerprint hash to the submissions
//! containing it, used to narrow a comparison down to plausible candidates.
//!
//! ## Layout
//!
//! - [`SimilarityIndex`] holds one assignment's postings in memory and answers
//!   [`candidates_for`](SimilarityIndex::candidates_for) queries.
//! - [`SimilarityIndexes`] keys those indexes by assignment and writes every
//!   insert and removal through an [`IndexBackend`] so the postings can be
//!   rebuilt after a restart.
//! - Backends are selected with [`BackendConfig`]: an in-memory map, or a redb
//!   file (feature `backend-redb`, on by default).
//! - Stored records are bincode-encoded and zstd-compressed according to
//!   [`CompressionConfig`].
//!
//! Only distinct fingerprint hashes are indexed. Positions are not needed to
//! rank candidates.
//!
//! ```
//! use chrono::Utc;
//! use canonical::{canonicalize, CanonicalizeConfig};
//! use fingerprint::{fingerprint_document, FingerprintConfig};
//! use index::SimilarityIndex;
//!
//! let cfg = CanonicalizeConfig::default();
//! let fp = FingerprintConfig::default();
//! let a = canonicalize("a", "rivers carve valleys over thousands of years", &cfg).unwrap();
//! let b = canonicalize("b", "glaciers and rivers carve valleys over thousands of years", &cfg).unwrap();
//!
//! let index = SimilarityIndex::new(1);
//! index.insert(1, Utc::now(), &fingerprint_document(&a, &fp).unwrap()).unwrap();
//! index.insert(2, Utc::now(), &fingerprint_document(&b, &fp).unwrap()).unwrap();
//!
//! let candidates = index.candidates_for(2).unwrap();
//! assert_eq!(candidates[0].submission_id, 1);
//! ```

mod backend;
mod codec;
mod registry;
mod similarity;

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, IndexBackend};
pub use codec::{CompressionCodec, CompressionConfig};
pub use registry::SimilarityIndexes;
pub use similarity::{Candidate, InsertOutcome, SimilarityIndex};

use bincode::error::{DecodeError, EncodeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bump this value whenever the stored record layout changes.
pub const INDEX_SCHEMA_VERSION: u16 = 1;

pub type SubmissionId = u64;
pub type AssignmentId = u64;

/// Index configuration, the `index` section of the pipeline config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
}

impl IndexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Zstd(String),
    #[error("submission {submission_id} is not indexed")]
    NotIndexed { submission_id: SubmissionId },
    #[error("stored record {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

impl From<EncodeError> for IndexError {
    fn from(e: EncodeError) -> Self {
        IndexError::Encode(e.to_string())
    }
}

impl From<DecodeError> for IndexError {
    fn from(e: DecodeError) -> Self {
        IndexError::Decode(e.to_string())
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Zstd(e.to_string())
    }
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}
