//! Error types produced by the ingest crate.
//!
//! All errors are typed, cloneable, and comparable so callers can map them to
//! submission state and HTTP responses without string matching.
//!
//! # Error Categories
//!
//! | Error | Category | Description |
//! |-------|----------|-------------|
//! | [`UnsupportedFormat`](IngestError::UnsupportedFormat) | Intake | File extension is not PDF/DOC/DOCX/TXT |
//! | [`ExtractionFailure`](IngestError::ExtractionFailure) | Intake | Document corrupt or has no extractable text |
//! | [`PayloadTooLarge`](IngestError::PayloadTooLarge) | Validation | Raw document exceeds the configured limit |
//! | [`InvalidConfig`](IngestError::InvalidConfig) | Configuration | [`IngestConfig`](crate::IngestConfig) failed validation |
//!
//! # HTTP Status Code Mapping
//!
//! ```rust
//! use ingest::IngestError;
//!
//! fn to_http_status(error: &IngestError) -> u16 {
//!     match error {
//!         IngestError::UnsupportedFormat { .. } => 415,
//!         IngestError::PayloadTooLarge(_) => 413,
//!         IngestError::ExtractionFailure { .. } => 422,
//!         _ => 400,
//!     }
//! }
//! ```
use thiserror::Error;

use crate::format::DocumentFormat;

/// Errors that can occur while turning an uploaded document into text.
///
/// Extraction errors are reported, never retried here. The orchestrator
/// decides whether a later check request tries again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// The declared file name does not carry a supported extension.
    ///
    /// ```rust
    /// use ingest::{DocumentFormat, IngestError};
    ///
    /// let err = DocumentFormat::from_file_name("diagram.png").unwrap_err();
    /// assert!(matches!(err, IngestError::UnsupportedFormat { .. }));
    /// ```
    #[error("unsupported document format: {file_name}")]
    UnsupportedFormat { file_name: String },

    /// The document is corrupt, or its text layer could not be read.
    ///
    /// Scanned-image PDFs without embedded text land here too.
    #[error("failed to extract text from {format} document: {reason}")]
    ExtractionFailure {
        format: DocumentFormat,
        reason: String,
    },

    /// Raw document bytes exceed `IngestConfig::max_payload_bytes`.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Configuration rejected by [`IngestConfig::validate`](crate::IngestConfig::validate).
    #[error("invalid ingest config: {0}")]
    InvalidConfig(String),
}

impl IngestError {
    pub(crate) fn extraction(format: DocumentFormat, reason: impl Into<String>) -> Self {
        IngestError::ExtractionFailure {
            format,
            reason: reason.into(),
        }
    }
}
