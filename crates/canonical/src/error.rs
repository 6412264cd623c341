use thiserror::Error;

/// Errors that can occur during canonicalization.
///
/// Empty input is not an error here: it produces a document with no tokens,
/// which the fingerprint stage reports as insufficient content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("canonical document requires a non-empty doc_id")]
    MissingDocId,
}
