//! Configuration for document intake.
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("defaults are valid");
//! assert_eq!(config.max_payload_bytes, Some(10 * 1024 * 1024));
//! ```
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Runtime configuration for extraction.
///
/// Cheap to clone, serde-friendly so it can be embedded in the pipeline YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Semantic version of the intake behavior. Must be >= 1.
    #[serde(default = "IngestConfig::default_version")]
    pub version: u32,
    /// Upper bound on raw document bytes. `None` disables the check.
    #[serde(default = "IngestConfig::default_max_payload_bytes")]
    pub max_payload_bytes: Option<usize>,
    /// Upper bound on extracted text bytes. Longer text is truncated on a
    /// char boundary.
    #[serde(default = "IngestConfig::default_max_text_bytes")]
    pub max_text_bytes: Option<usize>,
    /// Upper bound on the inflated size of a container part such as DOCX
    /// `word/document.xml`. Checked while decompressing.
    #[serde(default = "IngestConfig::default_max_part_bytes")]
    pub max_part_bytes: Option<usize>,
}

impl IngestConfig {
    fn default_version() -> u32 {
        1
    }

    fn default_max_payload_bytes() -> Option<usize> {
        Some(10 * 1024 * 1024)
    }

    fn default_max_text_bytes() -> Option<usize> {
        Some(4 * 1024 * 1024)
    }

    fn default_max_part_bytes() -> Option<usize> {
        Some(32 * 1024 * 1024)
    }

    pub fn with_max_payload_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_payload_bytes = limit;
        self
    }

    pub fn with_max_text_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_text_bytes = limit;
        self
    }

    pub fn with_max_part_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_part_bytes = limit;
        self
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.version == 0 {
            return Err(IngestError::InvalidConfig(
                "version must be >= 1".to_string(),
            ));
        }
        if self.max_payload_bytes == Some(0) {
            return Err(IngestError::InvalidConfig(
                "max_payload_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_text_bytes == Some(0) {
            return Err(IngestError::InvalidConfig(
                "max_text_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_part_bytes == Some(0) {
            return Err(IngestError::InvalidConfig(
                "max_part_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            max_payload_bytes: Self::default_max_payload_bytes(),
            max_text_bytes: Self::default_max_text_bytes(),
            max_part_bytes: Self::default_max_part_bytes(),
        }
    }
}
