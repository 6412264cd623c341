//! YAML pipeline configuration.
//!
//! One document configures every stage. All sections and fields are optional
//! and fall back to the stage defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "course-2025"
//!
//! ingest:
//!   max_payload_bytes: 10485760
//!   max_text_bytes: 4194304
//!   max_part_bytes: 33554432
//!
//! canonical:
//!   version: 1
//!   normalize_unicode: true
//!   lowercase: true
//!   strip_punctuation: true
//!   retain_stop_words: true
//!
//! fingerprint:
//!   k: 5
//!   w: 4
//!   seed: 17293822570713318077
//!
//! index:
//!   backend:
//!     type: redb
//!     path: /var/lib/plagcheck/index.redb
//!   compression:
//!     codec: zstd
//!     level: 3
//!
//! matcher:
//!   min_relevance: 5.0
//!   max_candidates: 50
//!   parallel: true
//!
//! orchestrator:
//!   extraction_timeout_ms: 30000
//!   auto_check: false
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use canonical::CanonicalizeConfig;
use fingerprint::FingerprintConfig;
use index::IndexConfig;
use ingest::IngestConfig;
use matcher::MatchConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for the whole checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagcheckConfig {
    /// Configuration format version
    #[serde(default = "default_format_version")]
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub canonical: CanonicalizeConfig,

    #[serde(default)]
    pub fingerprint: FingerprintConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub matcher: MatchConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl PlagcheckConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PlagcheckConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.ingest
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("ingest: {e}")))?;
        self.canonical
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("canonical: {e}")))?;
        self.fingerprint
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("fingerprint: {e}")))?;
        self.matcher
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("matcher: {e}")))?;
        self.orchestrator.validate()?;

        Ok(())
    }
}

impl Default for PlagcheckConfig {
    fn default() -> Self {
        Self {
            version: default_format_version(),
            name: None,
            ingest: IngestConfig::default(),
            canonical: CanonicalizeConfig::default(),
            fingerprint: FingerprintConfig::default(),
            index: IndexConfig::default(),
            matcher: MatchConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

/// Check scheduling knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on extraction plus fingerprinting of one document.
    #[serde(default = "default_extraction_timeout_ms")]
    pub extraction_timeout_ms: u64,

    /// Start a check in the background after every successful upload.
    #[serde(default)]
    pub auto_check: bool,
}

impl OrchestratorConfig {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.extraction_timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "orchestrator.extraction_timeout_ms must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            extraction_timeout_ms: default_extraction_timeout_ms(),
            auto_check: false,
        }
    }
}

fn default_format_version() -> String {
    "1.0".to_string()
}
fn default_extraction_timeout_ms() -> u64 {
    30_000
}
