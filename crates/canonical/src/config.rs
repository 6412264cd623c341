//! Configuration types for the canonical text pipeline.
//!
//! [`CanonicalizeConfig`] controls how extracted submission text is normalized
//! before fingerprinting.
//!
//! # Versioning
//!
//! The `version` field is part of every content hash. Any change to
//! canonicalization behavior must come with a version bump so that stored
//! fingerprints from an older normalizer are never compared against new ones
//! as if they were equivalent.
//!
//! # Examples
//!
//! ```rust
//! use canonical::CanonicalizeConfig;
//!
//! let config = CanonicalizeConfig::default();
//! assert_eq!(config.version, 1);
//! assert!(config.normalize_unicode);
//! assert!(config.strip_punctuation);
//! assert!(config.lowercase);
//! assert!(config.retain_stop_words);
//! ```
//!
//! Dropping stop words for a coarser comparison:
//!
//! ```rust
//! use canonical::CanonicalizeConfig;
//!
//! let config = CanonicalizeConfig {
//!     retain_stop_words: false,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CanonicalError;

/// Configuration for the canonical text pipeline.
///
/// Cheap to clone and serde-friendly so it can be embedded in the pipeline
/// YAML. Missing fields fall back to the defaults below.
///
/// ```json
/// {
///   "version": 1,
///   "normalize_unicode": true,
///   "strip_punctuation": true,
///   "lowercase": true,
///   "retain_stop_words": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalizeConfig {
    /// Semantic version of the canonicalization behavior.
    ///
    /// Must be >= 1. Version 0 is reserved and rejected with
    /// [`CanonicalError::InvalidConfig`].
    ///
    /// The version is mixed into the identity hash:
    /// ```text
    /// SHA-256(version.to_be_bytes() || 0x00 || text_bytes)
    /// ```
    #[serde(default = "CanonicalizeConfig::default_version")]
    pub version: u32,

    /// Apply Unicode NFKC normalization before other transforms.
    ///
    /// Composed and decomposed forms ("é" vs "e" + U+0301) and compatibility
    /// characters (full-width digits, ligatures) collapse to one spelling, so
    /// a copied passage cannot dodge detection by swapping code points.
    #[serde(default = "CanonicalizeConfig::default_true")]
    pub normalize_unicode: bool,

    /// Treat Unicode punctuation as a delimiter and drop it.
    ///
    /// ```text
    /// "Hello, world!"  -> "hello world"
    /// "It's 100% fun." -> "it s 100 fun"
    /// ```
    ///
    /// Numbers are always retained.
    #[serde(default = "CanonicalizeConfig::default_true")]
    pub strip_punctuation: bool,

    /// Apply locale-free Unicode lowercasing.
    #[serde(default = "CanonicalizeConfig::default_true")]
    pub lowercase: bool,

    /// Keep English stop words ("the", "of", "and", ...) in the token stream.
    ///
    /// When `false`, stop words are removed from [`tokens`](crate::CanonicalizedDocument::tokens)
    /// only. The canonical text is left intact so token byte offsets stay
    /// valid for highlighting.
    #[serde(default = "CanonicalizeConfig::default_true")]
    pub retain_stop_words: bool,
}

impl CanonicalizeConfig {
    fn default_version() -> u32 {
        1
    }

    fn default_true() -> bool {
        true
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), CanonicalError> {
        if self.version == 0 {
            return Err(CanonicalError::InvalidConfig(
                "config version must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CanonicalizeConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            normalize_unicode: true,
            strip_punctuation: true,
            lowercase: true,
            retain_stop_words: true,
        }
    }
}
