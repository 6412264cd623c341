//! Configuration and error types for fingerprint generation.
//!
//! The fingerprint stage is a pure function of `(canonical tokens, config)`;
//! nothing here touches I/O or the environment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default token hash seed. Changing it invalidates every stored fingerprint.
pub const DEFAULT_SEED: u64 = 0xF00D_BAAD_F00D_BAAD;

/// Shingling and winnowing parameters.
///
/// Fingerprints are only comparable when both sides were produced with the
/// same `k`, `w`, `seed` and `version`.
///
/// ```rust
/// use fingerprint::FingerprintConfig;
///
/// let cfg = FingerprintConfig::default().with_k(7).with_w(5);
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.k, 7);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintConfig {
    #[serde(default = "FingerprintConfig::default_version")]
    pub version: u32,
    /// Shingle length in tokens.
    #[serde(default = "FingerprintConfig::default_k")]
    pub k: usize,
    /// Winnowing window, in consecutive shingle hashes. Any shared run of at
    /// least `w + k - 1` tokens is guaranteed to produce a shared fingerprint.
    #[serde(default = "FingerprintConfig::default_w")]
    pub w: usize,
    /// Seed for the token hash and the rolling-hash base.
    #[serde(default = "FingerprintConfig::default_seed")]
    pub seed: u64,
}

impl FingerprintConfig {
    fn default_version() -> u32 {
        1
    }

    fn default_k() -> usize {
        5
    }

    fn default_w() -> usize {
        4
    }

    fn default_seed() -> u64 {
        DEFAULT_SEED
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_w(mut self, w: usize) -> Self {
        self.w = w;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), FingerprintError> {
        if self.k < 1 {
            return Err(FingerprintError::InvalidConfigK { k: self.k });
        }
        if self.w < 1 {
            return Err(FingerprintError::InvalidConfigW { w: self.w });
        }
        if self.version < 1 {
            return Err(FingerprintError::InvalidConfigVersion {
                version: self.version,
            });
        }
        Ok(())
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            k: Self::default_k(),
            w: Self::default_w(),
            seed: Self::default_seed(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("invalid config: k must be >= 1 (got {k})")]
    InvalidConfigK { k: usize },

    #[error("invalid config: w must be >= 1 (got {w})")]
    InvalidConfigW { w: usize },

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = FingerprintConfig::default();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.k, 5);
        assert_eq!(cfg.w, 4);
        assert_eq!(cfg.seed, DEFAULT_SEED);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_parameters_rejected() {
        assert_eq!(
            FingerprintConfig::new().with_k(0).validate(),
            Err(FingerprintError::InvalidConfigK { k: 0 })
        );
        assert_eq!(
            FingerprintConfig::new().with_w(0).validate(),
            Err(FingerprintError::InvalidConfigW { w: 0 })
        );
        let cfg = FingerprintConfig {
            version: 0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(FingerprintError::InvalidConfigVersion { version: 0 })
        );
    }

    #[test]
    fn serde_fills_missing_fields() {
        let cfg: FingerprintConfig = serde_json::from_str(r#"{"k": 8}"#).unwrap();
        assert_eq!(cfg.k, 8);
        assert_eq!(cfg.w, 4);
        assert_eq!(cfg.seed, DEFAULT_SEED);
    }
}
