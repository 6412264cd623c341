//! On-disk encoding of indexed documents: bincode, then optional zstd.

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use zstd::{decode_all, encode_all};

use crate::{AssignmentId, IndexError, SubmissionId, INDEX_SCHEMA_VERSION};

/// What the backend stores per indexed submission.
///
/// Only distinct hashes are kept. Positions stay with the submission record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct StoredDocument {
    pub schema_version: u16,
    pub assignment_id: AssignmentId,
    pub submission_id: SubmissionId,
    /// Microseconds since the Unix epoch.
    pub submitted_at_micros: i64,
    pub hashes: Vec<u64>,
}

impl StoredDocument {
    pub(crate) fn key(assignment_id: AssignmentId, submission_id: SubmissionId) -> String {
        format!("a{assignment_id:020}/s{submission_id:020}")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionCodec {
    None,
    #[default]
    Zstd,
}

/// Compression applied to stored records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionConfig {
    #[serde(default)]
    pub codec: CompressionCodec,
    /// zstd level, 1-22.
    #[serde(default = "CompressionConfig::default_level")]
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: Self::default_level(),
        }
    }
}

impl CompressionConfig {
    fn default_level() -> i32 {
        3
    }

    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }

    pub(crate) fn encode(&self, doc: &StoredDocument) -> Result<Vec<u8>, IndexError> {
        let encoded = encode_to_vec(doc, standard())?;
        self.compress(&encoded)
    }

    pub(crate) fn decode(&self, data: &[u8]) -> Result<StoredDocument, IndexError> {
        let decompressed = self.decompress(data)?;
        let (doc, _) = decode_from_slice(&decompressed, standard())?;
        Ok(doc)
    }
}
