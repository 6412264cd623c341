//! Document intake for the plagiarism checker.
//!
//! Uploaded files arrive as a file name plus raw bytes. This crate decides the
//! format from the extension, pulls the visible text out of the container and
//! enforces size limits. Nothing here normalizes text; that is the canonical
//! stage's job.
//!
//! ## Supported formats
//!
//! - **TXT** - UTF-8 (BOM tolerated), UTF-16 with BOM, lossy fallback
//! - **DOCX** - `word/document.xml` text runs
//! - **PDF** - embedded text layer (feature `pdf`)
//! - **DOC** - best-effort recovery of text runs from the OLE2 container
//!
//! ## Example
//!
//! ```
//! use ingest::{extract_text, DocumentFormat, IngestConfig};
//!
//! let extracted = extract_text("essay.txt", b"An essay about rivers.", &IngestConfig::default())
//!     .unwrap();
//! assert_eq!(extracted.format, DocumentFormat::Txt);
//! assert_eq!(extracted.text, "An essay about rivers.");
//! assert!(!extracted.truncated);
//! ```
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn, Level};

mod config;
mod error;
mod extract;
mod format;

pub use crate::config::IngestConfig;
pub use crate::error::IngestError;
pub use crate::format::DocumentFormat;

/// Text pulled out of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub format: DocumentFormat,
    pub text: String,
    /// Set when the text was cut to `IngestConfig::max_text_bytes`.
    pub truncated: bool,
}

/// Detect the format from `file_name` and extract its text.
pub fn extract_text(
    file_name: &str,
    bytes: &[u8],
    cfg: &IngestConfig,
) -> Result<ExtractedText, IngestError> {
    let format = match DocumentFormat::from_file_name(file_name) {
        Ok(format) => format,
        Err(err) => {
            warn!(file_name, error = %err, "extract_failure");
            return Err(err);
        }
    };
    extract(format, bytes, cfg)
}

/// Extract text from a document whose format is already known.
pub fn extract(
    format: DocumentFormat,
    bytes: &[u8],
    cfg: &IngestConfig,
) -> Result<ExtractedText, IngestError> {
    let start = Instant::now();
    let span = tracing::span!(
        Level::INFO,
        "ingest.extract",
        format = %format,
        payload_len = bytes.len()
    );
    let _guard = span.enter();

    match extract_inner(format, bytes, cfg) {
        Ok(extracted) => {
            let elapsed_micros = start.elapsed().as_micros();
            info!(
                text_len = extracted.text.len(),
                truncated = extracted.truncated,
                elapsed_micros,
                "extract_success"
            );
            Ok(extracted)
        }
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(error = %err, elapsed_micros, "extract_failure");
            Err(err)
        }
    }
}

fn extract_inner(
    format: DocumentFormat,
    bytes: &[u8],
    cfg: &IngestConfig,
) -> Result<ExtractedText, IngestError> {
    cfg.validate()?;

    if let Some(limit) = cfg.max_payload_bytes {
        if bytes.len() > limit {
            return Err(IngestError::PayloadTooLarge(format!(
                "document is {} bytes, limit is {limit}",
                bytes.len()
            )));
        }
    }

    let mut text = match format {
        DocumentFormat::Txt => extract::decode_text(bytes),
        DocumentFormat::Docx => extract::extract_docx(bytes, cfg.max_part_bytes)?,
        DocumentFormat::Pdf => extract::extract_pdf(bytes)?,
        DocumentFormat::Doc => extract::extract_doc(bytes)?,
    };

    let truncated = match cfg.max_text_bytes {
        Some(limit) if text.len() > limit => {
            text.truncate(floor_char_boundary(&text, limit));
            true
        }
        _ => false,
    };

    Ok(ExtractedText {
        format,
        text,
        truncated,
    })
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut idx = index.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
