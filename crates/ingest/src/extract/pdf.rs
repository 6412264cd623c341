//! PDF text-layer extraction.

#[cfg(feature = "pdf")]
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::IngestError;
use crate::format::DocumentFormat;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[cfg(feature = "pdf")]
pub(crate) fn extract_pdf(bytes: &[u8]) -> Result<String, IngestError> {
    if !looks_like_pdf(bytes) {
        return Err(IngestError::extraction(
            DocumentFormat::Pdf,
            "missing %PDF- header",
        ));
    }

    // The parser panics on some malformed cross-reference tables.
    let parsed = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));
    let text = match parsed {
        Ok(Ok(text)) => text,
        Ok(Err(err)) => {
            return Err(IngestError::extraction(DocumentFormat::Pdf, err.to_string()));
        }
        Err(_) => {
            return Err(IngestError::extraction(
                DocumentFormat::Pdf,
                "pdf parser aborted on malformed document",
            ));
        }
    };

    if text.trim().is_empty() {
        return Err(IngestError::extraction(
            DocumentFormat::Pdf,
            "no embedded text layer (scanned image?)",
        ));
    }
    Ok(text)
}

#[cfg(not(feature = "pdf"))]
pub(crate) fn extract_pdf(_bytes: &[u8]) -> Result<String, IngestError> {
    Err(IngestError::extraction(
        DocumentFormat::Pdf,
        "pdf support disabled at compile time",
    ))
}

fn looks_like_pdf(bytes: &[u8]) -> bool {
    // Some producers emit a few junk bytes before the header.
    bytes
        .windows(PDF_MAGIC.len())
        .take(1024)
        .any(|w| w == PDF_MAGIC)
}
