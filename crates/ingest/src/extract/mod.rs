//! Per-format extractors. Each returns the raw document text; size limits and
//! logging live in [`crate::extract_text`].

mod doc;
mod docx;
mod pdf;
mod text;

pub(crate) use doc::extract_doc;
pub(crate) use docx::extract_docx;
pub(crate) use pdf::extract_pdf;
pub(crate) use text::decode_text;

#[cfg(test)]
pub(crate) use docx::tests::docx_with_body;
