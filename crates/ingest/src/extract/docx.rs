//! DOCX (Office Open XML) text extraction.
//!
//! Only `word/document.xml` is read. The body is scanned for `<w:t>` runs;
//! paragraph ends and `<w:br/>` become newlines, `<w:tab/>` becomes a space.
//! Headers, footers and comments are ignored.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::IngestError;
use crate::format::DocumentFormat;

const DOCUMENT_PART: &str = "word/document.xml";

/// `part_limit` bounds the inflated size of the document part. The declared
/// size is checked first, then the stream is cut one byte past the limit so
/// a lying header cannot inflate further.
pub(crate) fn extract_docx(bytes: &[u8], part_limit: Option<usize>) -> Result<String, IngestError> {
    let fail = |reason: String| IngestError::extraction(DocumentFormat::Docx, reason);

    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| fail(format!("failed to read docx container: {e}")))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| fail(format!("missing {DOCUMENT_PART}: {e}")))?;

    let too_large = |size: u64, limit: usize| {
        IngestError::PayloadTooLarge(format!(
            "{DOCUMENT_PART} inflates to {size} bytes, limit is {limit}"
        ))
    };
    if let Some(limit) = part_limit {
        if part.size() > limit as u64 {
            return Err(too_large(part.size(), limit));
        }
    }

    let cap = part_limit.map_or(u64::MAX, |limit| limit as u64 + 1);
    let mut raw = Vec::new();
    part.by_ref()
        .take(cap)
        .read_to_end(&mut raw)
        .map_err(|e| fail(format!("failed to read {DOCUMENT_PART}: {e}")))?;
    if let Some(limit) = part_limit {
        if raw.len() > limit {
            return Err(too_large(raw.len() as u64, limit));
        }
    }

    let xml = String::from_utf8(raw)
        .map_err(|e| fail(format!("{DOCUMENT_PART} is not UTF-8: {e}")))?;
    Ok(document_xml_text(&xml))
}

/// Pull visible text out of a WordprocessingML body.
fn document_xml_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() / 4);
    let mut in_text_run = false;
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        if in_text_run {
            push_unescaped(&mut out, &rest[..open]);
        }
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default();

        match (name, tag.starts_with('/')) {
            ("w:t", false) => in_text_run = !self_closing,
            ("w:t", true) => in_text_run = false,
            ("w:p", true) | ("w:br", _) | ("w:cr", _) => out.push('\n'),
            ("w:tab", _) => out.push(' '),
            _ => {}
        }
    }

    out
}

fn push_unescaped(out: &mut String, text: &str) {
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let Some(semi) = rest[amp..].find(';') else {
            out.push_str(&rest[amp..]);
            return;
        };
        let entity = &rest[amp + 1..amp + semi];
        match decode_entity(entity) {
            Some(ch) => out.push(ch),
            None => out.push_str(&rest[amp..=amp + semi]),
        }
        rest = &rest[amp + semi + 1..];
    }
    out.push_str(rest);
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
