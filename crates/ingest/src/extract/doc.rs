//! Legacy Word 97-2003 (`.doc`) text recovery.
//!
//! The binary format stores the document stream inside an OLE2 compound file.
//! Rather than walking the FIB and piece table we recover printable runs:
//! UTF-16LE runs first (unicode pieces), falling back to 8-bit runs
//! (compressed CP1252 pieces). Tables and field codes come out mangled; body
//! prose survives.

use crate::error::IngestError;
use crate::format::DocumentFormat;

const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Shortest run that counts as prose rather than structure noise.
const MIN_UTF16_RUN: usize = 8;
const MIN_ANSI_RUN: usize = 16;

/// UTF-16 runs are limited to Latin, Greek and Cyrillic code points so that
/// pairs of 8-bit characters are not misread as CJK text.
const UTF16_SCRIPT_LIMIT: u16 = 0x0530;

pub(crate) fn extract_doc(bytes: &[u8]) -> Result<String, IngestError> {
    if !bytes.starts_with(OLE2_MAGIC) {
        return Err(IngestError::extraction(
            DocumentFormat::Doc,
            "missing OLE2 compound file signature",
        ));
    }

    let body = &bytes[OLE2_MAGIC.len()..];
    let mut text = utf16_runs(body);
    if text.trim().is_empty() {
        text = ansi_runs(body);
    }

    if text.trim().is_empty() {
        return Err(IngestError::extraction(
            DocumentFormat::Doc,
            "no recoverable text runs",
        ));
    }
    Ok(text)
}

fn is_prose_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch.is_whitespace() || ch.is_ascii_punctuation()
}

fn utf16_runs(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut run = String::new();

    for pair in bytes.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        match char::from_u32(u32::from(unit))
            .filter(|c| unit < UTF16_SCRIPT_LIMIT && (is_prose_char(*c) || *c == '\r'))
        {
            Some('\r') => run.push('\n'),
            Some(ch) => run.push(ch),
            None => flush_run(&mut out, &mut run, MIN_UTF16_RUN),
        }
    }
    flush_run(&mut out, &mut run, MIN_UTF16_RUN);
    out
}

fn ansi_runs(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut run = String::new();

    for &b in bytes {
        let ch = char::from(b);
        if b.is_ascii() && (is_prose_char(ch) || b == b'\r') {
            run.push(if b == b'\r' { '\n' } else { ch });
        } else {
            flush_run(&mut out, &mut run, MIN_ANSI_RUN);
        }
    }
    flush_run(&mut out, &mut run, MIN_ANSI_RUN);
    out
}

fn flush_run(out: &mut String, run: &mut String, min_len: usize) {
    let letters = run.chars().filter(|c| c.is_alphabetic()).count();
    if run.chars().count() >= min_len && letters * 2 >= min_len {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(run.trim());
    }
    run.clear();
}
