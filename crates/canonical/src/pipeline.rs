use std::borrow::Cow;

use unicode_categories::UnicodeCategories;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::CanonicalizeConfig;
use crate::document::CanonicalizedDocument;
use crate::error::CanonicalError;
use crate::hash::hash_canonical_bytes;
use crate::stopwords::is_stop_word;
use crate::token::Token;

/// Main entry point. Takes extracted submission text and config and returns a
/// canonicalized document.
///
/// Whitespace-only input is valid and yields a document without tokens.
pub fn canonicalize(
    doc_id: impl Into<String>,
    input: &str,
    cfg: &CanonicalizeConfig,
) -> Result<CanonicalizedDocument, CanonicalError> {
    cfg.validate()?;

    let doc_id: String = doc_id.into();
    let trimmed = doc_id.trim();
    if trimmed.is_empty() {
        return Err(CanonicalError::MissingDocId);
    }
    let doc_id = if doc_id.len() == trimmed.len() {
        doc_id
    } else {
        trimmed.to_string()
    };

    // NFKC first: it can change character boundaries.
    let normalized: Cow<str> = if cfg.normalize_unicode {
        Cow::Owned(input.nfkc().collect::<String>())
    } else {
        Cow::Borrowed(input)
    };

    let mut builder = TokenBuilder::with_capacity(normalized.len());
    for grapheme in normalized.graphemes(true) {
        if cfg.lowercase {
            // Lowercasing can expand one char into several.
            for ch in grapheme.to_lowercase().chars() {
                builder.push(ch, is_delimiter(ch, cfg));
            }
        } else {
            for ch in grapheme.chars() {
                builder.push(ch, is_delimiter(ch, cfg));
            }
        }
    }
    let (canonical_text, mut tokens) = builder.finish();

    if !cfg.retain_stop_words {
        tokens.retain(|t| !is_stop_word(&t.text));
    }

    let sha256_hex = hash_canonical_bytes(cfg.version, canonical_text.as_bytes());

    Ok(CanonicalizedDocument {
        doc_id,
        canonical_text,
        tokens,
        sha256_hex,
        canonical_version: cfg.version,
        config: cfg.clone(),
    })
}

fn is_delimiter(ch: char, cfg: &CanonicalizeConfig) -> bool {
    ch.is_whitespace() || (cfg.strip_punctuation && (ch.is_punctuation() || ch.is_symbol()))
}

/// Single-pass builder that collapses delimiter runs into one space and
/// records each token's byte span in the output text.
struct TokenBuilder {
    text: String,
    tokens: Vec<Token>,
    pending_space: bool,
    token_start: Option<usize>,
}

impl TokenBuilder {
    fn with_capacity(len: usize) -> Self {
        Self {
            text: String::with_capacity(len),
            tokens: Vec::with_capacity((len / 4).saturating_add(1)),
            pending_space: false,
            token_start: None,
        }
    }

    fn push(&mut self, ch: char, delimiter: bool) {
        if delimiter {
            self.close_token();
            // No leading space: only a delimiter after text is remembered.
            if !self.text.is_empty() {
                self.pending_space = true;
            }
            return;
        }

        if self.pending_space {
            self.text.push(' ');
            self.pending_space = false;
        }
        if self.token_start.is_none() {
            self.token_start = Some(self.text.len());
        }
        self.text.push(ch);
    }

    fn close_token(&mut self) {
        if let Some(start) = self.token_start.take() {
            let end = self.text.len();
            if start < end {
                self.tokens.push(Token {
                    text: self.text[start..end].to_string(),
                    start,
                    end,
                });
            }
        }
    }

    fn finish(mut self) -> (String, Vec<Token>) {
        self.close_token();
        (self.text, self.tokens)
    }
}
