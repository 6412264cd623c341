use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Document formats accepted for submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    /// Legacy Word 97-2003 binary document.
    Doc,
    Docx,
    Txt,
}

impl DocumentFormat {
    /// Detect the format from the declared file name.
    ///
    /// Only the extension is consulted, case-insensitively. Content sniffing is
    /// left to the individual extractors, which fail with `ExtractionFailure`
    /// when the bytes do not match the declared format.
    pub fn from_file_name(file_name: &str) -> Result<Self, IngestError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => Ok(DocumentFormat::Pdf),
            Some("doc") => Ok(DocumentFormat::Doc),
            Some("docx") => Ok(DocumentFormat::Docx),
            Some("txt") => Ok(DocumentFormat::Txt),
            _ => Err(IngestError::UnsupportedFormat {
                file_name: file_name.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Txt => "txt",
        }
    }

    /// MIME type reported back to clients.
    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Doc => "application/msword",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentFormat::Txt => "text/plain",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_supported_extensions_case_insensitively() {
        assert_eq!(
            DocumentFormat::from_file_name("essay.PDF").unwrap(),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_file_name("essay.Docx").unwrap(),
            DocumentFormat::Docx
        );
        assert_eq!(
            DocumentFormat::from_file_name("old.doc").unwrap(),
            DocumentFormat::Doc
        );
        assert_eq!(
            DocumentFormat::from_file_name("notes.final.txt").unwrap(),
            DocumentFormat::Txt
        );
    }

    #[test]
    fn rejects_images_and_missing_extensions() {
        for name in ["scan.png", "README", "archive.tar.gz", ""] {
            let err = DocumentFormat::from_file_name(name).unwrap_err();
            assert!(
                matches!(err, IngestError::UnsupportedFormat { ref file_name } if file_name == name),
                "unexpected error for {name:?}: {err:?}"
            );
        }
    }
}
