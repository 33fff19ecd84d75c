//! Format detection from the file extension.
//!
//! Detection is purely lexical: the lowercase extension decides the
//! converter. Content sniffing is left to the converters themselves, which
//! report a [`ConvertError::CorruptDocument`] when the bytes do not match.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Every input format with a built-in converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Xlsx,
    Html,
    Markdown,
    Text,
}

impl DocumentFormat {
    /// Resolve the format of `path` from its extension.
    ///
    /// # Errors
    /// [`ConvertError::UnsupportedFormat`] for any extension outside the
    /// supported set, including a missing extension.
    pub fn from_path(path: &Path) -> Result<Self, ConvertError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" | "doc" => Ok(DocumentFormat::Docx),
            "xlsx" | "xls" => Ok(DocumentFormat::Xlsx),
            "html" | "htm" => Ok(DocumentFormat::Html),
            "md" | "markdown" => Ok(DocumentFormat::Markdown),
            "txt" => Ok(DocumentFormat::Text),
            _ => Err(ConvertError::UnsupportedFormat {
                extension: if ext.is_empty() {
                    "<none>".to_string()
                } else {
                    format!(".{ext}")
                },
            }),
        }
    }

    /// Short lowercase label used in logs and prompts.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Xlsx => "xlsx",
            DocumentFormat::Html => "html",
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::Text => "text",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_every_supported_extension() {
        let cases = [
            ("a.pdf", DocumentFormat::Pdf),
            ("a.PDF", DocumentFormat::Pdf),
            ("a.docx", DocumentFormat::Docx),
            ("a.doc", DocumentFormat::Docx),
            ("a.xlsx", DocumentFormat::Xlsx),
            ("a.xls", DocumentFormat::Xlsx),
            ("a.html", DocumentFormat::Html),
            ("a.htm", DocumentFormat::Html),
            ("a.md", DocumentFormat::Markdown),
            ("a.markdown", DocumentFormat::Markdown),
            ("notes.txt", DocumentFormat::Text),
        ];
        for (name, expected) in cases {
            assert_eq!(DocumentFormat::from_path(Path::new(name)).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = DocumentFormat::from_path(Path::new("slides.pptx")).unwrap_err();
        match err {
            ConvertError::UnsupportedFormat { extension } => assert_eq!(extension, ".pptx"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_missing_extension() {
        assert!(matches!(
            DocumentFormat::from_path(Path::new("README")),
            Err(ConvertError::UnsupportedFormat { .. })
        ));
    }
}
