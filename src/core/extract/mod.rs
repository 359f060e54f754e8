//! Plain-text extraction for uploaded documents.
//!
//! Supported inputs are selected by file extension only:
//!
//! - `.txt` - decoded as UTF-8 verbatim
//! - `.pdf` - every page's text followed by a newline, in page order
//! - `.docx` / `.doc` - every paragraph's text followed by a newline, in document order
//!
//! The PDF and Word parsers are optional Cargo features (`pdf`, `docx`). A build
//! without one of them still recognizes the extension but reports
//! [`ExtractError::MissingDependency`] instead of [`ExtractError::UnsupportedFormat`].
//!
//! # Example
//!
//! ```rust
//! use docspeak::core::extract::extract;
//!
//! let text = extract(b"Hello there", "txt").unwrap();
//! assert_eq!(text, "Hello there");
//! ```

mod docx;
mod pdf;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for a single extraction running on the blocking pool.
pub const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Content type used when an extension has no entry in the table.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors produced while turning document bytes into text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported format: .{0}")]
    UnsupportedFormat(String),

    #[error("missing parser dependency for .{format}: rebuild with the `{feature}` feature")]
    MissingDependency {
        format: &'static str,
        feature: &'static str,
    },

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Document formats accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Text,
    Pdf,
    Docx,
    Doc,
}

impl DocumentFormat {
    /// Every supported format, in the order the upload UI lists them.
    pub const ALL: [DocumentFormat; 4] = [Self::Text, Self::Pdf, Self::Docx, Self::Doc];

    /// Resolve a format from a file extension. Case-insensitive; a leading dot is ignored.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            _ => None,
        }
    }

    /// Canonical file extension, without the dot.
    #[inline]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
        }
    }

    /// MIME type an uploader must send for this format.
    #[inline]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Doc => "application/msword",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Map an extension to its upload content type, falling back to octet-stream.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    DocumentFormat::from_extension(extension)
        .map(|format| format.content_type())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

/// Extract plain text from `bytes`, dispatching on the file `extension`.
///
/// Unsupported extensions fail before any parsing happens.
pub fn extract(bytes: &[u8], extension: &str) -> Result<String, ExtractError> {
    let format = DocumentFormat::from_extension(extension).ok_or_else(|| {
        ExtractError::UnsupportedFormat(extension.trim_start_matches('.').to_ascii_lowercase())
    })?;
    extract_format(bytes, format)
}

/// Extract plain text from `bytes` already known to be `format`.
pub fn extract_format(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractError> {
    match format {
        DocumentFormat::Text => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| ExtractError::ExtractionFailed(format!("invalid UTF-8 text: {e}"))),
        DocumentFormat::Pdf => pdf::extract_pages(bytes).map(|pages| join_lines(&pages)),
        DocumentFormat::Docx | DocumentFormat::Doc => {
            docx::extract_paragraphs(bytes).map(|paragraphs| join_lines(&paragraphs))
        }
    }
}

/// Concatenate blocks, each followed by a newline.
pub(crate) fn join_lines<S: AsRef<str>>(blocks: &[S]) -> String {
    let capacity = blocks.iter().map(|b| b.as_ref().len() + 1).sum();
    let mut text = String::with_capacity(capacity);
    for block in blocks {
        text.push_str(block.as_ref());
        text.push('\n');
    }
    text
}
