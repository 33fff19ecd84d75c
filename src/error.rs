//! Error types for the doc2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the conversion cannot proceed at all
//!   (unsupported extension, unreadable input, unwritable output directory).
//!   Returned as `Err(ConvertError)` from the top-level `convert*` functions.
//!
//! * [`CompletionError`] — **Non-fatal**: the completion service could not
//!   answer (network, credentials, quota). Every caller absorbs it into a
//!   documented fallback; it never escapes the pipeline.
//!
//! Failures on a single image are neither: they are logged and that image is
//! omitted from the output.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2md library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file extension matches none of the supported formats.
    #[error(
        "Unsupported file format: '{extension}'\n\
         Supported: .pdf, .docx, .doc, .xlsx, .xls, .html, .htm, .md, .markdown, .txt"
    )]
    UnsupportedFormat { extension: String },

    /// The input could not be read from disk.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document was read but its structure could not be parsed.
    #[error("Document '{path}' could not be parsed: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output directory (or its images subdirectory) could not be created.
    #[error("Output directory '{path}' is not usable: {source}")]
    OutputDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF conversion needs the pdfium shared library. Either:\n\
  • place libpdfium (.so / .dylib / .dll) next to the doc2md executable, or\n\
  • install it system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure of the completion service.
///
/// Never returned from the public conversion API; converters log it and
/// fall back (raw text, generic HTML converter, or skipping enhancement).
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport-level failure: DNS, TLS, connection reset, timeout.
    #[error("Completion request failed: {0}")]
    Network(String),

    /// Service rejected the credential (HTTP 401/403).
    #[error("Completion service rejected credentials (HTTP {status}): {detail}")]
    Auth { status: u16, detail: String },

    /// Rate limit or credit exhaustion (HTTP 402/429).
    #[error("Completion service quota exhausted (HTTP {status}): {detail}")]
    QuotaExceeded { status: u16, detail: String },

    /// Any other non-success status.
    #[error("Completion service error (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    /// Provider-level error from an `edgequake_llm` backend.
    #[error("LLM provider error: {0}")]
    Provider(String),

    /// Request succeeded but no usable text came back.
    #[error("Completion service returned an empty response")]
    EmptyResponse,
}

impl CompletionError {
    /// Classify a non-success HTTP status from the completion endpoint.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 | 403 => CompletionError::Auth { status, detail },
            402 | 429 => CompletionError::QuotaExceeded { status, detail },
            _ => CompletionError::Api { status, detail },
        }
    }
}
