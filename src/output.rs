//! Result types returned by a conversion run.
//!
//! Everything here is `Serialize` so the CLI can emit a machine-readable
//! summary with `--json`, and callers can persist a run record next to the
//! Markdown file.

use crate::pipeline::format::DocumentFormat;
use crate::pipeline::verify::VerificationReport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One image written to the image store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// File name inside the images directory, e.g. `image_p2_1.png`.
    pub file_name: String,
    /// Reference as inserted into the Markdown, relative to the output dir
    /// (e.g. `images/image_p2_1.png`).
    pub reference: String,
    /// Absolute (or output-dir-joined) location on disk.
    pub path: PathBuf,
    /// Payload size in bytes.
    pub bytes: u64,
}

/// Which path produced the primary Markdown before post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionPath {
    /// The external CLI tool succeeded.
    External,
    /// A built-in format converter ran.
    Builtin,
}

/// Summary of a finished conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The Markdown file that was written.
    pub output_path: PathBuf,
    /// Format detected from the input extension.
    pub format: DocumentFormat,
    /// External tool or built-in converter.
    pub path: ConversionPath,
    /// Every image written during this run, in the order it was saved.
    pub images: Vec<ExtractedImage>,
    /// Whether the enhancement pass replaced the Markdown.
    pub enhanced: bool,
    /// Image-reference check, when verification is enabled.
    pub verification: Option<VerificationReport>,
    /// Wall-clock time for the whole run.
    pub duration_ms: u64,
}

/// Markdown text plus the images a converter wrote while producing it.
#[derive(Debug, Clone, Default)]
pub struct ConvertedDocument {
    pub markdown: String,
    pub images: Vec<ExtractedImage>,
}

impl ConvertedDocument {
    pub fn new(markdown: String, images: Vec<ExtractedImage>) -> Self {
        Self { markdown, images }
    }
}
