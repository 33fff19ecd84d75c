//! # doc2md
//!
//! Convert PDF, DOCX, XLSX, HTML, Markdown and plain-text documents into one
//! normalized Markdown file, with embedded images extracted next to it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Detect    format from the extension (.pdf .docx .xlsx .html .md .txt …)
//!  ├─ 2. External  optional external converter (markitdown) as a first attempt
//!  ├─ 3. Convert   built-in converter: pdfium / zip+quick-xml / calamine / html2md
//!  ├─ 4. Base64    inline data-URI images → images/image_<hash>.<ext>
//!  ├─ 5. Repair    placeholder tokens → sample images
//!  ├─ 6. Enhance   optional LLM formatting pass, chunked
//!  └─ 7. Verify    check every image reference, write <stem>_images.html
//! ```
//!
//! The text-formatting assistant is optional. Without one, or when it
//! fails, every step that would use it falls back to a deterministic result:
//! raw PDF text, `html2md` output, or the unenhanced Markdown.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2md::{convert, ConverterConfig, OpenRouterClient, OpenRouterConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenRouterClient::new(OpenRouterConfig::new("sk-or-…"))?;
//!     let config = ConverterConfig::builder()
//!         .output_dir("markdown_output")
//!         .completion(Arc::new(client))
//!         .build()?;
//!
//!     let output = convert("report.docx", &config).await?;
//!     println!("{} ({} images)", output.output_path.display(), output.images.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2md = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! PDF conversion needs a pdfium shared library, either next to the
//! executable or installed system-wide. The external converter and the OCR
//! engine (`tesseract`) are optional; when missing they are skipped.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod converters;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder, OpenRouterConfig};
pub use convert::{convert, convert_sync, convert_to_dir};
pub use error::{CompletionError, ConvertError};
pub use output::{ConversionOutput, ConversionPath, ConvertedDocument, ExtractedImage};
pub use pipeline::format::DocumentFormat;
pub use pipeline::llm::{CompletionService, OpenRouterClient, ProviderCompletion};
pub use pipeline::verify::{ImageCheck, ImageStatus, VerificationReport};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
