//! Built-in format converters.
//!
//! Each converter turns one source file into Markdown plus the images it
//! wrote to the [`ImageStore`](crate::pipeline::images::ImageStore). They
//! run when no external tool is configured or the external tool was not
//! suitable.

pub mod docx;
pub mod html;
pub mod pdf;
pub mod text;
pub mod xlsx;

use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::output::ConvertedDocument;
use crate::pipeline::format::DocumentFormat;
use crate::pipeline::images::ImageStore;
use std::path::Path;

/// Dispatch to the converter for `format`.
pub async fn convert_builtin(
    input: &Path,
    format: DocumentFormat,
    store: &ImageStore,
    config: &ConverterConfig,
) -> Result<ConvertedDocument, ConvertError> {
    match format {
        DocumentFormat::Pdf => pdf::convert(input, store, config).await,
        DocumentFormat::Docx => docx::convert(input, store).await,
        DocumentFormat::Xlsx => xlsx::convert(input).await,
        DocumentFormat::Html => html::convert(input, store, config).await,
        DocumentFormat::Markdown | DocumentFormat::Text => {
            text::convert(input, format, store).await
        }
    }
}
