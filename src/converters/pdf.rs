//! PDF → Markdown via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and does heavy CPU work. All pdfium calls happen in one
//! `spawn_blocking` task; OCR subprocesses then run on the async side over
//! the pages that task rendered into a scoped temp directory.
//!
//! ## Per page
//!
//! 1. Save every embedded image object as `image_p{page}_{n}.png`.
//! 2. When none could be saved, render the whole page as `page_{page}.png`
//!    so the page still has a visual.
//! 3. Take the text layer; when it is shorter than `ocr_min_chars`, render
//!    the page for OCR.
//!
//! The joined page text goes through the assistant, then an `## Images`
//! section lists every saved image once.

use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::output::{ConvertedDocument, ExtractedImage};
use crate::pipeline::external::run_ocr;
use crate::pipeline::images::ImageStore;
use crate::pipeline::llm::{format_with_assistant, CompletionService, SourceFormat};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Emitted instead of an empty file when a PDF has no text at all.
pub const EMPTY_DOCUMENT_MARKER: &str = "<!-- no extractable text -->";

/// What the blocking pdfium pass produced for one page.
#[derive(Debug)]
struct PageExtract {
    text: String,
    /// Rendered PNG awaiting OCR, inside the caller's temp dir.
    ocr_image: Option<PathBuf>,
}

#[derive(Debug)]
struct PdfExtraction {
    pages: Vec<PageExtract>,
    images: Vec<ExtractedImage>,
}

/// Convert a PDF file, writing images through `store`.
pub async fn convert(
    input: &Path,
    store: &ImageStore,
    config: &ConverterConfig,
) -> Result<ConvertedDocument, ConvertError> {
    // Lives until every OCR run below has finished.
    let ocr_dir = match config.ocr_command {
        Some(_) => match TempDir::new() {
            Ok(dir) => Some(dir),
            Err(e) => {
                warn!("OCR disabled: cannot create temp dir: {}", e);
                None
            }
        },
        None => None,
    };

    let path = input.to_path_buf();
    let store = store.clone();
    let max_pixels = config.render_max_pixels;
    let ocr_min_chars = config.ocr_min_chars;
    let ocr_path = ocr_dir.as_ref().map(|d| d.path().to_path_buf());

    let extraction = tokio::task::spawn_blocking(move || {
        extract_blocking(&path, &store, max_pixels, ocr_min_chars, ocr_path.as_deref())
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("PDF task panicked: {}", e)))??;

    let mut texts = Vec::with_capacity(extraction.pages.len());
    for (idx, page) in extraction.pages.into_iter().enumerate() {
        let mut text = page.text;
        if let (Some(png), Some(cmd)) = (page.ocr_image, config.ocr_command.as_deref()) {
            match run_ocr(cmd, &png).await {
                Some(ocr) => {
                    debug!("Page {}: OCR produced {} chars", idx + 1, ocr.len());
                    text = ocr;
                }
                None => debug!("Page {}: keeping text layer", idx + 1),
            }
        }
        texts.push(text);
    }
    drop(ocr_dir);

    let markdown = assemble_markdown(&texts, &extraction.images, config.completion()).await;
    Ok(ConvertedDocument::new(markdown, extraction.images))
}

/// Join page texts, format them through the assistant, and list images.
///
/// Without a service, or when it fails, the body is the raw joined text.
pub async fn assemble_markdown(
    page_texts: &[String],
    images: &[ExtractedImage],
    service: Option<&dyn CompletionService>,
) -> String {
    let raw = page_texts.join("\n\n");

    let mut body = match service {
        Some(service) if !raw.trim().is_empty() => {
            format_with_assistant(service, &raw, SourceFormat::Pdf)
                .await
                .unwrap_or_else(|| {
                    info!("Assistant unavailable; using raw PDF text");
                    raw.clone()
                })
        }
        _ => raw,
    };

    if !images.is_empty() {
        if !body.trim().is_empty() {
            body.push_str("\n\n");
        }
        body.push_str("## Images\n\n");
        let refs: Vec<String> = images
            .iter()
            .map(|img| format!("![Image]({})", img.reference))
            .collect();
        body.push_str(&refs.join("\n"));
        body.push('\n');
    }

    if body.trim().is_empty() {
        EMPTY_DOCUMENT_MARKER.to_string()
    } else {
        body
    }
}

/// Bind pdfium from beside the executable, falling back to the system library.
fn bind_pdfium() -> Result<Pdfium, ConvertError> {
    let local = std::env::current_exe()
        .ok()
        .and_then(|exe| {
            exe.parent()
                .map(|dir| Pdfium::pdfium_platform_library_name_at_path(dir))
        });

    let bindings = match local.map(|lib| Pdfium::bind_to_library(lib)) {
        Some(Ok(bindings)) => bindings,
        _ => Pdfium::bind_to_system_library()
            .map_err(|e| ConvertError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };
    Ok(Pdfium::new(bindings))
}

fn extract_blocking(
    pdf_path: &Path,
    store: &ImageStore,
    max_pixels: u32,
    ocr_min_chars: usize,
    ocr_dir: Option<&Path>,
) -> Result<PdfExtraction, ConvertError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ConvertError::CorruptDocument {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut extraction = PdfExtraction {
        pages: Vec::with_capacity(pages.len() as usize),
        images: Vec::new(),
    };

    for (idx, page) in pages.iter().enumerate() {
        let number = idx + 1;
        let mut rendered: Option<Vec<u8>> = None;

        // ── Embedded images ──
        let mut saved_on_page = 0;
        let mut seen = 0;
        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };
            seen += 1;
            let name = format!("image_p{number}_{seen}.png");
            let png = image_object
                .get_raw_image()
                .map_err(|e| format!("{:?}", e))
                .and_then(|img| encode_png(&img));
            match png.and_then(|bytes| store.save(&name, &bytes).map_err(|e| e.to_string())) {
                Ok(img) => {
                    saved_on_page += 1;
                    extraction.images.push(img);
                }
                Err(e) => warn!("Page {}: skipping image {}: {}", number, seen, e),
            }
        }

        // ── Render fallback ──
        if saved_on_page == 0 {
            match render_png(&page, max_pixels, &mut rendered)
                .and_then(|bytes| {
                    store
                        .save(&format!("page_{number}.png"), bytes)
                        .map_err(|e| e.to_string())
                }) {
                Ok(img) => extraction.images.push(img),
                Err(e) => warn!("Page {}: render fallback failed: {}", number, e),
            }
        }

        // ── Text layer ──
        let text = match page.text() {
            Ok(t) => t.all(),
            Err(e) => {
                warn!("Page {}: no text layer: {:?}", number, e);
                String::new()
            }
        };

        let ocr_image = match ocr_dir {
            Some(dir) if text.trim().chars().count() < ocr_min_chars => {
                let target = dir.join(format!("page_{number}.png"));
                match render_png(&page, max_pixels, &mut rendered)
                    .and_then(|bytes| std::fs::write(&target, bytes).map_err(|e| e.to_string()))
                {
                    Ok(()) => Some(target),
                    Err(e) => {
                        warn!("Page {}: cannot render for OCR: {}", number, e);
                        None
                    }
                }
            }
            _ => None,
        };

        debug!(
            "Page {}: {} chars, {} image(s), ocr={}",
            number,
            text.len(),
            saved_on_page,
            ocr_image.is_some()
        );
        extraction.pages.push(PageExtract { text, ocr_image });
    }

    Ok(extraction)
}

/// Render resolution before capping, in pixels per PDF point (150 dpi).
const RENDER_SCALE: f32 = 150.0 / 72.0;

/// Pixel size for a page at 150 dpi, longest edge capped at `max_pixels`.
/// Small pages are never scaled up to the cap.
fn render_size(width_pt: f32, height_pt: f32, max_pixels: u32) -> (i32, i32) {
    let width = (width_pt * RENDER_SCALE).max(1.0);
    let height = (height_pt * RENDER_SCALE).max(1.0);
    let longest = width.max(height);
    let factor = if longest > max_pixels as f32 {
        max_pixels as f32 / longest
    } else {
        1.0
    };
    (
        ((width * factor).round() as i32).max(1),
        ((height * factor).round() as i32).max(1),
    )
}

/// Render `page` once and cache the PNG for the render fallback and OCR.
fn render_png<'c>(
    page: &PdfPage,
    max_pixels: u32,
    cache: &'c mut Option<Vec<u8>>,
) -> Result<&'c [u8], String> {
    if cache.is_none() {
        let (width, height) = render_size(page.width().value, page.height().value, max_pixels);
        let config = PdfRenderConfig::new().set_target_size(width, height);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| format!("{:?}", e))?;
        *cache = Some(encode_png(&bitmap.as_image())?);
    }
    Ok(cache.as_deref().unwrap_or_default())
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(buf)
}
