//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline for one document:
//!
//! ```text
//! detect format ─▶ external tool? ─▶ built-in converter ─▶ write <stem>.md
//!      ─▶ base64 extraction ─▶ placeholder repair ─▶ enhancement ─▶ verify
//! ```
//!
//! Only input, format and output-directory problems are fatal. Everything
//! involving the completion service, the external tool, OCR or a single
//! image degrades to a fallback and is logged.

use crate::config::ConverterConfig;
use crate::converters::convert_builtin;
use crate::error::ConvertError;
use crate::output::{ConversionOutput, ConversionPath, ExtractedImage};
use crate::pipeline::external::run_external_tool;
use crate::pipeline::format::DocumentFormat;
use crate::pipeline::images::ImageStore;
use crate::pipeline::postprocess::{enhance, extract_base64_images, repair_placeholders};
use crate::pipeline::verify::verify_images;
use crate::progress::Stage;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Convert one document to `<output_dir>/<stem>.md`.
///
/// # Errors
/// Returns `Err(ConvertError)` only for fatal errors:
/// - input file not found or unreadable
/// - unsupported extension (checked before any other work)
/// - output directory cannot be created or written
/// - the document cannot be parsed at all, or pdfium cannot be loaded
pub async fn convert(
    input: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<ConversionOutput, ConvertError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    info!("Starting conversion: {}", input.display());

    // ── Step 1: Validate input ───────────────────────────────────────────
    match tokio::fs::metadata(input).await {
        Ok(meta) if meta.is_file() => {}
        _ => {
            return Err(ConvertError::FileNotFound {
                path: input.to_path_buf(),
            })
        }
    }
    let format = DocumentFormat::from_path(input)?;
    debug!("Detected format: {}", format);

    let stage = |s: Stage| {
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(s);
        }
    };
    let report_images = |images: &[ExtractedImage]| {
        if let Some(ref cb) = config.progress_callback {
            for img in images {
                cb.on_image_saved(&img.file_name);
            }
        }
    };
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(input, format);
    }

    // ── Step 2: Prepare output directories ───────────────────────────────
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| ConvertError::OutputDirUnavailable {
            path: config.output_dir.clone(),
            source: e,
        })?;
    let store = ImageStore::open(&config.output_dir, &config.images_subdir)?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    let output_path = config.output_dir.join(format!("{stem}.md"));

    // ── Step 3: Primary conversion ───────────────────────────────────────
    let mut images: Vec<ExtractedImage> = Vec::new();
    let mut external_ok = false;
    if let Some(ref tool) = config.external_tool {
        stage(Stage::ExternalTool);
        external_ok = run_external_tool(tool, input, &output_path).await;
    }

    let (mut markdown, path) = if external_ok {
        let text = tokio::fs::read_to_string(&output_path)
            .await
            .map_err(|e| ConvertError::ReadFailed {
                path: output_path.clone(),
                source: e,
            })?;
        (text, ConversionPath::External)
    } else {
        stage(Stage::Convert);
        let doc = convert_builtin(input, format, &store, config).await?;
        report_images(&doc.images);
        images.extend(doc.images);
        write_atomic(&output_path, &doc.markdown).await?;
        (doc.markdown, ConversionPath::Builtin)
    };
    info!(
        "Primary conversion via {:?}: {} chars, {} image(s)",
        path,
        markdown.len(),
        images.len()
    );

    // ── Step 4: Post-processing ──────────────────────────────────────────
    let before = markdown.clone();

    stage(Stage::ExtractBase64);
    let (extracted, found) = extract_base64_images(&markdown, &store);
    report_images(&found);
    images.extend(found);
    markdown = extracted;

    if !config.placeholder_images.is_empty() {
        stage(Stage::RepairPlaceholders);
        let (repaired, samples) =
            repair_placeholders(&markdown, &config.placeholder_images, &store);
        report_images(&samples);
        images.extend(samples);
        markdown = repaired;
    }

    let mut enhanced = false;
    if let (true, Some(service)) = (config.enhance, config.completion()) {
        stage(Stage::Enhance);
        if let Some(better) = enhance(
            &markdown,
            service,
            config.enhance_chunk_chars,
            config.enhance_max_chars,
        )
        .await
        {
            markdown = better;
            enhanced = true;
        }
    }

    if markdown != before {
        write_atomic(&output_path, &markdown).await?;
    }

    // ── Step 5: Verification ─────────────────────────────────────────────
    let verification = if config.verify_images {
        stage(Stage::Verify);
        Some(verify_images(&markdown, &config.output_dir, &stem))
    } else {
        None
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(&output_path);
    }

    let duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Conversion complete: {} ({} image(s), {}ms)",
        output_path.display(),
        images.len(),
        duration_ms
    );

    Ok(ConversionOutput {
        output_path,
        format,
        path,
        images,
        enhanced,
        verification,
        duration_ms,
    })
}

/// Convert and return only the path of the written Markdown file.
pub async fn convert_to_dir(
    input: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<PathBuf, ConvertError> {
    convert(input, config).await.map(|out| out.output_path)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    config: &ConverterConfig,
) -> Result<ConversionOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

/// Write through a temp file and rename, so readers never see half a file.
async fn write_atomic(path: &Path, content: &str) -> Result<(), ConvertError> {
    let write_err = |e| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, content).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::testing::Scripted;
    use crate::progress::ConversionProgressCallback;
    use std::sync::{Arc, Mutex};

    fn config(out: &Path) -> ConverterConfig {
        ConverterConfig::builder()
            .output_dir(out)
            .external_tool(None::<String>)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn missing_file_is_reported_first() {
        let tmp = tempfile::tempdir().unwrap();
        let err = convert(tmp.path().join("nope.xyz"), &config(tmp.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn unsupported_extension_does_no_work() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("slides.pptx");
        std::fs::write(&input, b"x").unwrap();
        let out = tmp.path().join("out");

        let err = convert(&input, &config(&out)).await.unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { ref extension } if extension == ".pptx"));
        assert!(!out.exists());
    }

    #[derive(Default)]
    struct Stages(Mutex<Vec<Stage>>);

    impl ConversionProgressCallback for Stages {
        fn on_stage(&self, stage: Stage) {
            self.0.lock().unwrap().push(stage);
        }
    }

    #[tokio::test]
    async fn text_file_runs_every_enabled_stage() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("notes.txt");
        std::fs::write(&input, "hello world").unwrap();
        let stages = Arc::new(Stages::default());
        let svc = Arc::new(Scripted::new(|_| Ok("```markdown\nHello world.\n```".into())));

        let cfg = ConverterConfig::builder()
            .output_dir(tmp.path().join("out"))
            .external_tool(None::<String>)
            .completion(svc.clone())
            .progress_callback(stages.clone())
            .build()
            .unwrap();
        let out = convert(&input, &cfg).await.unwrap();

        assert_eq!(out.path, ConversionPath::Builtin);
        assert!(out.enhanced);
        assert_eq!(std::fs::read_to_string(&out.output_path).unwrap(), "Hello world.");
        assert_eq!(
            *stages.0.lock().unwrap(),
            vec![Stage::Convert, Stage::ExtractBase64, Stage::Enhance, Stage::Verify]
        );
        assert!(tmp.path().join("out/notes_images.html").is_file());
        assert!(!tmp.path().join("out/notes.md.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stale_output_does_not_count_as_external_success() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("notes.txt");
        std::fs::write(&input, "fresh text").unwrap();
        let out_dir = tmp.path().join("out");
        std::fs::create_dir_all(&out_dir).unwrap();
        std::fs::write(out_dir.join("notes.md"), "STALE from an earlier run").unwrap();

        let cfg = ConverterConfig::builder()
            .output_dir(&out_dir)
            .external_tool(Some("true"))
            .build()
            .unwrap();
        let out = convert(&input, &cfg).await.unwrap();

        assert_eq!(out.path, ConversionPath::Builtin);
        assert_eq!(std::fs::read_to_string(&out.output_path).unwrap(), "fresh text");
    }
}
