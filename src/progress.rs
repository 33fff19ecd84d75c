//! Progress-callback trait for conversion stage events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a log file, or a terminal spinner without the
//! library knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use doc2md::{ConversionProgressCallback, ConverterConfig, Stage};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl ConversionProgressCallback for PrintStages {
//!     fn on_stage(&self, stage: Stage) {
//!         eprintln!("→ {}", stage);
//!     }
//! }
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(Arc::new(PrintStages))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::format::DocumentFormat;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExternalTool,
    Convert,
    ExtractBase64,
    RepairPlaceholders,
    Enhance,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::ExternalTool => "external tool",
            Stage::Convert => "converting",
            Stage::ExtractBase64 => "extracting inline images",
            Stage::RepairPlaceholders => "repairing placeholders",
            Stage::Enhance => "enhancing",
            Stage::Verify => "verifying images",
        };
        f.write_str(s)
    }
}

/// Called by the conversion pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after the format is known and before any work starts.
    fn on_conversion_start(&self, input: &Path, format: DocumentFormat) {
        let _ = (input, format);
    }

    /// Called when a stage begins. Skipped stages are not reported.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after each image lands in the image store.
    fn on_image_saved(&self, file_name: &str) {
        let _ = file_name;
    }

    /// Called once the Markdown file is final.
    fn on_conversion_complete(&self, output: &Path) {
        let _ = output;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<Stage>>,
        images: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_image_saved(&self, file_name: &str) {
            self.images.lock().unwrap().push(file_name.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(Path::new("a.pdf"), DocumentFormat::Pdf);
        cb.on_stage(Stage::Convert);
        cb.on_image_saved("image_p1_1.png");
        cb.on_conversion_complete(Path::new("out/a.md"));
    }

    #[test]
    fn recorder_receives_events_through_arc_dyn() {
        let rec = Arc::new(Recorder::default());
        let cb: ProgressCallback = rec.clone();
        cb.on_stage(Stage::Convert);
        cb.on_stage(Stage::Verify);
        cb.on_image_saved("a.png");

        assert_eq!(*rec.stages.lock().unwrap(), vec![Stage::Convert, Stage::Verify]);
        assert_eq!(*rec.images.lock().unwrap(), vec!["a.png".to_string()]);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Enhance.to_string(), "enhancing");
    }
}
