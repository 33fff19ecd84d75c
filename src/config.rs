//! Configuration types for document-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConverterConfig`], built
//! via its [`ConverterConfigBuilder`]. Working directories, the completion
//! service and its credentials are all explicit fields: nothing deeper in
//! the pipeline reads environment variables or command-line arguments.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::ConvertError;
use crate::pipeline::llm::CompletionService;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a conversion run.
///
/// Built via [`ConverterConfig::builder()`] or using
/// [`ConverterConfig::default()`].
///
/// # Example
/// ```rust
/// use doc2md::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .output_dir("out")
///     .enhance(false)
///     .external_tool(None::<String>)
///     .build()
///     .unwrap();
/// assert_eq!(config.images_subdir, "images");
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Directory receiving `<stem>.md` and the images subdirectory.
    /// Default: `markdown_output`.
    pub output_dir: PathBuf,

    /// Name of the image store under `output_dir`. Default: `images`.
    pub images_subdir: String,

    /// Text-formatting assistant. `None` means every assistant call takes
    /// its fallback path immediately.
    pub completion: Option<Arc<dyn CompletionService>>,

    /// Run the final enhancement pass over the Markdown. Default: true.
    ///
    /// Has no effect when `completion` is `None`.
    pub enhance: bool,

    /// Window size in characters for one enhancement request. Default: 8000.
    pub enhance_chunk_chars: usize,

    /// Documents longer than this skip enhancement entirely. Default: 100 000.
    ///
    /// A 100k-char document is already 13 requests; beyond that the pass
    /// costs more than it saves and response drift across windows grows.
    pub enhance_max_chars: usize,

    /// PDF pages whose text layer is shorter than this get OCR. Default: 100.
    pub ocr_min_chars: usize,

    /// OCR executable, invoked as `<cmd> <image.png> stdout`.
    /// Default: `tesseract`. `None` disables OCR.
    pub ocr_command: Option<String>,

    /// Longest edge in pixels for rendered PDF pages. Default: 2000.
    pub render_max_pixels: u32,

    /// External converter tried before the built-in converters, invoked as
    /// `<tool> <input> -o <output.md>`. Default: `markitdown`.
    pub external_tool: Option<String>,

    /// Sample images substituted for placeholder tokens. Default: empty.
    pub placeholder_images: Vec<PathBuf>,

    /// Check every image reference and write the HTML inspection page.
    /// Default: true.
    pub verify_images: bool,

    /// Timeout for fetching remote `<img>` sources. Default: 30 s.
    pub download_timeout_secs: u64,

    /// Optional progress callback. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("markdown_output"),
            images_subdir: "images".to_string(),
            completion: None,
            enhance: true,
            enhance_chunk_chars: 8000,
            enhance_max_chars: 100_000,
            ocr_min_chars: 100,
            ocr_command: Some("tesseract".to_string()),
            render_max_pixels: 2000,
            external_tool: Some("markitdown".to_string()),
            placeholder_images: Vec::new(),
            verify_images: true,
            download_timeout_secs: 30,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("output_dir", &self.output_dir)
            .field("images_subdir", &self.images_subdir)
            .field(
                "completion",
                &self.completion.as_ref().map(|c| c.name().to_string()),
            )
            .field("enhance", &self.enhance)
            .field("enhance_chunk_chars", &self.enhance_chunk_chars)
            .field("enhance_max_chars", &self.enhance_max_chars)
            .field("ocr_min_chars", &self.ocr_min_chars)
            .field("ocr_command", &self.ocr_command)
            .field("render_max_pixels", &self.render_max_pixels)
            .field("external_tool", &self.external_tool)
            .field("placeholder_images", &self.placeholder_images)
            .field("verify_images", &self.verify_images)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// The assistant, if one is configured.
    pub fn completion(&self) -> Option<&dyn CompletionService> {
        self.completion.as_deref()
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn images_subdir(mut self, name: impl Into<String>) -> Self {
        self.config.images_subdir = name.into();
        self
    }

    pub fn completion(mut self, service: Arc<dyn CompletionService>) -> Self {
        self.config.completion = Some(service);
        self
    }

    pub fn enhance(mut self, v: bool) -> Self {
        self.config.enhance = v;
        self
    }

    pub fn enhance_chunk_chars(mut self, n: usize) -> Self {
        self.config.enhance_chunk_chars = n;
        self
    }

    pub fn enhance_max_chars(mut self, n: usize) -> Self {
        self.config.enhance_max_chars = n;
        self
    }

    pub fn ocr_min_chars(mut self, n: usize) -> Self {
        self.config.ocr_min_chars = n;
        self
    }

    pub fn ocr_command(mut self, cmd: Option<impl Into<String>>) -> Self {
        self.config.ocr_command = cmd.map(Into::into);
        self
    }

    pub fn render_max_pixels(mut self, px: u32) -> Self {
        self.config.render_max_pixels = px;
        self
    }

    pub fn external_tool(mut self, tool: Option<impl Into<String>>) -> Self {
        self.config.external_tool = tool.map(Into::into);
        self
    }

    pub fn placeholder_images(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.placeholder_images = paths;
        self
    }

    pub fn verify_images(mut self, v: bool) -> Self {
        self.config.verify_images = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;
        if c.output_dir.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        if c.images_subdir.is_empty() || c.images_subdir.contains(['/', '\\']) {
            return Err(ConvertError::InvalidConfig(format!(
                "images subdirectory must be a single path component, got '{}'",
                c.images_subdir
            )));
        }
        if c.enhance_chunk_chars == 0 {
            return Err(ConvertError::InvalidConfig(
                "enhance chunk size must be ≥ 1".into(),
            ));
        }
        if c.enhance_max_chars < c.enhance_chunk_chars {
            return Err(ConvertError::InvalidConfig(format!(
                "enhance_max_chars ({}) must be ≥ enhance_chunk_chars ({})",
                c.enhance_max_chars, c.enhance_chunk_chars
            )));
        }
        if c.render_max_pixels < 100 {
            return Err(ConvertError::InvalidConfig(format!(
                "render_max_pixels must be ≥ 100, got {}",
                c.render_max_pixels
            )));
        }
        Ok(self.config)
    }
}

/// Connection settings for the OpenRouter chat-completions endpoint.
#[derive(Clone)]
pub struct OpenRouterConfig {
    /// Bearer credential. Never printed by `Debug`.
    pub api_key: String,
    /// Default: `https://openrouter.ai/api/v1`.
    pub base_url: String,
    /// Default: `openai/gpt-4o`.
    pub model: String,
    /// Sent as `HTTP-Referer` to attribute requests to the calling site.
    pub site_url: String,
    /// Sent as `X-Title`.
    pub site_name: String,
    /// Default: 0.1. Low temperature keeps the assistant faithful to the input.
    pub temperature: f32,
    /// Default: 4096.
    pub max_tokens: usize,
    /// Per-request timeout. Default: 120 s.
    pub timeout_secs: u64,
}

impl OpenRouterConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://openrouter.ai/api/v1";
    pub const DEFAULT_MODEL: &'static str = "openai/gpt-4o";

    /// Defaults for everything except the credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            site_url: "https://example.com".to_string(),
            site_name: "Document Converter".to_string(),
            temperature: 0.1,
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

impl fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("site_url", &self.site_url)
            .field("site_name", &self.site_name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
