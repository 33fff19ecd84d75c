//! CLI binary for doc2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConverterConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use doc2md::{
    convert, CompletionService, ConversionOutput, ConversionProgressCallback, ConverterConfig,
    DocumentFormat, OpenRouterClient, OpenRouterConfig, ProgressCallback, ProviderCompletion,
    Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner showing the current stage plus a
/// log line per saved image.
struct CliProgressCallback {
    bar: ProgressBar,
    images: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            images: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, input: &Path, format: DocumentFormat) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {} ({})", input.display(), format))
        ));
        self.bar.set_prefix("Converting");
    }

    fn on_stage(&self, stage: Stage) {
        self.bar.set_message(stage.to_string());
    }

    fn on_image_saved(&self, file_name: &str) {
        self.images.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  {} {}", green("✓"), dim(file_name)));
    }

    fn on_conversion_complete(&self, output: &Path) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(&output.display().to_string()),
            dim(&format!("{} image(s)", self.images.load(Ordering::SeqCst)))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert with the OpenRouter assistant (key from OPENROUTER_API_KEY)
  doc2md report.pdf

  # Choose the output directory and model
  doc2md -o out --model anthropic/claude-3.5-sonnet slides.docx

  # Use an edgequake-llm provider instead of OpenRouter
  doc2md --provider openai --model gpt-4.1-mini page.html

  # Built-in converters only, no enhancement pass
  doc2md --no-external --no-enhance --api-key sk-or-... book.xlsx

  # Substitute sample images for placeholder tokens
  doc2md --placeholder-image sample1.png --placeholder-image sample2.png notes.md

  # JSON summary (ConversionOutput) on stdout
  doc2md --json report.pdf > run.json

SUPPORTED FORMATS:
  .pdf  .docx .doc  .xlsx .xls  .html .htm  .md .markdown  .txt

OUTPUT:
  <output-dir>/<stem>.md            the converted Markdown
  <output-dir>/images/              extracted and rendered images
  <output-dir>/<stem>_images.html   image inspection page (unless --no-verify)

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY      OpenRouter API key
  DOC2MD_SITE_URL         Sent as HTTP-Referer to OpenRouter
  DOC2MD_SITE_NAME        Sent as X-Title to OpenRouter
  RUST_LOG                Override the log filter (e.g. doc2md=debug)

RUNTIME DEPENDENCIES:
  libpdfium     next to the executable or installed system-wide (PDF only)
  markitdown    optional external converter, tried first unless --no-external
  tesseract     optional OCR for pages without a usable text layer
"#;

/// Convert documents to Markdown with extracted images.
#[derive(Parser, Debug)]
#[command(
    name = "doc2md",
    version,
    about = "Convert PDF, DOCX, XLSX, HTML and Markdown documents to Markdown",
    long_about = "Convert PDF, DOCX, XLSX, HTML, Markdown and text documents into a single \
normalized Markdown file. Embedded images are extracted into an images/ directory, and an \
optional LLM pass (OpenRouter or any edgequake-llm provider) cleans up the structure.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document to convert.
    input: PathBuf,

    /// OpenRouter API key. Required unless --provider is given.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Site URL sent to OpenRouter as HTTP-Referer.
    #[arg(long, env = "DOC2MD_SITE_URL", default_value = "https://example.com")]
    site_url: String,

    /// Site name sent to OpenRouter as X-Title.
    #[arg(long, env = "DOC2MD_SITE_NAME", default_value = "Document Converter")]
    site_name: String,

    /// Model ID (OpenRouter default: openai/gpt-4o).
    #[arg(long, env = "DOC2MD_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider (openai, anthropic, gemini, ollama, …) instead of OpenRouter.
    #[arg(long, env = "DOC2MD_PROVIDER")]
    provider: Option<String>,

    /// Output directory for the Markdown file and images.
    #[arg(short, long, env = "DOC2MD_OUTPUT_DIR", default_value = "markdown_output")]
    output_dir: PathBuf,

    /// Skip the final LLM enhancement pass.
    #[arg(long)]
    no_enhance: bool,

    /// Do not try the external converter first.
    #[arg(long)]
    no_external: bool,

    /// External converter program, invoked as `<prog> <input> -o <output.md>`.
    #[arg(long, value_name = "PROG", default_value = "markitdown")]
    external_tool: String,

    /// Skip image verification and the HTML inspection page.
    #[arg(long)]
    no_verify: bool,

    /// Sample image substituted for placeholder tokens (repeatable).
    #[arg(long = "placeholder-image", value_name = "PATH")]
    placeholder_images: Vec<PathBuf>,

    /// OCR program for pages without a text layer; "none" disables OCR.
    #[arg(long, default_value = "tesseract")]
    ocr_command: String,

    /// Print the ConversionOutput as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers INFO-level feedback, so only errors are logged
    // while it is visible.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &config)
        .await
        .with_context(|| format!("Conversion of {} failed", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        println!("{}", output.output_path.display());
        if !cli.quiet {
            print_summary(&output);
        }
    }

    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConverterConfig> {
    let completion = build_completion(cli)?;

    let mut builder = ConverterConfig::builder()
        .output_dir(&cli.output_dir)
        .completion(completion)
        .enhance(!cli.no_enhance)
        .verify_images(!cli.no_verify)
        .placeholder_images(cli.placeholder_images.clone())
        .external_tool((!cli.no_external).then(|| cli.external_tool.clone()))
        .ocr_command((!cli.ocr_command.eq_ignore_ascii_case("none")).then(|| cli.ocr_command.clone()));

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn build_completion(cli: &Cli) -> Result<Arc<dyn CompletionService>> {
    if let Some(ref provider) = cli.provider {
        let model = cli.model.as_deref().unwrap_or_default();
        let service = ProviderCompletion::from_name(provider, model)
            .with_context(|| format!("Failed to initialise provider '{provider}'"))?;
        return Ok(Arc::new(service));
    }

    let Some(ref key) = cli.api_key else {
        bail!("An API key is required: pass --api-key or set OPENROUTER_API_KEY (or use --provider)");
    };
    let mut or_config = OpenRouterConfig::new(key.clone());
    or_config.site_url = cli.site_url.clone();
    or_config.site_name = cli.site_name.clone();
    if let Some(ref model) = cli.model {
        or_config.model = model.clone();
    }
    let client = OpenRouterClient::new(or_config).context("Failed to build OpenRouter client")?;
    Ok(Arc::new(client))
}

fn print_summary(output: &ConversionOutput) {
    eprintln!(
        "   {} via {:?}  {} image(s)  {}{}ms",
        output.format,
        output.path,
        output.images.len(),
        if output.enhanced { "enhanced  " } else { "" },
        output.duration_ms,
    );
    if let Some(ref report) = output.verification {
        if report.missing > 0 {
            eprintln!(
                "   {} {} of {} image reference(s) missing:",
                yellow("⚠"),
                report.missing,
                report.total
            );
            for target in report.missing_targets() {
                eprintln!("     {}", dim(target));
            }
        }
        if let Some(ref page) = report.html_page {
            eprintln!("   {} {}", dim("inspect:"), page.display());
        }
    }
}
