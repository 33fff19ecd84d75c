//! Post-processing passes applied to every conversion result.
//!
//! Whichever path produced the primary Markdown (external tool or built-in
//! converter), the orchestrator runs the same passes over it:
//!
//! 1. [`extract_base64_images`] moves inline `data:` images into the image
//!    store, so the Markdown file stays small and diffable.
//! 2. [`repair_placeholders`] swaps the literal markers some upstream tools
//!    emit for unresolved images with configured sample images.
//! 3. [`enhance`] resubmits the Markdown, window by window, to the
//!    text-formatting assistant.
//!
//! Image-path verification lives in [`super::verify`] because it produces a
//! report instead of new Markdown.

use crate::output::ExtractedImage;
use crate::pipeline::images::{extension_for_subtype, ImageStore};
use crate::pipeline::llm::{complete_or_none, CompletionService};
use crate::prompts::{enhance_prompt, ENHANCE_SYSTEM_PROMPT};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ── Base64 extraction ───────────────────────────────────────────────────────

static RE_DATA_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(data:image/([A-Za-z0-9.+-]+);base64,([^)]*)\)").unwrap()
});

/// Move inline base64 images into the image store.
///
/// Each payload is saved as `image_{h}.{ext}` where `h` is the first 16 hex
/// digits of the SHA-256 of the (whitespace-stripped) payload, so identical
/// images share one file. Payloads that fail to decode are logged and left
/// in place.
pub fn extract_base64_images(
    markdown: &str,
    store: &ImageStore,
) -> (String, Vec<ExtractedImage>) {
    let mut saved: HashMap<String, String> = HashMap::new();
    let mut images = Vec::new();

    let out = RE_DATA_IMAGE.replace_all(markdown, |caps: &Captures| {
        let alt = &caps[1];
        let ext = extension_for_subtype(&caps[2]);
        let payload: String = caps[3].chars().filter(|c| !c.is_whitespace()).collect();

        let name = format!("image_{}.{}", &sha256_hex(payload.as_bytes())[..16], ext);
        if let Some(reference) = saved.get(&name) {
            return format!("![{alt}]({reference})");
        }

        let bytes = match STANDARD.decode(payload.as_bytes()) {
            Ok(b) => b,
            Err(e) => {
                warn!("Skipping undecodable inline image: {}", e);
                return caps[0].to_string();
            }
        };
        match store.save(&name, &bytes) {
            Ok(img) => {
                let reference = img.reference.clone();
                saved.insert(name, reference.clone());
                images.push(img);
                format!("![{alt}]({reference})")
            }
            Err(e) => {
                warn!("Failed to save inline image {}: {}", name, e);
                caps[0].to_string()
            }
        }
    });

    if !images.is_empty() {
        info!("Extracted {} inline base64 image(s)", images.len());
    }
    (out.into_owned(), images)
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ── Placeholder repair ──────────────────────────────────────────────────────

/// Literal markers upstream converters leave where an image could not be
/// resolved.
pub const PLACEHOLDER_TOKENS: [&str; 4] = [
    "<!-- image -->",
    "![](image_placeholder)",
    "![Image](image_placeholder)",
    "[image]",
];

// Real links and images are matched as a whole so `[image]` inside
// `![image](x.png)` or `[image](page.html)` is never taken for a token.
static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!-- image -->|!?\[[^\]]*\]\([^)]*\)|\[image\]").unwrap());

/// Replace placeholder tokens with references to sample images.
///
/// Occurrences are replaced in document order, cycling through `samples`.
/// Each sample is copied into the store once; samples that cannot be copied
/// drop out of the rotation. With no usable samples, or no
/// tokens, the content comes back unchanged, so the pass is idempotent.
pub fn repair_placeholders(
    markdown: &str,
    samples: &[PathBuf],
    store: &ImageStore,
) -> (String, Vec<ExtractedImage>) {
    if samples.is_empty() || !contains_placeholder(markdown) {
        return (markdown.to_string(), Vec::new());
    }

    let mut images: Vec<ExtractedImage> = Vec::new();
    for sample in samples {
        match copy_sample(sample, store) {
            Ok(img) => images.push(img),
            Err(e) => warn!("Placeholder sample {} unusable: {}", sample.display(), e),
        }
    }
    if images.is_empty() {
        return (markdown.to_string(), images);
    }

    let mut next = 0usize;
    let out = RE_PLACEHOLDER.replace_all(markdown, |caps: &Captures| {
        let m = &caps[0];
        if !is_placeholder(m) {
            return m.to_string();
        }
        let img = &images[next % images.len()];
        next += 1;
        format!("![Image]({})", img.reference)
    });

    debug!("Repaired {} placeholder(s)", next);
    (out.into_owned(), images)
}

fn contains_placeholder(markdown: &str) -> bool {
    RE_PLACEHOLDER
        .find_iter(markdown)
        .any(|m| is_placeholder(m.as_str()))
}

fn is_placeholder(s: &str) -> bool {
    PLACEHOLDER_TOKENS.iter().any(|t| *t == s)
}

fn copy_sample(sample: &Path, store: &ImageStore) -> std::io::Result<ExtractedImage> {
    let name = sample
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "placeholder.png".to_string());
    store.copy_in(sample, &name)
}

// ── Enhancement pass ────────────────────────────────────────────────────────

/// Resubmit `markdown` to the assistant in fixed-size windows.
///
/// Returns `None` (keep the input) when the content is longer than
/// `max_chars`, or when any window fails. Otherwise the window replies are
/// joined with `\n` and stripped of a wrapping code fence.
pub async fn enhance(
    markdown: &str,
    service: &dyn CompletionService,
    chunk_chars: usize,
    max_chars: usize,
) -> Option<String> {
    let total = markdown.chars().count();
    if total > max_chars {
        info!(
            "Skipping enhancement: {} chars exceeds the {} char limit",
            total, max_chars
        );
        return None;
    }
    if markdown.trim().is_empty() {
        return None;
    }

    let chunks = split_chars(markdown, chunk_chars);
    info!("Enhancing markdown in {} chunk(s)", chunks.len());

    let mut replies = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        match complete_or_none(service, ENHANCE_SYSTEM_PROMPT, &enhance_prompt(chunk)).await {
            Some(reply) => replies.push(strip_code_fence(&reply)),
            None => {
                warn!(
                    "Enhancement chunk {}/{} failed; keeping unenhanced markdown",
                    i + 1,
                    chunks.len()
                );
                return None;
            }
        }
    }

    Some(strip_code_fence(&replies.join("\n")))
}

/// Split `s` into windows of at most `size` characters.
pub fn split_chars(s: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut out = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(size)
            .map_or(rest.len(), |(idx, _)| idx);
        let (head, tail) = rest.split_at(end);
        out.push(head);
        rest = tail;
    }
    out
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

/// Remove a code fence wrapping the whole reply.
///
/// Only a fence that opens on the first line and closes on the last is
/// removed; fenced blocks inside the document are left alone.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    match RE_OUTER_FENCE.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}
