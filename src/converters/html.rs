//! HTML → Markdown.
//!
//! The document is parsed with `scraper`, so only real `<img>` elements count:
//! markup inside comments, `<script>` or attribute values is never mistaken
//! for a tag. Every image whose `src` is a remote URL or a base64 data URI is
//! saved to the image store and its `src` set to `images/image_{k}.{ext}`;
//! the document is then re-serialized. The result goes to the assistant,
//! falling back to `html2md` and finally to the raw HTML.

use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::output::{ConvertedDocument, ExtractedImage};
use crate::pipeline::images::{extension_for_subtype, ImageStore};
use crate::pipeline::llm::{format_with_assistant, CompletionService, SourceFormat};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

static RE_DATA_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^data:image/([a-z0-9.+-]+);base64,(.*)$").unwrap());

/// Convert an HTML file.
pub async fn convert(
    input: &Path,
    store: &ImageStore,
    config: &ConverterConfig,
) -> Result<ConvertedDocument, ConvertError> {
    let bytes = tokio::fs::read(input)
        .await
        .map_err(|e| ConvertError::ReadFailed {
            path: input.to_path_buf(),
            source: e,
        })?;
    let html = String::from_utf8_lossy(&bytes);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.download_timeout_secs))
        .build()
        .map_err(|e| ConvertError::Internal(format!("HTTP client: {e}")))?;

    let (rewritten, images) = rewrite_images(&html, store, &client).await;
    let markdown = html_to_markdown(&rewritten, config.completion()).await;
    Ok(ConvertedDocument::new(markdown, images))
}

/// Save every resolvable `<img>` source and point the element at the copy.
///
/// Elements whose source cannot be fetched or decoded keep their `src` and
/// do not consume an index. When nothing was saved the input is returned
/// untouched.
pub async fn rewrite_images(
    html: &str,
    store: &ImageStore,
    client: &reqwest::Client,
) -> (String, Vec<ExtractedImage>) {
    // The parsed tree is not `Send`, so it never lives across an await.
    let sources = image_sources(html);

    let mut images = Vec::new();
    let mut replacements: Vec<Option<String>> = Vec::with_capacity(sources.len());
    for src in &sources {
        match save_source(src, images.len(), store, client).await {
            Some(img) => {
                replacements.push(Some(img.reference.clone()));
                images.push(img);
            }
            None => replacements.push(None),
        }
    }

    if images.is_empty() {
        return (html.to_string(), images);
    }
    info!("Saved {} HTML image(s)", images.len());
    (set_sources(html, &replacements), images)
}

/// `src` of every `<img>` element, in document order.
fn image_sources(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&IMG_SELECTOR)
        .map(|img| img.value().attr("src").unwrap_or_default().to_string())
        .collect()
}

/// Re-parse `html`, set the `src` of the n-th `<img>` to `replacements[n]`
/// where present, and serialize the document.
fn set_sources(html: &str, replacements: &[Option<String>]) -> String {
    let mut document = Html::parse_document(html);
    let ids: Vec<_> = document.select(&IMG_SELECTOR).map(|img| img.id()).collect();

    for (id, new_src) in ids.into_iter().zip(replacements) {
        let Some(new_src) = new_src else {
            continue;
        };
        let Some(mut node) = document.tree.get_mut(id) else {
            continue;
        };
        if let Node::Element(element) = node.value() {
            for (name, value) in element.attrs.iter_mut() {
                if &*name.local == "src" {
                    *value = new_src.as_str().into();
                }
            }
        }
    }
    document.html()
}

/// Format through the assistant, then `html2md`, then the raw HTML.
pub async fn html_to_markdown(html: &str, service: Option<&dyn CompletionService>) -> String {
    if let Some(service) = service {
        if let Some(md) = format_with_assistant(service, html, SourceFormat::Html).await {
            return md;
        }
        info!("Assistant unavailable; using structural HTML conversion");
    }

    let md = html2md::parse_html(html);
    if md.trim().is_empty() {
        warn!("HTML conversion produced nothing; emitting raw HTML");
        html.to_string()
    } else {
        md
    }
}

async fn save_source(
    src: &str,
    k: usize,
    store: &ImageStore,
    client: &reqwest::Client,
) -> Option<ExtractedImage> {
    let src = src.trim();
    let lower = src.to_ascii_lowercase();

    let (bytes, ext) = if lower.starts_with("http://") || lower.starts_with("https://") {
        let bytes = download(src, client).await?;
        (bytes, extension_from_url(src))
    } else if let Some(caps) = RE_DATA_URI.captures(src) {
        let payload: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
        match STANDARD.decode(payload.as_bytes()) {
            Ok(bytes) => (bytes, extension_for_subtype(&caps[1])),
            Err(e) => {
                warn!("Skipping undecodable data URI image: {}", e);
                return None;
            }
        }
    } else {
        debug!("Leaving local image source as-is: {}", src);
        return None;
    };

    let name = format!("image_{k}.{ext}");
    match store.save(&name, &bytes) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!("Failed to save {}: {}", name, e);
            None
        }
    }
}

async fn download(url: &str, client: &reqwest::Client) -> Option<Vec<u8>> {
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!("Failed to fetch image {}: {}", url, e);
            return None;
        }
    };
    if !response.status().is_success() {
        warn!("Failed to fetch image {}: HTTP {}", url, response.status());
        return None;
    }
    match response.bytes().await {
        Ok(b) => Some(b.to_vec()),
        Err(e) => {
            warn!("Failed to read image body {}: {}", url, e);
            None
        }
    }
}

/// Extension from the last path segment: 1–5 ASCII alphanumerics, else `png`.
pub fn extension_from_url(url: &str) -> String {
    let path = reqwest::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or(url).to_string());

    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "png".to_string())
}
