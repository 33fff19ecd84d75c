//! Plain text and Markdown pass-through.
//!
//! `.txt` is copied verbatim. For Markdown, every `![alt](target)` whose
//! target is a local file is copied into the image store and the reference
//! rewritten to point at the copy.

use crate::error::ConvertError;
use crate::output::{ConvertedDocument, ExtractedImage};
use crate::pipeline::format::DocumentFormat;
use crate::pipeline::images::{link_destination, split_link_target, ImageStore, RE_IMAGE_REF};
use regex::Captures;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Read a `.txt`/`.md` file and relocate local Markdown images.
pub async fn convert(
    input: &Path,
    format: DocumentFormat,
    store: &ImageStore,
) -> Result<ConvertedDocument, ConvertError> {
    let bytes = tokio::fs::read(input)
        .await
        .map_err(|e| ConvertError::ReadFailed {
            path: input.to_path_buf(),
            source: e,
        })?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    if format != DocumentFormat::Markdown {
        return Ok(ConvertedDocument::new(content, Vec::new()));
    }

    let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let (markdown, images) = relocate_images(&content, base_dir, store);
    Ok(ConvertedDocument::new(markdown, images))
}

/// Copy local image targets into `store` and rewrite their references.
///
/// URLs, data URIs, missing files and files already inside the store are
/// left as they are. A target used twice is copied once.
pub fn relocate_images(
    markdown: &str,
    base_dir: &Path,
    store: &ImageStore,
) -> (String, Vec<ExtractedImage>) {
    let mut images: Vec<ExtractedImage> = Vec::new();
    let mut copied: Vec<(PathBuf, String)> = Vec::new();

    let out = RE_IMAGE_REF.replace_all(markdown, |caps: &Captures| {
        let original = caps[0].to_string();
        let (target, title) = split_link_target(&caps[2]);
        let Some(source) = resolve_local(target, base_dir) else {
            return original;
        };
        if store.contains(&source) {
            return original;
        }

        let reference = match copied.iter().find(|(p, _)| *p == source) {
            Some((_, r)) => r.clone(),
            None => {
                let name = source
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                match store.copy_in(&source, &name) {
                    Ok(img) => {
                        let r = img.reference.clone();
                        copied.push((source.clone(), r.clone()));
                        images.push(img);
                        r
                    }
                    Err(e) => {
                        warn!("Failed to copy image {}: {}", source.display(), e);
                        return original;
                    }
                }
            }
        };
        format!("![{}]({}{})", &caps[1], link_destination(&reference), title)
    });

    debug!("Relocated {} local image(s)", images.len());
    (out.into_owned(), images)
}

/// Resolve a link target to an existing local file: source dir, then cwd.
fn resolve_local(target: &str, base_dir: &Path) -> Option<PathBuf> {
    let lower = target.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:") {
        return None;
    }
    if target.is_empty() {
        return None;
    }
    let path = Path::new(target);
    if path.is_absolute() {
        return path.is_file().then(|| path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));
    }
    [base_dir.join(path), path.to_path_buf()]
        .into_iter()
        .find(|p| p.is_file())
        .map(|p| p.canonicalize().unwrap_or(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_images_are_copied_and_rewritten() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("src");
        std::fs::create_dir_all(src_dir.join("fig")).unwrap();
        std::fs::write(src_dir.join("fig/chart.png"), b"png").unwrap();
        let store = ImageStore::open(&tmp.path().join("out"), "images").unwrap();

        let md = "# Doc\n\n![Chart](fig/chart.png \"Q1\")\n![Again](fig/chart.png)\n![Web](https://x.test/a.png)\n![Gone](missing.png)";
        let (out, images) = relocate_images(md, &src_dir, &store);

        assert_eq!(images.len(), 1);
        assert!(out.contains("![Chart](images/chart.png \"Q1\")"));
        assert!(out.contains("![Again](images/chart.png)"));
        assert!(out.contains("![Web](https://x.test/a.png)"));
        assert!(out.contains("![Gone](missing.png)"));
        assert!(tmp.path().join("out/images/chart.png").is_file());
    }

    #[test]
    fn angle_bracket_targets_with_spaces_are_relocated() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("src");
        std::fs::create_dir_all(&src_dir).unwrap();
        std::fs::write(src_dir.join("my fig.png"), b"png").unwrap();
        let out_dir = tmp.path().join("out");
        let store = ImageStore::open(&out_dir, "images").unwrap();

        let md = "![x](<my fig.png> \"Caption\")";
        let (out, images) = relocate_images(md, &src_dir, &store);

        assert_eq!(images.len(), 1);
        assert_eq!(out, "![x](<images/my fig.png> \"Caption\")");
        let report = crate::pipeline::verify::check_images(&out, &out_dir);
        assert_eq!((report.found, report.missing), (1, 0));
    }

    #[test]
    fn images_already_in_store_are_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::open(tmp.path(), "images").unwrap();
        std::fs::write(store.images_dir().join("a.png"), b"x").unwrap();

        let md = "![a](images/a.png)";
        let (out, images) = relocate_images(md, tmp.path(), &store);
        assert_eq!(out, md);
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("notes.txt");
        std::fs::write(&input, "line one\n![x](y.png)\n").unwrap();
        let store = ImageStore::open(&tmp.path().join("out"), "images").unwrap();

        let doc = convert(&input, DocumentFormat::Text, &store).await.unwrap();
        assert_eq!(doc.markdown, "line one\n![x](y.png)\n");
        assert!(doc.images.is_empty());
    }
}
