//! Image store: the `images/` side directory of one conversion run.
//!
//! Every converter writes binary image payloads through [`ImageStore`] so
//! that naming, directory layout and the relative reference format stay in
//! one place. The reference inserted into Markdown is always
//! `<subdir>/<file_name>` with forward slashes, so it resolves against the
//! output directory on every platform.
//!
//! The store performs plain blocking writes: payloads are small and the
//! PDF/DOCX converters call it from inside `spawn_blocking`.

use crate::error::ConvertError;
use crate::output::ExtractedImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle to the images directory under an output directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    output_dir: PathBuf,
    images_dir: PathBuf,
    subdir: String,
}

impl ImageStore {
    /// Create `output_dir/subdir` (and its parents) if absent.
    ///
    /// # Errors
    /// [`ConvertError::OutputDirUnavailable`] when the directory cannot be
    /// created; this is one of the few fatal conditions in the pipeline.
    pub fn open(output_dir: &Path, subdir: &str) -> Result<Self, ConvertError> {
        let images_dir = output_dir.join(subdir);
        fs::create_dir_all(&images_dir).map_err(|e| ConvertError::OutputDirUnavailable {
            path: images_dir.clone(),
            source: e,
        })?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            images_dir,
            subdir: subdir.to_string(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Markdown reference for a file name in this store.
    pub fn reference(&self, file_name: &str) -> String {
        format!("{}/{}", self.subdir, file_name)
    }

    /// Resolve a reference found in Markdown against the output directory.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        self.output_dir.join(reference)
    }

    /// Write `bytes` as `file_name`, overwriting any existing file.
    pub fn save(&self, file_name: &str, bytes: &[u8]) -> io::Result<ExtractedImage> {
        let file_name = sanitize_file_name(file_name)?;
        let path = self.images_dir.join(&file_name);
        fs::write(&path, bytes)?;
        debug!("Saved image {} ({} bytes)", path.display(), bytes.len());
        Ok(ExtractedImage {
            reference: self.reference(&file_name),
            file_name,
            path,
            bytes: bytes.len() as u64,
        })
    }

    /// Copy an existing file into the store under `file_name`.
    pub fn copy_in(&self, source: &Path, file_name: &str) -> io::Result<ExtractedImage> {
        let file_name = sanitize_file_name(file_name)?;
        let path = self.images_dir.join(&file_name);
        let bytes = fs::copy(source, &path)?;
        debug!("Copied image {} → {}", source.display(), path.display());
        Ok(ExtractedImage {
            reference: self.reference(&file_name),
            file_name,
            path,
            bytes,
        })
    }

    /// True when `path` already lives inside this store.
    pub fn contains(&self, path: &Path) -> bool {
        match (path.canonicalize(), self.images_dir.canonicalize()) {
            (Ok(p), Ok(dir)) => p.starts_with(dir),
            _ => false,
        }
    }
}

/// File extension for a `data:image/<subtype>` MIME subtype.
///
/// `jpeg` becomes `jpg` and `svg+xml` becomes `svg`; anything else is kept
/// lowercase as-is.
pub fn extension_for_subtype(subtype: &str) -> String {
    match subtype.to_ascii_lowercase().as_str() {
        "jpeg" | "pjpeg" => "jpg".to_string(),
        "svg+xml" => "svg".to_string(),
        "x-icon" | "vnd.microsoft.icon" => "ico".to_string(),
        other => other.to_string(),
    }
}

// ── Markdown image references ────────────────────────────────────────────────

/// `![alt](destination)`. The destination may be `<…>`-wrapped (and then
/// contain spaces or `)`) and may carry a title; see [`split_link_target`].
pub static RE_IMAGE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\((<[^>\n]*>[^)]*|[^)]*)\)").unwrap());

/// Split a link destination into its target and the remainder (a title).
///
/// `<my fig.png> "t"` gives `("my fig.png", " \"t\"")`, `a.png "t"` gives
/// `("a.png", " \"t\"")`.
pub fn split_link_target(raw: &str) -> (&str, &str) {
    let raw = raw.trim_start();
    if let Some(inner) = raw.strip_prefix('<') {
        if let Some(end) = inner.find('>') {
            return (&inner[..end], &inner[end + 1..]);
        }
    }
    match raw.find(char::is_whitespace) {
        Some(pos) => (&raw[..pos], &raw[pos..]),
        None => (raw, ""),
    }
}

/// Write `target` as a link destination, wrapping it in `<…>` when a bare
/// destination could not hold it.
pub fn link_destination(target: &str) -> String {
    if target.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{target}>")
    } else {
        target.to_string()
    }
}

/// Reduce a proposed name to its final path component.
fn sanitize_file_name(name: &str) -> io::Result<String> {
    Path::new(name)
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid image file name '{name}'"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_targets_with_titles_and_angle_brackets() {
        assert_eq!(split_link_target("a.png"), ("a.png", ""));
        assert_eq!(split_link_target(r#"a.png "Q1""#), ("a.png", r#" "Q1""#));
        assert_eq!(split_link_target("<my fig.png>"), ("my fig.png", ""));
        assert_eq!(split_link_target(r#"<my (1).png> 'x'"#), ("my (1).png", " 'x'"));

        let caps = RE_IMAGE_REF.captures("see ![x](<my (1).png>) here").unwrap();
        assert_eq!(&caps[2], "<my (1).png>");

        assert_eq!(link_destination("images/a.png"), "images/a.png");
        assert_eq!(link_destination("images/my fig.png"), "<images/my fig.png>");
    }

    #[test]
    fn open_creates_images_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested/out");
        let store = ImageStore::open(&out, "images").unwrap();
        assert!(store.images_dir().is_dir());
        assert_eq!(store.images_dir(), out.join("images"));
    }

    #[test]
    fn saved_reference_resolves_to_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::open(tmp.path(), "images").unwrap();
        let img = store.save("image_p1_1.png", b"\x89PNG fake").unwrap();

        assert_eq!(img.reference, "images/image_p1_1.png");
        assert_eq!(img.bytes, 9);
        assert!(tmp.path().join(&img.reference).is_file());
        assert!(store.resolve(&img.reference).is_file());
    }

    #[test]
    fn save_strips_directory_components() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::open(tmp.path(), "images").unwrap();
        let img = store.save("../../escape.png", b"x").unwrap();
        assert_eq!(img.file_name, "escape.png");
        assert!(store.images_dir().join("escape.png").is_file());
    }

    #[test]
    fn subtype_extensions() {
        assert_eq!(extension_for_subtype("jpeg"), "jpg");
        assert_eq!(extension_for_subtype("SVG+XML"), "svg");
        assert_eq!(extension_for_subtype("png"), "png");
        assert_eq!(extension_for_subtype("webp"), "webp");
    }

    #[test]
    fn copy_in_and_contains() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("figure.jpg");
        std::fs::write(&src, b"jpegdata").unwrap();

        let store = ImageStore::open(&tmp.path().join("out"), "images").unwrap();
        assert!(!store.contains(&src));

        let img = store.copy_in(&src, "figure.jpg").unwrap();
        assert_eq!(img.bytes, 8);
        assert!(store.contains(&img.path));
    }
}
