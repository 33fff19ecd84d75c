//! Image-path verification.
//!
//! Every `![alt](target)` in the final Markdown is resolved against the
//! output directory and checked on disk. The result is a
//! [`VerificationReport`] plus a standalone `<stem>_images.html` page that
//! embeds each referenced image, for checking extraction by eye.
//!
//! Verification never rewrites the Markdown: a missing image is reported,
//! not repaired.

use crate::pipeline::images::{split_link_target, RE_IMAGE_REF};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome for one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Found,
    Missing,
    /// `http(s)://` or `data:` target; not checked.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCheck {
    pub alt: String,
    pub target: String,
    pub status: ImageStatus,
    /// Location checked on disk, for local targets.
    pub resolved: Option<PathBuf>,
}

/// Result of checking every image reference in one Markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub total: usize,
    pub found: usize,
    pub missing: usize,
    pub remote: usize,
    pub checks: Vec<ImageCheck>,
    /// The inspection page, when it could be written.
    pub html_page: Option<PathBuf>,
}

impl VerificationReport {
    pub fn missing_targets(&self) -> impl Iterator<Item = &str> {
        self.checks
            .iter()
            .filter(|c| c.status == ImageStatus::Missing)
            .map(|c| c.target.as_str())
    }

    pub fn all_found(&self) -> bool {
        self.missing == 0
    }
}

/// Check every image reference in `markdown` against `output_dir`.
pub fn check_images(markdown: &str, output_dir: &Path) -> VerificationReport {
    let mut report = VerificationReport::default();

    for caps in RE_IMAGE_REF.captures_iter(markdown) {
        let alt = caps[1].to_string();
        let target = split_link_target(&caps[2]).0.to_string();

        let (status, resolved) = if is_remote(&target) {
            (ImageStatus::Remote, None)
        } else {
            let path = output_dir.join(&target);
            if path.is_file() {
                (ImageStatus::Found, Some(path))
            } else {
                (ImageStatus::Missing, Some(path))
            }
        };

        match status {
            ImageStatus::Found => report.found += 1,
            ImageStatus::Missing => {
                warn!("Missing image reference: {}", target);
                report.missing += 1;
            }
            ImageStatus::Remote => report.remote += 1,
        }
        report.checks.push(ImageCheck {
            alt,
            target,
            status,
            resolved,
        });
    }

    report.total = report.checks.len();
    report
}

/// Check references and write `<output_dir>/<stem>_images.html`.
///
/// Failing to write the page is logged; the report is still returned.
pub fn verify_images(markdown: &str, output_dir: &Path, stem: &str) -> VerificationReport {
    let mut report = check_images(markdown, output_dir);
    info!(
        "Image check: {} total, {} found, {} missing, {} remote",
        report.total, report.found, report.missing, report.remote
    );

    let page = output_dir.join(format!("{stem}_images.html"));
    match std::fs::write(&page, render_html(&report, stem)) {
        Ok(()) => report.html_page = Some(page),
        Err(e) => warn!("Could not write {}: {}", page.display(), e),
    }
    report
}

/// Standalone inspection page: one `<figure>` per reference.
pub fn render_html(report: &VerificationReport, title: &str) -> String {
    let title = escape_html(title);
    let mut html = String::with_capacity(512 + report.checks.len() * 160);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>Images: {title}</title>");
    html.push_str(
        "<style>\nbody { font-family: sans-serif; margin: 2em; }\n\
figure { border: 1px solid #ccc; padding: 1em; margin: 1em 0; }\n\
img { max-width: 100%; }\n.missing { color: #b00; font-weight: bold; }\n</style>\n",
    );
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>Images referenced by {title}</h1>");
    let _ = writeln!(
        html,
        "<p>{} total, {} found, {} missing, {} remote</p>",
        report.total, report.found, report.missing, report.remote
    );

    for check in &report.checks {
        let src = escape_html(&check.target);
        let marker = match check.status {
            ImageStatus::Found => "found".to_string(),
            ImageStatus::Missing => "<span class=\"missing\">MISSING</span>".to_string(),
            ImageStatus::Remote => "remote".to_string(),
        };
        let _ = writeln!(
            html,
            "<figure>\n<img src=\"{src}\" alt=\"{}\">\n<figcaption>{src} ({marker})</figcaption>\n</figure>",
            escape_html(&check.alt)
        );
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn is_remote(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_missing_and_remote_are_counted() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("images")).unwrap();
        std::fs::write(tmp.path().join("images/a.png"), b"x").unwrap();

        let md = "![a](images/a.png)\n![b](images/b.png)\n![c](https://x.test/c.png)\n\
![d](data:image/png;base64,AAAA)";
        let report = check_images(md, tmp.path());

        assert_eq!(report.total, 4);
        assert_eq!(report.found, 1);
        assert_eq!(report.missing, 1);
        assert_eq!(report.remote, 2);
        assert_eq!(report.missing_targets().collect::<Vec<_>>(), vec!["images/b.png"]);
        assert!(!report.all_found());
    }

    #[test]
    fn titles_and_angle_brackets_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("images")).unwrap();
        std::fs::write(tmp.path().join("images/a.png"), b"x").unwrap();
        std::fs::write(tmp.path().join("images/a b.png"), b"x").unwrap();

        let md = "![t](images/a.png \"Figure 1\") ![s](<images/a b.png>)";
        let report = check_images(md, tmp.path());
        assert_eq!(report.found, 2);
        assert_eq!(report.checks[1].target, "images/a b.png");
    }

    #[test]
    fn verify_writes_inspection_page() {
        let tmp = tempfile::tempdir().unwrap();
        let report = verify_images("![x](images/missing.png)", tmp.path(), "report");

        let page = tmp.path().join("report_images.html");
        assert_eq!(report.html_page.as_deref(), Some(page.as_path()));
        let html = std::fs::read_to_string(page).unwrap();
        assert_eq!(html.matches("<figure>").count(), 1);
        assert!(html.contains("MISSING"));
    }

    #[test]
    fn page_escapes_targets() {
        let report = check_images("![<b>](images/a&b.png)", Path::new("/nonexistent"));
        let html = render_html(&report, "t");
        assert!(html.contains("images/a&amp;b.png"));
        assert!(html.contains("alt=\"&lt;b&gt;\""));
    }

    #[test]
    fn no_references_yields_empty_report() {
        let report = check_images("# Just text", Path::new("."));
        assert_eq!(report.total, 0);
        assert!(report.all_found());
    }
}
