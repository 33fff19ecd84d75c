//! Subprocess collaborators: the external converter and the OCR engine.
//!
//! Neither is required. A program that is not installed, exits non-zero, or
//! produces nothing is "not suitable" and the caller moves on to its own
//! fallback; nothing here returns an error.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Run `<program> <input> -o <scratch>` and, when it produced a usable
/// Markdown file, move that file to `output`.
///
/// Success requires a zero exit status *and* a non-empty file at the scratch
/// path. The scratch path lives in a fresh temp dir beside `output`, so a
/// file left at `output` by an earlier run is never mistaken for new output.
pub async fn run_external_tool(program: &str, input: &Path, output: &Path) -> bool {
    debug!("Trying external converter: {} {}", program, input.display());

    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let scratch_dir = match tempfile::Builder::new()
        .prefix(".doc2md-external-")
        .tempdir_in(parent)
    {
        Ok(dir) => dir,
        Err(e) => {
            info!("Skipping external converter: no scratch dir in {}: {}", parent.display(), e);
            return false;
        }
    };
    let scratch = scratch_dir
        .path()
        .join(output.file_name().unwrap_or_else(|| OsStr::new("output.md")));

    let result = Command::new(program)
        .arg(input)
        .arg("-o")
        .arg(&scratch)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let out = match result {
        Ok(out) => out,
        Err(e) => {
            debug!("External converter '{}' unavailable: {}", program, e);
            return false;
        }
    };

    if !out.status.success() {
        info!(
            "External converter '{}' exited with {}: {}",
            program,
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        );
        return false;
    }

    match tokio::fs::metadata(&scratch).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {}
        _ => {
            info!("External converter '{}' produced no output", program);
            return false;
        }
    }

    match tokio::fs::rename(&scratch, output).await {
        Ok(()) => {
            info!("External converter '{}' succeeded", program);
            true
        }
        Err(e) => {
            info!(
                "Cannot move external output to {}: {}",
                output.display(),
                e
            );
            false
        }
    }
}

/// Run `<program> <image> stdout` and return the recognised text.
///
/// Returns `None` when the program cannot be spawned, fails, or prints only
/// whitespace.
pub async fn run_ocr(program: &str, image: &Path) -> Option<String> {
    let result = Command::new(program)
        .arg(image)
        .arg("stdout")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if text.is_empty() {
                debug!("OCR produced no text for {}", image.display());
                None
            } else {
                Some(text)
            }
        }
        Ok(out) => {
            info!("OCR '{}' exited with {}", program, out.status);
            None
        }
        Err(e) => {
            info!("OCR '{}' unavailable: {}", program, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_not_suitable() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.pdf");
        std::fs::write(&input, b"%PDF").unwrap();
        let ok = run_external_tool(
            "doc2md-definitely-not-installed",
            &input,
            &tmp.path().join("out.md"),
        )
        .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn missing_ocr_program_yields_none() {
        let tmp = tempfile::tempdir().unwrap();
        let png = tmp.path().join("p.png");
        std::fs::write(&png, b"png").unwrap();
        assert!(run_ocr("doc2md-no-such-ocr", &png).await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_without_output_is_not_suitable() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.txt");
        std::fs::write(&input, b"hi").unwrap();
        // `true` ignores its arguments and writes nothing.
        assert!(!run_external_tool("true", &input, &tmp.path().join("out.md")).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn existing_output_is_not_taken_for_fresh_output() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.txt");
        std::fs::write(&input, b"hi").unwrap();
        let output = tmp.path().join("out.md");
        std::fs::write(&output, "left over from an earlier run").unwrap();

        assert!(!run_external_tool("true", &input, &output).await);
        // The scratch dir is gone and the old file is untouched.
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".doc2md-external-"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "left over from an earlier run"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn written_output_is_moved_into_place() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.txt");
        std::fs::write(&input, b"hi").unwrap();
        let tool = tmp.path().join("fake-converter.sh");
        // Writes its input, upper-cased, to the path after `-o`.
        std::fs::write(&tool, "#!/bin/sh\ntr a-z A-Z < \"$1\" > \"$3\"\n").unwrap();
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        let output = tmp.path().join("out.md");
        std::fs::write(&output, "stale").unwrap();

        assert!(run_external_tool(tool.to_str().unwrap(), &input, &output).await);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "HI");
    }
}
