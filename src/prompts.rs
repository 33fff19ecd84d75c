//! Prompts for the text-formatting assistant.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how the assistant is instructed
//!    (e.g. tightening the "do not rewrite" rule) requires editing exactly
//!    one place.
//!
//! 2. **Testability** — unit tests can import and inspect prompts directly
//!    without calling a real completion service.
//!
//! Every prompt demands verbatim preservation: the assistant may add
//! structural Markdown (headings, lists, tables, fences) but must not
//! paraphrase, summarise, translate, or add commentary.

use crate::pipeline::llm::SourceFormat;

/// System message for the primary conversion call.
pub const CONVERSION_SYSTEM_PROMPT: &str = "You are a document conversion specialist. \
Convert documents to clean, well-structured markdown without altering their content.";

/// System message for the final enhancement pass.
pub const ENHANCE_SYSTEM_PROMPT: &str = "You are a document formatting specialist. \
Fix markdown formatting issues without changing content.";

const PRESERVATION_RULES: &str = r#"Follow these rules precisely:

1. TEXT PRESERVATION
   - Keep ALL text exactly as given, word for word
   - Do NOT summarise, paraphrase, translate, or reorder content
   - Do NOT add commentary, explanations, or new content

2. STRUCTURE
   - Add only the minimal Markdown needed: headings, lists, emphasis, code fences
   - Format tables as GFM pipe tables with a header separator row
   - Keep every existing image reference and its path unchanged

3. OUTPUT FORMAT
   - Output ONLY the Markdown content
   - Do NOT wrap the output in ```markdown fences"#;

/// Build the user prompt for converting `source` content to Markdown.
///
/// The content is expected to be truncated by the caller already.
pub fn conversion_prompt(source: SourceFormat, content: &str) -> String {
    let intro = match source {
        SourceFormat::Pdf => {
            "Convert the following text extracted from a PDF document to well-formatted markdown. \
Line breaks may have been introduced by the page layout; join broken lines inside a paragraph \
but keep paragraph boundaries. Recreate tables that were flattened into text."
        }
        SourceFormat::Html => {
            "Convert the following HTML content to well-formatted markdown. \
Preserve all tables, images, links, formatting, and structure. \
For images, use the existing image paths from the src attributes."
        }
        SourceFormat::Markdown => {
            "Review the following markdown content and fix only its formatting."
        }
    };

    format!("{intro}\n\n{PRESERVATION_RULES}\n\nContent:\n{content}")
}

/// Build the user prompt for one window of the enhancement pass.
pub fn enhance_prompt(chunk: &str) -> String {
    format!(
        r#"Review and enhance the following markdown content:
1. Fix any formatting issues
2. Ensure tables are properly formatted
3. Make sure image references are correct
4. Preserve the original document structure
5. Do NOT add any new content or commentary

Markdown content:

{chunk}"#
    )
}
