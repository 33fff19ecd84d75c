//! Shared pipeline stages used by every format converter.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ format ──▶ external? ──▶ converters::* ──▶ postprocess ──▶ verify
//!           (detect)   (markitdown)   (builtin)        (base64, placeholders,
//!                                                        enhance)
//! ```
//!
//! 1. [`format`]   — map the file extension to a [`format::DocumentFormat`]
//! 2. [`external`] — optional external converter and OCR subprocesses
//! 3. [`images`]   — the `images/` side directory every converter writes to
//! 4. [`table`]    — GFM pipe tables for DOCX and XLSX
//! 5. [`llm`]      — the text-formatting assistant; the only network stage
//!    besides remote `<img>` downloads
//! 6. [`postprocess`] — base64 extraction, placeholder repair, enhancement
//! 7. [`verify`]   — check image references and write the inspection page

pub mod external;
pub mod format;
pub mod images;
pub mod llm;
pub mod postprocess;
pub mod table;
pub mod verify;
