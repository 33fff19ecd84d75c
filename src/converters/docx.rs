//! DOCX → Markdown.
//!
//! The package is read with `zip` and the parts are walked with `quick-xml`:
//!
//! - `word/document.xml` → an ordered list of [`BodyElement`]s
//! - `word/styles.xml` → style id to display name, for heading detection
//! - `word/_rels/document.xml.rels` → image relationships
//!
//! Images are appended after the body text rather than interleaved at their
//! anchors.

use crate::error::ConvertError;
use crate::output::{ConvertedDocument, ExtractedImage};
use crate::pipeline::images::ImageStore;
use crate::pipeline::table::TableFragment;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

/// One top-level child of `w:body`, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyElement {
    Paragraph {
        style_id: Option<String>,
        text: String,
    },
    Table(TableFragment),
}

/// An image relationship from `document.xml.rels`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageRel {
    id: String,
    /// Path inside the package, e.g. `word/media/image1.png`.
    part: String,
}

/// Convert a `.docx` file on disk.
pub async fn convert(input: &Path, store: &ImageStore) -> Result<ConvertedDocument, ConvertError> {
    let path = input.to_path_buf();
    let store = store.clone();
    tokio::task::spawn_blocking(move || {
        let file = File::open(&path).map_err(|e| ConvertError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;
        convert_package(file, &path, &store)
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("DOCX task panicked: {}", e)))?
}

/// Convert an already-open DOCX package. `source` is used for errors only.
pub fn convert_package<R: Read + Seek>(
    reader: R,
    source: &Path,
    store: &ImageStore,
) -> Result<ConvertedDocument, ConvertError> {
    let corrupt = |detail: String| ConvertError::CorruptDocument {
        path: source.to_path_buf(),
        detail,
    };

    let mut archive = ZipArchive::new(reader).map_err(|e| corrupt(format!("not a ZIP package: {e}")))?;

    let document_xml = read_part(&mut archive, "word/document.xml")
        .ok_or_else(|| corrupt("missing word/document.xml".into()))?;
    let body = parse_body(&document_xml).map_err(corrupt)?;

    let styles = match read_part(&mut archive, "word/styles.xml") {
        Some(xml) => parse_styles(&xml).unwrap_or_else(|e| {
            warn!("Ignoring unreadable styles.xml: {}", e);
            HashMap::new()
        }),
        None => HashMap::new(),
    };

    let rels = match read_part(&mut archive, "word/_rels/document.xml.rels") {
        Some(xml) => parse_image_rels(&xml).unwrap_or_else(|e| {
            warn!("Ignoring unreadable relationships: {}", e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    let mut blocks = render_body(&body, &styles);
    let images = save_images(&mut archive, &rels, store);
    for img in &images {
        blocks.push(format!("![Image]({})", img.reference));
    }

    debug!(
        "DOCX: {} body element(s), {} image(s)",
        body.len(),
        images.len()
    );
    Ok(ConvertedDocument::new(blocks.join("\n\n"), images))
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<String> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Extract an attribute value by key.
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(Result::ok)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

// ── Body ─────────────────────────────────────────────────────────────────────

/// Text boxes (`w:txbxContent`) and the VML copy of alternate content
/// (`mc:Fallback`) are not part of the paragraph's own text.
fn is_skipped(name: &[u8]) -> bool {
    matches!(name, b"w:txbxContent" | b"mc:Fallback")
}

/// Upper bound for `w:gridSpan`, so a corrupt value cannot explode a row.
const MAX_GRID_SPAN: usize = 64;

#[derive(Default)]
struct BodyWalker {
    elements: Vec<BodyElement>,
    table_depth: usize,
    table: TableFragment,
    row: Vec<String>,
    cell: String,
    in_cell: bool,
    cell_span: usize,
    paragraph_depth: usize,
    skip_depth: usize,
    style_id: Option<String>,
    text: String,
    in_run: bool,
    in_text: bool,
}

impl BodyWalker {
    fn start(&mut self, e: &BytesStart) {
        let name = e.name();
        if is_skipped(name.as_ref()) || self.skip_depth > 0 {
            if is_skipped(name.as_ref()) {
                self.skip_depth += 1;
            }
            return;
        }
        match name.as_ref() {
            b"w:p" => {
                self.paragraph_depth += 1;
                if self.paragraph_depth == 1 {
                    self.style_id = None;
                    self.text.clear();
                }
            }
            b"w:r" => self.in_run = true,
            b"w:t" => self.in_text = self.in_run,
            b"w:tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.table = TableFragment::new();
                }
            }
            b"w:tr" if self.table_depth == 1 => self.row.clear(),
            b"w:tc" if self.table_depth == 1 => {
                self.cell.clear();
                self.in_cell = true;
                self.cell_span = 1;
            }
            _ => self.empty(e),
        }
    }

    fn empty(&mut self, e: &BytesStart) {
        if self.skip_depth > 0 {
            return;
        }
        match e.name().as_ref() {
            b"w:pStyle" if self.paragraph_depth == 1 => self.style_id = get_attr(e, b"w:val"),
            b"w:tab" if self.in_run => self.text.push('\t'),
            b"w:br" | b"w:cr" if self.in_run => self.text.push('\n'),
            b"w:gridSpan" if self.in_cell && self.table_depth == 1 => {
                self.cell_span = get_attr(e, b"w:val")
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(1)
                    .clamp(1, MAX_GRID_SPAN);
            }
            // `<w:tc/>` still occupies a column.
            b"w:tc" if self.table_depth == 1 => self.row.push(String::new()),
            _ => {}
        }
    }

    fn text(&mut self, s: &str) {
        if self.in_text {
            self.text.push_str(s);
        }
    }

    fn end(&mut self, name: &[u8]) {
        if self.skip_depth > 0 {
            if is_skipped(name) {
                self.skip_depth -= 1;
            }
            return;
        }
        match name {
            b"w:t" => self.in_text = false,
            b"w:r" => self.in_run = false,
            b"w:p" => {
                if self.paragraph_depth == 1 {
                    self.finish_paragraph();
                }
                self.paragraph_depth = self.paragraph_depth.saturating_sub(1);
            }
            // A merged cell fills every grid column it spans.
            b"w:tc" if self.table_depth == 1 => {
                let text = std::mem::take(&mut self.cell);
                for _ in 1..self.cell_span {
                    self.row.push(text.clone());
                }
                self.row.push(text);
                self.in_cell = false;
            }
            b"w:tr" if self.table_depth == 1 => {
                self.table.push_row(std::mem::take(&mut self.row));
            }
            b"w:tbl" => {
                self.table_depth = self.table_depth.saturating_sub(1);
                if self.table_depth == 0 {
                    let table = std::mem::take(&mut self.table);
                    self.elements.push(BodyElement::Table(table));
                }
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self) {
        let text = std::mem::take(&mut self.text);
        if self.table_depth == 0 {
            self.elements.push(BodyElement::Paragraph {
                style_id: self.style_id.take(),
                text,
            });
        } else {
            // Cell paragraphs (including nested tables) flatten into the
            // outermost cell.
            if !self.cell.is_empty() && !text.is_empty() {
                self.cell.push('\n');
            }
            self.cell.push_str(&text);
        }
    }
}

/// Parse `word/document.xml` into top-level body elements.
pub fn parse_body(xml: &str) -> Result<Vec<BodyElement>, String> {
    let mut reader = Reader::from_str(xml);
    // `xml:space="preserve"` runs carry meaningful leading/trailing spaces.
    reader.trim_text(false);

    let mut walker = BodyWalker::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => walker.start(&e),
            Ok(Event::Empty(e)) => walker.empty(&e),
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default();
                walker.text(&text);
            }
            Ok(Event::End(e)) => walker.end(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("error parsing document.xml: {e}")),
            _ => {}
        }
        buf.clear();
    }
    Ok(walker.elements)
}

// ── Styles ───────────────────────────────────────────────────────────────────

/// Parse `word/styles.xml` into styleId → display name.
pub fn parse_styles(xml: &str) -> Result<HashMap<String, String>, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut styles = HashMap::new();
    let mut current: Option<String> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:style" => {
                current = get_attr(&e, b"w:styleId");
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:name" => {
                if let (Some(id), Some(name)) = (current.as_ref(), get_attr(&e, b"w:val")) {
                    styles.insert(id.clone(), name);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:style" => current = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("error parsing styles.xml: {e}")),
            _ => {}
        }
        buf.clear();
    }
    Ok(styles)
}

/// Heading level for a style name: `Heading 2` → 2.
///
/// The name must start with "heading" (any case) and end in a digit; levels
/// past 6 are clamped. `Title` and friends are not headings.
pub fn heading_level(style_name: &str) -> Option<usize> {
    let lower = style_name.trim().to_ascii_lowercase();
    if !lower.starts_with("heading") {
        return None;
    }
    let level = lower.chars().last()?.to_digit(10)? as usize;
    (level > 0).then_some(level.min(6))
}

/// Render body elements as Markdown blocks (not yet joined).
pub fn render_body(elements: &[BodyElement], styles: &HashMap<String, String>) -> Vec<String> {
    let mut blocks = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            BodyElement::Paragraph { style_id, text } => {
                if text.trim().is_empty() {
                    continue;
                }
                let level = style_id.as_ref().and_then(|id| {
                    let name = styles.get(id).map(String::as_str).unwrap_or(id);
                    heading_level(name)
                });
                match level {
                    Some(n) => blocks.push(format!("{} {}", "#".repeat(n), text.trim())),
                    None => blocks.push(text.clone()),
                }
            }
            BodyElement::Table(table) => {
                if !table.is_empty() {
                    blocks.push(table.to_markdown());
                }
            }
        }
    }
    blocks
}

// ── Images ───────────────────────────────────────────────────────────────────

fn parse_image_rels(xml: &str) -> Result<Vec<ImageRel>, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut rels = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                let is_image = get_attr(&e, b"Type").is_some_and(|t| t.ends_with("/image"));
                let external = get_attr(&e, b"TargetMode").is_some_and(|m| m == "External");
                if let (true, false, Some(id), Some(target)) =
                    (is_image, external, get_attr(&e, b"Id"), get_attr(&e, b"Target"))
                {
                    rels.push(ImageRel {
                        id,
                        part: package_path(&target),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("error parsing relationships: {e}")),
            _ => {}
        }
        buf.clear();
    }

    rels.sort_by(|a, b| rel_order(&a.id).cmp(&rel_order(&b.id)));
    Ok(rels)
}

/// `media/x.png` → `word/media/x.png`; `/word/media/x.png` → `word/media/x.png`.
fn package_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{target}"),
    }
}

/// Numeric-aware order for relationship ids (`rId2` before `rId10`).
fn rel_order(id: &str) -> (u64, String) {
    let digits: String = id.chars().filter(char::is_ascii_digit).collect();
    (digits.parse().unwrap_or(u64::MAX), id.to_string())
}

fn save_images<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    rels: &[ImageRel],
    store: &ImageStore,
) -> Vec<ExtractedImage> {
    let mut images = Vec::new();
    for rel in rels {
        let bytes = match archive.by_name(&rel.part) {
            Ok(mut file) => {
                let mut bytes = Vec::new();
                match file.read_to_end(&mut bytes) {
                    Ok(_) => bytes,
                    Err(e) => {
                        warn!("Skipping image {} ({}): {}", rel.id, rel.part, e);
                        continue;
                    }
                }
            }
            Err(e) => {
                warn!("Skipping image {} ({}): {}", rel.id, rel.part, e);
                continue;
            }
        };

        let ext = Path::new(&rel.part)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "png".to_string());
        let name = format!("image_{}.{}", images.len(), ext);
        match store.save(&name, &bytes) {
            Ok(img) => images.push(img),
            Err(e) => warn!("Failed to save {}: {}", name, e),
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::table::count_cells;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn document(body: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><w:document {W_NS}><w:body>{body}</w:body></w:document>"#)
    }

    fn para(style: Option<&str>, text: &str) -> String {
        let ppr = style
            .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#))
            .unwrap_or_default();
        format!(r#"<w:p>{ppr}<w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    fn table(rows: &[&[&str]]) -> String {
        let mut xml = String::from("<w:tbl>");
        for row in rows {
            xml.push_str("<w:tr>");
            for cell in *row {
                xml.push_str(&format!("<w:tc>{}</w:tc>", para(None, cell)));
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        xml
    }

    const STYLES: &str = r#"<?xml version="1.0"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style>
<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/></w:style>
</w:styles>"#;

    fn package(body: &str, with_image: bool) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default();
        zip.start_file("word/document.xml", opts).unwrap();
        zip.write_all(document(body).as_bytes()).unwrap();
        zip.start_file("word/styles.xml", opts).unwrap();
        zip.write_all(STYLES.as_bytes()).unwrap();
        if with_image {
            zip.start_file("word/_rels/document.xml.rels", opts).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId10" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image2.jpeg"/>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="https://x.test/a.png" TargetMode="External"/>
</Relationships>"#).unwrap();
            zip.start_file("word/media/image1.png", opts).unwrap();
            zip.write_all(b"\x89PNG first").unwrap();
            zip.start_file("word/media/image2.jpeg", opts).unwrap();
            zip.write_all(b"\xff\xd8 second").unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn heading_levels() {
        assert_eq!(heading_level("heading 1"), Some(1));
        assert_eq!(heading_level("Heading 3"), Some(3));
        assert_eq!(heading_level("Heading 9"), Some(6));
        assert_eq!(heading_level("Title"), None);
        assert_eq!(heading_level("Heading"), None);
        assert_eq!(heading_level("Normal"), None);
    }

    #[test]
    fn body_keeps_document_order() {
        let xml = document(&format!(
            "{}{}{}",
            para(Some("Heading1"), "Intro"),
            table(&[&["a", "b"]]),
            para(None, "After")
        ));
        let body = parse_body(&xml).unwrap();
        assert_eq!(body.len(), 3);
        assert!(matches!(&body[0], BodyElement::Paragraph { style_id: Some(s), text } if s == "Heading1" && text == "Intro"));
        assert!(matches!(&body[1], BodyElement::Table(_)));
        assert!(matches!(&body[2], BodyElement::Paragraph { style_id: None, text } if text == "After"));
    }

    #[test]
    fn tabs_and_breaks_inside_runs() {
        let xml = document(r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>"#);
        let body = parse_body(&xml).unwrap();
        assert_eq!(
            body,
            vec![BodyElement::Paragraph {
                style_id: None,
                text: "a\tb\nc".into()
            }]
        );
    }

    #[test]
    fn nested_table_flattens_into_cell() {
        let inner = table(&[&["x"], &["y"]]);
        let xml = document(&format!(
            "<w:tbl><w:tr><w:tc>{}{inner}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            para(None, "outer"),
            para(None, "right")
        ));
        let body = parse_body(&xml).unwrap();
        let BodyElement::Table(t) = &body[0] else {
            panic!("expected table, got {body:?}");
        };
        assert_eq!(t.rows(), &[vec!["outer\nx\ny".to_string(), "right".to_string()]]);
    }

    #[test]
    fn merged_cells_fill_every_spanned_column() {
        let merged = format!(
            r#"<w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr>{}</w:tc><w:tc>{}</w:tc>"#,
            para(None, "merged"),
            para(None, "z")
        );
        let xml = document(&format!(
            "<w:tbl><w:tr>{}</w:tr><w:tr>{merged}</w:tr></w:tbl>",
            ["A", "B", "C"]
                .iter()
                .map(|h| format!("<w:tc>{}</w:tc>", para(None, h)))
                .collect::<String>()
        ));
        let body = parse_body(&xml).unwrap();
        let BodyElement::Table(t) = &body[0] else {
            panic!("expected table, got {body:?}");
        };
        assert_eq!(t.rows()[1], vec!["merged", "merged", "z"]);

        let md = t.to_markdown();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(count_cells(lines[2]), 3);
    }

    #[test]
    fn text_box_does_not_split_its_paragraph() {
        let xml = document(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Before</w:t></w:r><w:r><w:pict><v:shape><v:textbox><w:txbxContent><w:p><w:pPr><w:pStyle w:val="Normal"/></w:pPr><w:r><w:t>Box</w:t></w:r></w:p></w:txbxContent></v:textbox></v:shape></w:pict></w:r><w:r><w:t>After</w:t></w:r></w:p>"#,
        );
        let body = parse_body(&xml).unwrap();
        assert_eq!(
            body,
            vec![BodyElement::Paragraph {
                style_id: Some("Heading2".into()),
                text: "BeforeAfter".into()
            }]
        );
    }

    #[test]
    fn alternate_content_fallback_is_not_duplicated() {
        let xml = document(
            r#"<w:p><w:r><w:t>Left </w:t></w:r><w:r><mc:AlternateContent><mc:Choice Requires="wps"><w:drawing><wps:txbx><w:txbxContent><w:p><w:r><w:t>Shape</w:t></w:r></w:p></w:txbxContent></wps:txbx></w:drawing></mc:Choice><mc:Fallback><w:pict><w:p><w:r><w:t>Shape</w:t></w:r></w:p></w:pict></mc:Fallback></mc:AlternateContent></w:r><w:r><w:t>right</w:t></w:r></w:p><w:p><w:r><w:t>Next</w:t></w:r></w:p>"#,
        );
        let body = parse_body(&xml).unwrap();
        let texts: Vec<&str> = body
            .iter()
            .map(|el| match el {
                BodyElement::Paragraph { text, .. } => text.as_str(),
                BodyElement::Table(_) => "<table>",
            })
            .collect();
        assert_eq!(texts, vec!["Left right", "Next"]);
    }

    #[test]
    fn table_separator_matches_header_and_short_rows_are_not_padded() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::open(tmp.path(), "images").unwrap();
        let bytes = package(&table(&[&["H1", "H2", "H3"], &["1", "2", "3"], &["only"]]), false);

        let doc = convert_package(Cursor::new(bytes), Path::new("t.docx"), &store).unwrap();
        let lines: Vec<&str> = doc.markdown.lines().collect();
        assert_eq!(lines[1], "| --- | --- | --- |");
        assert_eq!(count_cells(lines[2]), 3);
        assert_eq!(lines[3], "| only |");
    }

    #[test]
    fn headings_paragraphs_and_images() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::open(tmp.path(), "images").unwrap();
        let body = format!(
            "{}{}{}{}",
            para(Some("Title"), "Doc Title"),
            para(Some("Heading2"), "Section"),
            para(None, "   "),
            para(None, "Body text.")
        );
        let doc = convert_package(Cursor::new(package(&body, true)), Path::new("t.docx"), &store).unwrap();

        assert_eq!(
            doc.markdown,
            "Doc Title\n\n## Section\n\nBody text.\n\n![Image](images/image_0.png)\n\n![Image](images/image_1.jpeg)"
        );
        assert_eq!(doc.images.len(), 2);
        assert_eq!(std::fs::read(tmp.path().join("images/image_0.png")).unwrap(), b"\x89PNG first");
        assert!(tmp.path().join(&doc.images[1].reference).is_file());
    }

    #[test]
    fn missing_document_part_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::open(tmp.path(), "images").unwrap();
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<x/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = convert_package(Cursor::new(bytes), Path::new("t.docx"), &store).unwrap_err();
        assert!(matches!(err, ConvertError::CorruptDocument { .. }));
    }

    #[test]
    fn non_zip_input_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::open(tmp.path(), "images").unwrap();
        let err = convert_package(Cursor::new(b"PK not really".to_vec()), Path::new("t.doc"), &store)
            .unwrap_err();
        assert!(matches!(err, ConvertError::CorruptDocument { .. }));
    }

    #[test]
    fn rel_ids_sort_numerically() {
        let mut ids = vec!["rId10", "rId2", "rId1"];
        ids.sort_by_key(|id| rel_order(id));
        assert_eq!(ids, vec!["rId1", "rId2", "rId10"]);
    }
}
