//! XLSX / XLS → Markdown: one `## Sheet:` heading and pipe table per sheet.
//!
//! Cell values are rendered with their `Display` form only; no number
//! formatting is applied.

use crate::error::ConvertError;
use crate::output::ConvertedDocument;
use crate::pipeline::table::TableFragment;
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use tracing::{debug, warn};

/// Convert a workbook on disk. Sheets appear in workbook order.
pub async fn convert(input: &Path) -> Result<ConvertedDocument, ConvertError> {
    let path = input.to_path_buf();
    tokio::task::spawn_blocking(move || convert_blocking(&path))
        .await
        .map_err(|e| ConvertError::Internal(format!("XLSX task panicked: {}", e)))?
}

fn convert_blocking(path: &Path) -> Result<ConvertedDocument, ConvertError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ConvertError::CorruptDocument {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut sections = Vec::new();
    for name in workbook.sheet_names() {
        let section = match workbook.worksheet_range(&name) {
            Ok(range) => sheet_to_markdown(&name, &range),
            Err(e) => {
                warn!("Sheet '{}' unreadable: {}", name, e);
                sheet_heading(&name)
            }
        };
        sections.push(section);
    }

    debug!("XLSX: {} sheet(s)", sections.len());
    Ok(ConvertedDocument::new(sections.join("\n\n"), Vec::new()))
}

fn sheet_heading(name: &str) -> String {
    format!("## Sheet: {name}")
}

/// Heading plus a table over rows and columns `0..=end`, anchored at A1.
///
/// The first row is the header. Empty cells (and cells before the range's
/// start) render as empty strings. A sheet without cells is just a heading.
pub fn sheet_to_markdown(name: &str, range: &Range<Data>) -> String {
    let heading = sheet_heading(name);
    let Some((last_row, last_col)) = range.end() else {
        return heading;
    };

    let mut table = TableFragment::new();
    for r in 0..=last_row {
        let row = (0..=last_col)
            .map(|c| match range.get_value((r, c)) {
                Some(Data::Empty) | None => String::new(),
                Some(value) => value.to_string(),
            })
            .collect();
        table.push_row(row);
    }

    format!("{heading}\n\n{}", table.to_markdown())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_rows_and_empty_cells() {
        let mut range = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), Data::String("Name".into()));
        range.set_value((0, 1), Data::String("Qty".into()));
        range.set_value((1, 0), Data::String("apple".into()));
        range.set_value((1, 1), Data::Float(3.0));
        range.set_value((2, 0), Data::String("pear".into()));

        let md = sheet_to_markdown("Fruit", &range);
        assert_eq!(
            md,
            "## Sheet: Fruit\n\n| Name | Qty |\n| --- | --- |\n| apple | 3 |\n| pear |  |"
        );
    }

    #[test]
    fn range_not_starting_at_a1_is_anchored() {
        let mut range = Range::new((1, 1), (1, 2));
        range.set_value((1, 1), Data::String("b2".into()));
        range.set_value((1, 2), Data::Int(7));

        let md = sheet_to_markdown("S", &range);
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[2], "|  |  |  |");
        assert_eq!(lines[3], "| --- | --- | --- |");
        assert_eq!(lines[4], "|  | b2 | 7 |");
    }

    #[test]
    fn empty_sheet_is_heading_only() {
        let range: Range<Data> = Range::empty();
        assert_eq!(sheet_to_markdown("Blank", &range), "## Sheet: Blank");
    }

    #[test]
    fn bool_values_use_display() {
        let mut range = Range::new((0, 0), (0, 0));
        range.set_value((0, 0), Data::Bool(true));
        assert!(sheet_to_markdown("B", &range).contains("| true |"));
    }
}
