//! GFM pipe tables built from rows of cell text.
//!
//! Shared by the DOCX and XLSX converters. The first row is always the
//! header and is followed by a `---` separator with the same column count.
//! Data rows emit exactly the cells they have: short rows are not padded and
//! long rows are not truncated, which mirrors what the source document says.

/// Rows of cell text, held only while a table is being serialised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFragment {
    rows: Vec<Vec<String>>,
}

impl TableFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Column count of the header row (0 for an empty table).
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Serialise as a pipe table. Empty tables produce an empty string.
    pub fn to_markdown(&self) -> String {
        let Some((header, body)) = self.rows.split_first() else {
            return String::new();
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(render_row(header));
        lines.push(render_row(
            &std::iter::repeat_n("---".to_string(), header.len()).collect::<Vec<_>>(),
        ));
        for row in body {
            lines.push(render_row(row));
        }
        lines.join("\n")
    }
}

fn render_row(cells: &[String]) -> String {
    let cells: Vec<String> = cells.iter().map(|c| escape_cell(c)).collect();
    format!("| {} |", cells.join(" | "))
}

/// Keep a cell on one line and stop literal pipes from splitting it.
fn escape_cell(cell: &str) -> String {
    cell.trim()
        .replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

/// Count the cells of a rendered pipe-table line, honouring `\|` escapes.
pub fn count_cells(line: &str) -> usize {
    let inner = line.trim().trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let mut count = 1;
    let mut prev = '\0';
    for c in inner.chars() {
        if c == '|' && prev != '\\' {
            count += 1;
        }
        prev = c;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_separator_and_rows() {
        let t = TableFragment::from_rows(vec![row(&["Name", "Qty"]), row(&["apple", "3"])]);
        assert_eq!(t.to_markdown(), "| Name | Qty |\n| --- | --- |\n| apple | 3 |");
    }

    #[test]
    fn separator_matches_header_width() {
        let t = TableFragment::from_rows(vec![row(&["a", "b", "c", "d"])]);
        let md = t.to_markdown();
        let sep = md.lines().nth(1).unwrap();
        assert_eq!(sep.matches("---").count(), 4);
        assert_eq!(count_cells(sep), 4);
    }

    #[test]
    fn short_rows_are_not_padded() {
        let t = TableFragment::from_rows(vec![row(&["a", "b", "c"]), row(&["1"])]);
        let md = t.to_markdown();
        let last = md.lines().last().unwrap();
        assert_eq!(last, "| 1 |");
        assert_eq!(count_cells(last), 1);
    }

    #[test]
    fn empty_cells_stay_empty() {
        let t = TableFragment::from_rows(vec![row(&["a", ""]), row(&["", "x"])]);
        assert_eq!(t.to_markdown(), "| a |  |\n| --- | --- |\n|  | x |");
    }

    #[test]
    fn pipes_and_newlines_are_escaped() {
        let t = TableFragment::from_rows(vec![row(&["a|b", "line1\nline2"])]);
        let header = t.to_markdown().lines().next().unwrap().to_string();
        assert_eq!(header, "| a\\|b | line1 line2 |");
        assert_eq!(count_cells(&header), 2);
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert_eq!(TableFragment::new().to_markdown(), "");
        assert_eq!(TableFragment::new().column_count(), 0);
    }
}
