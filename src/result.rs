//! Result Set - fixed result contract returned by the executor
//!
//! Column names come from the executed statement's own projection, not from the
//! schema contract, since generated SQL may alias or restrict columns.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One scalar value as SQLite reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Cell {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Integer(_) | Cell::Real(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Real(r) => write!(f, "{}", r),
            Cell::Text(s) => f.write_str(s),
            Cell::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}

impl From<rusqlite::types::ValueRef<'_>> for Cell {
    fn from(value: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(r) => Cell::Real(r),
            ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Cell::Blob(b.to_vec()),
        }
    }
}

/// Cells in projection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(pub Vec<Cell>);

impl Row {
    pub fn cells(&self) -> &[Cell] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.0.get(index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` for the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Renders every row as a markdown pipe table.
    pub fn to_markdown(&self) -> String {
        self.render_markdown(self.rows.len())
    }

    /// Renders at most `limit` rows as a markdown pipe table.
    pub fn to_markdown_limited(&self, limit: usize) -> String {
        self.render_markdown(limit)
    }

    fn render_markdown(&self, limit: usize) -> String {
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .take(limit)
            .map(|row| row.cells().iter().map(|c| escape_cell(&c.to_string())).collect())
            .collect();
        let headers: Vec<String> = self.columns.iter().map(|c| escape_cell(c)).collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        // Right-align columns whose non-null values are all numbers.
        let numeric: Vec<bool> = (0..headers.len())
            .map(|i| {
                let mut seen = false;
                for row in self.rows.iter().take(limit) {
                    match row.get(i) {
                        Some(Cell::Null) | None => {}
                        Some(cell) if cell.is_numeric() => seen = true,
                        Some(_) => return false,
                    }
                }
                seen
            })
            .collect();

        let mut out = Vec::with_capacity(rows.len() + 2);
        out.push(render_line(&headers, &widths, &numeric));
        let separator: Vec<String> = widths
            .iter()
            .zip(&numeric)
            .map(|(w, right)| {
                if *right {
                    format!("{}:", "-".repeat(w + 1))
                } else {
                    format!(":{}", "-".repeat(w + 1))
                }
            })
            .collect();
        out.push(format!("|{}|", separator.join("|")));
        for row in &rows {
            out.push(render_line(row, &widths, &numeric));
        }
        out.join("\n")
    }
}

fn render_line(cells: &[String], widths: &[usize], numeric: &[bool]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .zip(numeric)
        .map(|((cell, width), right)| {
            if *right {
                format!(" {:>width$} ", cell, width = width)
            } else {
                format!(" {:<width$} ", cell, width = width)
            }
        })
        .collect();
    format!("|{}|", padded.join("|"))
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(|c: char| c == '\r' || c == '\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        ResultSet::new(
            vec!["Diagnosis".to_string(), "Total".to_string()],
            vec![
                Row(vec![Cell::Text("Asthma".to_string()), Cell::Integer(12)]),
                Row(vec![Cell::Text("Hypertension".to_string()), Cell::Integer(3)]),
            ],
        )
    }

    #[test]
    fn test_markdown_table_layout() {
        let table = sample().to_markdown();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| Diagnosis    | Total |");
        assert_eq!(lines[1], "|:-------------|------:|");
        assert_eq!(lines[2], "| Asthma       |    12 |");
        assert_eq!(lines[3], "| Hypertension |     3 |");
    }

    #[test]
    fn test_markdown_limit_truncates_rows() {
        let table = sample().to_markdown_limited(1);
        assert_eq!(table.lines().count(), 3);
        assert!(!table.contains("Hypertension"));
    }

    #[test]
    fn test_pipes_and_nulls_are_rendered_safely() {
        let set = ResultSet::new(
            vec!["Note".to_string()],
            vec![Row(vec![Cell::Text("a|b".to_string())]), Row(vec![Cell::Null])],
        );
        let table = set.to_markdown();
        assert!(table.contains("a\\|b"));
        assert!(table.contains("NULL"));
    }

    #[test]
    fn test_value_by_column_name() {
        let set = sample();
        assert_eq!(set.value(0, "Total"), Some(&Cell::Integer(12)));
        assert_eq!(set.value(1, "Diagnosis").and_then(Cell::as_str), Some("Hypertension"));
        assert!(set.value(0, "Missing").is_none());
        assert!(set.value(5, "Total").is_none());
    }

    #[test]
    fn test_serializes_cells_as_plain_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["rows"][0][1], serde_json::json!(12));
        assert_eq!(json["columns"][0], serde_json::json!("Diagnosis"));
    }
}
