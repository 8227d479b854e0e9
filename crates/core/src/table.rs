use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;

/// Uniform tabular record set produced by a format extractor.
///
/// Column names are unique and every row has exactly one value per column.
/// Built only through [`Table::new`]; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table from a raw header and raw rows.
    ///
    /// - header names are trimmed; blank names become `column_<n>` (1-based)
    /// - repeated names get `.1`, `.2`, ... suffixes in order of appearance
    /// - rows are padded with `Empty` or truncated to the header width
    /// - rows with no non-empty value are dropped
    pub fn new(header: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let columns = unique_column_names(header);
        let width = columns.len();

        let rows = rows
            .into_iter()
            .filter(|row| row.iter().take(width).any(|v| !v.is_empty()))
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Build a table whose header is the first row of `grid`.
    /// Returns `None` if the grid has no row with a non-empty value.
    pub fn from_grid(grid: Vec<Vec<CellValue>>) -> Option<Self> {
        let mut iter = grid.into_iter().skip_while(|row| row.iter().all(|v| v.is_empty()));
        let header_row = iter.next()?;
        let header = header_row.iter().map(|v| v.display()).collect();
        Some(Self::new(header, iter.collect()))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Exact column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> &[Vec<CellValue>] {
        &self.rows[..n.min(self.rows.len())]
    }
}

fn unique_column_names(header: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(header.len());

    for (i, raw) in header.into_iter().enumerate() {
        let base = match raw.trim() {
            "" => format!("column_{}", i + 1),
            name => name.to_string(),
        };

        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        seen.insert(name.clone());
        out.push(name);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    #[test]
    fn header_names_are_unique_and_trimmed() {
        let table = Table::new(
            vec![" Шифр ".into(), "".into(), "Шифр".into(), "Шифр".into()],
            vec![],
        );
        assert_eq!(table.columns(), &["Шифр", "column_2", "Шифр.1", "Шифр.2"]);
    }

    #[test]
    fn rows_are_padded_truncated_and_blank_rows_dropped() {
        let table = Table::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![t("1")],
                vec![CellValue::Empty, t("  ")],
                vec![t("x"), t("y"), t("overflow")],
            ],
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0], vec![t("1"), CellValue::Empty]);
        assert_eq!(table.rows()[1], vec![t("x"), t("y")]);
    }

    #[test]
    fn from_grid_skips_leading_blank_rows() {
        let grid = vec![
            vec![CellValue::Empty, CellValue::Empty],
            vec![t("code"), t("qty")],
            vec![t("101"), CellValue::Number(10.0)],
        ];
        let table = Table::from_grid(grid).unwrap();
        assert_eq!(table.columns(), &["code", "qty"]);
        assert_eq!(table.cell(0, 1), Some(&CellValue::Number(10.0)));
        assert_eq!(table.column_index("qty"), Some(1));
        assert_eq!(table.column_index("QTY"), None);
    }

    #[test]
    fn from_grid_empty_is_none() {
        assert!(Table::from_grid(vec![]).is_none());
        assert!(Table::from_grid(vec![vec![CellValue::Empty]]).is_none());
    }

    #[test]
    fn head_is_clamped() {
        let table = Table::new(vec!["a".into()], vec![vec![t("1")], vec![t("2")]]);
        assert_eq!(table.head(1).len(), 1);
        assert_eq!(table.head(10).len(), 2);
    }
}
