// Excel import (xlsx, xls, xlsb, ods: first worksheet only) and report export (xlsx only)
//
// Import: the first worksheet's grid, first non-empty row as header.
// Export: one or more tables written as plain value sheets with a bold
//         frozen header and optional per-row background colours.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook, Worksheet};
use vorcheck_core::{CellValue, Table};

use crate::error::{ExportError, FormatReadError};

/// Maximum rows read from a worksheet (prevents runaway memory on huge files)
const MAX_ROWS: usize = 1_048_576;

/// Excel's sheet name limit
const MAX_SHEET_NAME: usize = 31;

/// Excel's column limit (rust_xlsxwriter uses u16 columns)
const MAX_EXPORT_COLS: usize = 16_384;

/// MIME type of the exported report.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Read the first worksheet of a workbook held in memory.
pub fn extract(bytes: &[u8]) -> Result<Table, FormatReadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(FormatReadError::NoTable("spreadsheet"))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(FormatReadError::NoTable("spreadsheet"))??;

    let (height, width) = range.get_size();
    tracing::debug!("xlsx: sheet '{}' is {}x{}", sheet_name, height, width);

    if height > MAX_ROWS {
        tracing::warn!(
            "xlsx: sheet '{}' truncated from {} to {} rows",
            sheet_name, height, MAX_ROWS
        );
    }

    let grid: Vec<Vec<CellValue>> = range
        .rows()
        .take(MAX_ROWS)
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Table::from_grid(grid).ok_or(FormatReadError::NoTable("spreadsheet"))
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        // Excel serial; callers only ever treat these as opaque values
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
        Data::Error(_) => CellValue::Empty,
    }
}

// ============================================================================
// Export
// ============================================================================

/// One worksheet of an exported workbook.
#[derive(Debug, Clone, Copy)]
pub struct ExportSheet<'a> {
    pub name: &'a str,
    pub table: &'a Table,
    /// Column whose cells receive the per-row background colour.
    pub highlight_column: Option<usize>,
    /// Background colour (0xRRGGBB) per data row; missing entries are uncoloured.
    pub row_colors: &'a [Option<u32>],
}

impl<'a> ExportSheet<'a> {
    pub fn plain(name: &'a str, table: &'a Table) -> Self {
        Self { name, table, highlight_column: None, row_colors: &[] }
    }
}

/// Serialize sheets into an in-memory xlsx payload.
pub fn export_to_buffer(sheets: &[ExportSheet<'_>]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = build_workbook(sheets)?;
    Ok(workbook.save_to_buffer()?)
}

/// Serialize sheets into an xlsx file.
pub fn export(sheets: &[ExportSheet<'_>], path: &Path) -> Result<(), ExportError> {
    let bytes = export_to_buffer(sheets)?;
    std::fs::write(path, bytes).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn build_workbook(sheets: &[ExportSheet<'_>]) -> Result<XlsxWorkbook, ExportError> {
    let mut workbook = XlsxWorkbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sanitize_sheet_name(sheet.name))?;
        write_sheet(worksheet, sheet)?;
    }

    // An empty workbook is not a valid xlsx file
    if sheets.is_empty() {
        workbook.add_worksheet();
    }

    Ok(workbook)
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &ExportSheet<'_>) -> Result<(), ExportError> {
    let header_format = Format::new().set_bold();
    let cols = sheet.table.column_count().min(MAX_EXPORT_COLS);

    for (col, name) in sheet.table.columns().iter().take(cols).enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    for (row_idx, row) in sheet.table.rows().iter().enumerate() {
        let target_row = (row_idx + 1) as u32;
        let fill = sheet.row_colors.get(row_idx).copied().flatten();

        for (col, value) in row.iter().take(cols).enumerate() {
            let target_col = col as u16;
            let highlighted = sheet.highlight_column == Some(col);

            match (fill, highlighted) {
                (Some(rgb), true) => {
                    let format = Format::new().set_background_color(Color::RGB(rgb));
                    write_cell_with_format(worksheet, target_row, target_col, value, &format)?;
                }
                _ => write_cell(worksheet, target_row, target_col, value)?,
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();
    Ok(())
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<(), ExportError> {
    match value {
        CellValue::Empty => {}
        CellValue::Number(n) => {
            ws.write_number(row, col, *n)?;
        }
        CellValue::Text(s) => {
            ws.write_string(row, col, s)?;
        }
    }
    Ok(())
}

fn write_cell_with_format(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: &Format,
) -> Result<(), ExportError> {
    match value {
        CellValue::Empty => {
            ws.write_blank(row, col, format)?;
        }
        CellValue::Number(n) => {
            ws.write_number_with_format(row, col, *n, format)?;
        }
        CellValue::Text(s) => {
            ws.write_string_with_format(row, col, s, format)?;
        }
    }
    Ok(())
}

/// Excel forbids `[]:*?/\` in sheet names and caps them at 31 characters.
fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim().to_string();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(
            vec!["Шифр".into(), "Наименование".into(), "Кол-во".into()],
            vec![
                vec![CellValue::text("ФЕР01-01-001"), CellValue::text("Разработка грунта"), CellValue::Number(120.5)],
                vec![CellValue::Number(101.0), CellValue::Empty, CellValue::Number(10.0)],
            ],
        )
    }

    #[test]
    fn test_export_then_extract_first_sheet() {
        let table = sample_table();
        let other = Table::new(vec!["x".into()], vec![vec![CellValue::Number(1.0)]]);
        let bytes = export_to_buffer(&[
            ExportSheet::plain("Смета", &table),
            ExportSheet::plain("second", &other),
        ])
        .unwrap();

        let read_back = extract(&bytes).unwrap();
        assert_eq!(read_back.columns(), table.columns());
        assert_eq!(read_back.row_count(), 2);
        assert_eq!(read_back.cell(0, 2), Some(&CellValue::Number(120.5)));
        assert_eq!(read_back.cell(1, 0), Some(&CellValue::Number(101.0)));
        assert_eq!(read_back.cell(1, 1), Some(&CellValue::Empty));
    }

    #[test]
    fn test_export_with_highlight_colors() {
        let table = sample_table();
        let colors = [Some(0xFFCCCC), None];
        let sheet = ExportSheet {
            name: "report",
            table: &table,
            highlight_column: Some(2),
            row_colors: &colors,
        };
        let bytes = export_to_buffer(&[sheet]).unwrap();
        // xlsx is a zip archive
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comparison-report.xlsx");
        export(&[ExportSheet::plain("report", &sample_table())], &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(extract(&bytes).unwrap().row_count(), 2);
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(matches!(extract(b"not a workbook"), Err(FormatReadError::Spreadsheet(_))));
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("a/b:c"), "a_b_c");
        assert_eq!(sanitize_sheet_name(""), "Sheet1");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), 31);
    }
}
