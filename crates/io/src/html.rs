// HTML import: the first <table> in the document

use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};
use vorcheck_core::{CellValue, Table};

use crate::error::FormatReadError;

fn table_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("table").expect("invalid table selector"))
}

fn tr_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tr").expect("invalid tr selector"))
}

/// Parse the first `<table>`; its first row supplies the column names.
pub fn extract(bytes: &[u8]) -> Result<Table, FormatReadError> {
    let content = crate::decode_text(bytes);
    let doc = Html::parse_document(&content);

    let table = doc
        .select(table_selector())
        .next()
        .ok_or(FormatReadError::NoTable("html"))?;

    let mut rows = table.select(tr_selector()).map(row_cells).filter(|r| !r.is_empty());

    let header = rows.next().ok_or(FormatReadError::NoTable("html"))?;
    let body: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(|c| CellValue::infer(c)).collect())
        .collect();

    tracing::debug!("html: table with {} columns, {} rows", header.len(), body.len());
    Ok(Table::new(header, body))
}

fn row_cells(tr: ElementRef<'_>) -> Vec<String> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| {
            let name = cell.value().name();
            name.eq_ignore_ascii_case("td") || name.eq_ignore_ascii_case("th")
        })
        .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
