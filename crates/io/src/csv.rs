// CSV import

use vorcheck_core::{CellValue, Table};

use crate::error::FormatReadError;

/// Parse CSV bytes into a table. The first non-empty record is the header.
pub fn extract(bytes: &[u8]) -> Result<Table, FormatReadError> {
    let decoded = crate::decode_text(bytes);
    let content = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);
    let delimiter = sniff_delimiter(content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result?;
        grid.push(record.iter().map(CellValue::infer).collect::<Vec<_>>());
    }

    tracing::debug!("csv: {} records, delimiter {:?}", grid.len(), delimiter as char);
    Table::from_grid(grid).ok_or(FormatReadError::NoTable("csv"))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let Some(&target) = counts.first() else { continue };
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}
