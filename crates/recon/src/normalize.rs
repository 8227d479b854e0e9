//! Key and quantity normalization.
//!
//! Normalization never fails. An empty key drops the row from matching and an
//! unparseable quantity becomes `None`.

use vorcheck_core::{CellValue, Table};

use crate::heuristics::ColumnSelection;
use crate::model::{MatchMode, NormalizedRecord, Side, SideStats};

/// Canonical match key, or `None` when the key is empty after trimming.
pub fn normalize_key(value: &CellValue, mode: MatchMode) -> Option<String> {
    let raw = value.display();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(match mode {
        MatchMode::ByCode => trimmed.to_string(),
        MatchMode::ByName => trimmed.to_lowercase(),
    })
}

/// Parse quantity text such as `"12,5"` or `"1,234.5 м²"`.
///
/// Comma becomes a decimal point before anything is stripped, then every
/// character other than an ASCII digit, `.` or `-` is removed. When more than
/// one point remains only the last is kept. Thousands separators are not
/// recognized: `"1,234"` reads as `1.234`.
pub fn parse_quantity_text(raw: &str) -> Option<f64> {
    let kept: String = raw
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let cleaned = match kept.rfind('.') {
        Some(last) if kept.matches('.').count() > 1 => {
            let (int_part, frac_part) = kept.split_at(last);
            let mut s: String = int_part.chars().filter(|c| *c != '.').collect();
            s.push_str(frac_part);
            s
        }
        _ => kept,
    };

    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn normalize_quantity(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Empty => None,
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) => None,
        CellValue::Text(s) => parse_quantity_text(s),
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOutput {
    pub records: Vec<NormalizedRecord>,
    pub stats: SideStats,
}

/// Reduce a table to its matchable records, in row order.
pub fn normalize_table(
    table: &Table,
    selection: ColumnSelection,
    mode: MatchMode,
    side: Side,
) -> NormalizeOutput {
    let mut out = NormalizeOutput::default();
    out.stats.source_rows = table.row_count();

    for (row, cells) in table.rows().iter().enumerate() {
        let Some(key) = cells.get(selection.key).and_then(|v| normalize_key(v, mode)) else {
            out.stats.rows_without_key += 1;
            continue;
        };

        let raw_qty = cells.get(selection.quantity).unwrap_or(&CellValue::Empty);
        let quantity = normalize_quantity(raw_qty);
        if quantity.is_none() {
            out.stats.unparsed_quantities += 1;
            tracing::debug!("{side}: row {row} key {key:?}: no quantity in {:?}", raw_qty.display());
        }

        out.records.push(NormalizedRecord { key, quantity, row });
    }
    out.stats.records = out.records.len();

    if out.stats.rows_without_key > 0 {
        tracing::warn!(
            "{side}: {} row(s) without a key excluded from matching",
            out.stats.rows_without_key
        );
    }
    if out.stats.unparsed_quantities > 0 {
        tracing::warn!(
            "{side}: {} row(s) with an unreadable quantity",
            out.stats.unparsed_quantities
        );
    }
    tracing::debug!("{side}: {} record(s) from {} row(s)", out.stats.records, out.stats.source_rows);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_trimmed_and_folded_by_name() {
        let v = CellValue::from("  Устройство Бетонной Подготовки ");
        assert_eq!(
            normalize_key(&v, MatchMode::ByName).as_deref(),
            Some("устройство бетонной подготовки")
        );
        assert_eq!(
            normalize_key(&v, MatchMode::ByCode).as_deref(),
            Some("Устройство Бетонной Подготовки")
        );
    }

    #[test]
    fn numeric_key_has_no_fraction() {
        assert_eq!(normalize_key(&CellValue::Number(101.0), MatchMode::ByCode).as_deref(), Some("101"));
    }

    #[test]
    fn inferred_and_text_keys_agree() {
        for raw in ["001", "6.10", "101", "ФЕР01-01"] {
            assert_eq!(
                normalize_key(&CellValue::infer(raw), MatchMode::ByCode),
                normalize_key(&CellValue::text(raw), MatchMode::ByCode),
                "{raw}"
            );
        }
    }

    #[test]
    fn blank_key_is_none() {
        assert_eq!(normalize_key(&CellValue::from("   "), MatchMode::ByCode), None);
        assert_eq!(normalize_key(&CellValue::Empty, MatchMode::ByName), None);
    }

    #[test]
    fn key_normalization_is_idempotent() {
        for raw in ["  ФЕР06-01-001-01 ", "Кладка Стен", "\tabc\n", "101"] {
            for mode in [MatchMode::ByCode, MatchMode::ByName] {
                let once = normalize_key(&CellValue::from(raw), mode).unwrap();
                let twice = normalize_key(&CellValue::from(once.as_str()), mode).unwrap();
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn quantity_decimal_comma() {
        assert_eq!(parse_quantity_text("12,5"), Some(12.5));
        assert_eq!(parse_quantity_text(" 0,750 т"), Some(0.75));
    }

    #[test]
    fn quantity_with_unit_suffix_and_grouping() {
        assert_eq!(parse_quantity_text("1,234.5 м²"), Some(1234.5));
        assert_eq!(parse_quantity_text("1 234,5"), Some(1234.5));
    }

    #[test]
    fn thousands_comma_reads_as_decimal() {
        assert_eq!(parse_quantity_text("1,234"), Some(1.234));
    }

    #[test]
    fn unit_digits_leak_into_quantity() {
        // the "3" of м3 survives the strip
        assert_eq!(parse_quantity_text("5,2 м3"), Some(5.23));
        assert_eq!(parse_quantity_text("5,2 м³"), Some(5.2));
    }

    #[test]
    fn negative_quantity() {
        assert_eq!(parse_quantity_text("-3,5"), Some(-3.5));
    }

    #[test]
    fn unparseable_quantity_is_none() {
        assert_eq!(parse_quantity_text(""), None);
        assert_eq!(parse_quantity_text("н/д"), None);
        assert_eq!(parse_quantity_text("-"), None);
        assert_eq!(parse_quantity_text("1-2"), None);
    }

    #[test]
    fn quantity_from_cells() {
        assert_eq!(normalize_quantity(&CellValue::Number(7.0)), Some(7.0));
        assert_eq!(normalize_quantity(&CellValue::Number(f64::NAN)), None);
        assert_eq!(normalize_quantity(&CellValue::Empty), None);
        assert_eq!(normalize_quantity(&CellValue::from("7,25")), Some(7.25));
    }

    #[test]
    fn table_rows_without_key_are_dropped() {
        let table = Table::new(
            vec!["Шифр".into(), "Кол-во".into()],
            vec![
                vec![CellValue::from("101"), CellValue::Number(10.0)],
                vec![CellValue::from("  "), CellValue::Number(5.0)],
                vec![CellValue::from("102"), CellValue::from("н/д")],
            ],
        );
        let out = normalize_table(
            &table,
            ColumnSelection { key: 0, quantity: 1 },
            MatchMode::ByCode,
            Side::Estimate,
        );
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0], NormalizedRecord { key: "101".into(), quantity: Some(10.0), row: 0 });
        assert_eq!(out.records[1], NormalizedRecord { key: "102".into(), quantity: None, row: 2 });
        assert_eq!(out.stats.source_rows, 3);
        assert_eq!(out.stats.rows_without_key, 1);
        assert_eq!(out.stats.unparsed_quantities, 1);
    }
}
