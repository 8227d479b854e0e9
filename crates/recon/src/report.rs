//! Display and export shaping of joined rows.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vorcheck_core::{CellValue, Table};

use crate::error::ReconError;
use crate::model::{JoinedRow, MatchMode, Side, Status};

// ---------------------------------------------------------------------------
// Labels + colors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    En,
    #[default]
    Ru,
}

/// Background color class of a status cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    WarnRed,
    WarnYellow,
    OkGreen,
}

impl StatusColor {
    /// 0xRRGGBB.
    pub fn rgb(self) -> u32 {
        match self {
            Self::WarnRed => 0xFFCCCC,
            Self::WarnYellow => 0xFFFFCC,
            Self::OkGreen => 0xCCFFCC,
        }
    }
}

impl Status {
    pub fn color(self) -> StatusColor {
        match self {
            Status::Diverged => StatusColor::WarnRed,
            Status::MissingInA | Status::MissingInB => StatusColor::WarnYellow,
            Status::Matched => StatusColor::OkGreen,
        }
    }

    pub fn label(self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.as_str(),
            Locale::Ru => match self {
                Status::Matched => "Совпадает",
                Status::Diverged => "Расхождение",
                Status::MissingInA => "Нет в смете",
                Status::MissingInB => "Нет в ВОР",
            },
        }
    }
}

/// Accepts the snake_case names and the Russian labels, case-insensitively.
impl FromStr for Status {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Status::ALL
            .into_iter()
            .find(|st| {
                st.as_str() == wanted || st.label(Locale::Ru).to_lowercase() == wanted
            })
            .ok_or_else(|| ReconError::UnknownStatus(s.to_string()))
    }
}

impl Side {
    /// Suffix appended to this side's source columns in the export.
    pub fn column_suffix(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Side::Estimate, Locale::Ru) => "_смета",
            (Side::Boq, Locale::Ru) => "_ВОР",
            (Side::Estimate, Locale::En) => "_estimate",
            (Side::Boq, Locale::En) => "_boq",
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Statuses to show. Applies to display only; export is always complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFilter(BTreeSet<Status>);

impl Default for StatusFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl StatusFilter {
    pub fn all() -> Self {
        Self(Status::ALL.into_iter().collect())
    }

    /// An empty list means no filtering.
    pub fn from_statuses(statuses: impl IntoIterator<Item = Status>) -> Self {
        let set: BTreeSet<Status> = statuses.into_iter().collect();
        if set.is_empty() {
            Self::all()
        } else {
            Self(set)
        }
    }

    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, ReconError> {
        let statuses = names
            .iter()
            .map(|n| n.as_ref().parse::<Status>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_statuses(statuses))
    }

    pub fn contains(&self, status: Status) -> bool {
        self.0.contains(&status)
    }
}

// ---------------------------------------------------------------------------
// Display table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub key: String,
    pub quantity_a: String,
    pub quantity_b: String,
    pub divergence: String,
    pub status: Status,
    pub label: &'static str,
    pub color: StatusColor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTable {
    pub columns: [&'static str; 5],
    pub rows: Vec<DisplayRow>,
}

pub fn format_quantity(q: Option<f64>) -> String {
    q.map(|q| format!("{q:.3}")).unwrap_or_default()
}

pub fn format_divergence(d: Option<f64>) -> String {
    d.map(|d| format!("{d}%")).unwrap_or_default()
}

fn display_columns(mode: MatchMode, locale: Locale) -> [&'static str; 5] {
    match locale {
        Locale::Ru => [
            match mode {
                MatchMode::ByCode => "Шифр расценки",
                MatchMode::ByName => "Наименование работ",
            },
            "Кол-во (смета)",
            "Кол-во (ВОР)",
            "Расхождение, %",
            "Статус",
        ],
        Locale::En => [
            match mode {
                MatchMode::ByCode => "code",
                MatchMode::ByName => "name",
            },
            "quantity_a",
            "quantity_b",
            "divergence_percent",
            "status",
        ],
    }
}

pub fn display_table(
    rows: &[JoinedRow],
    filter: &StatusFilter,
    mode: MatchMode,
    locale: Locale,
) -> DisplayTable {
    DisplayTable {
        columns: display_columns(mode, locale),
        rows: rows
            .iter()
            .filter(|r| filter.contains(r.status))
            .map(|r| DisplayRow {
                key: r.key.clone(),
                quantity_a: format_quantity(r.quantity_a),
                quantity_b: format_quantity(r.quantity_b),
                divergence: format_divergence(r.divergence_percent),
                status: r.status,
                label: r.status.label(locale),
                color: r.status.color(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Export table
// ---------------------------------------------------------------------------

/// Every joined row with its source columns re-attached.
#[derive(Debug, Clone)]
pub struct ExportTable {
    pub table: Table,
    /// Status color per row, in the same order as `table.rows()`.
    pub row_colors: Vec<Option<u32>>,
    pub status_column: usize,
}

const COMPUTED_COLUMNS: [&str; 5] = ["key", "quantity_a", "quantity_b", "divergence_percent", "status"];

pub fn export_table(
    estimate: &Table,
    boq: &Table,
    rows: &[JoinedRow],
    locale: Locale,
) -> ExportTable {
    let suffixed = |t: &Table, side: Side| {
        t.columns()
            .iter()
            .map(move |c| format!("{c}{}", side.column_suffix(locale)))
            .collect::<Vec<_>>()
    };

    let mut header = suffixed(estimate, Side::Estimate);
    header.extend(suffixed(boq, Side::Boq));
    header.extend(COMPUTED_COLUMNS.iter().map(|c| c.to_string()));
    let status_column = header.len() - 1;

    let source = |t: &Table, row: Option<usize>| -> Vec<CellValue> {
        match row.and_then(|r| t.rows().get(r)) {
            Some(cells) => cells.clone(),
            None => vec![CellValue::Empty; t.column_count()],
        }
    };
    let number = |v: Option<f64>| v.map(CellValue::Number).unwrap_or_default();

    let mut body = Vec::with_capacity(rows.len());
    let mut row_colors = Vec::with_capacity(rows.len());
    for r in rows {
        let mut cells = source(estimate, r.row_a);
        cells.extend(source(boq, r.row_b));
        cells.push(CellValue::text(r.key.clone()));
        cells.push(number(r.quantity_a));
        cells.push(number(r.quantity_b));
        cells.push(number(r.divergence_percent));
        cells.push(CellValue::text(r.status.label(locale)));
        body.push(cells);
        row_colors.push(Some(r.status.color().rgb()));
    }

    ExportTable {
        table: Table::new(header, body),
        row_colors,
        status_column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, qa: Option<f64>, qb: Option<f64>, d: Option<f64>, status: Status) -> JoinedRow {
        JoinedRow {
            key: key.into(),
            quantity_a: qa,
            quantity_b: qb,
            divergence_percent: d,
            status,
            row_a: qa.map(|_| 0),
            row_b: qb.map(|_| 0),
        }
    }

    #[test]
    fn colors_follow_status() {
        assert_eq!(Status::Diverged.color().rgb(), 0xFFCCCC);
        assert_eq!(Status::MissingInA.color().rgb(), 0xFFFFCC);
        assert_eq!(Status::MissingInB.color(), StatusColor::WarnYellow);
        assert_eq!(Status::Matched.color().rgb(), 0xCCFFCC);
    }

    #[test]
    fn status_parses_names_and_labels() {
        assert_eq!("diverged".parse::<Status>().unwrap(), Status::Diverged);
        assert_eq!(" Missing_In_B ".parse::<Status>().unwrap(), Status::MissingInB);
        assert_eq!("Нет в смете".parse::<Status>().unwrap(), Status::MissingInA);
        assert_eq!("совпадает".parse::<Status>().unwrap(), Status::Matched);
        assert!("ok".parse::<Status>().is_err());
    }

    #[test]
    fn display_formats_and_filters() {
        let rows = vec![
            row("101", Some(10.0), Some(20.0), Some(50.0), Status::Diverged),
            row("102", Some(1.5), None, Some(100.0), Status::MissingInB),
            row("103", Some(2.0), Some(2.0), Some(0.0), Status::Matched),
        ];
        let filter = StatusFilter::from_statuses([Status::Diverged, Status::MissingInB]);
        let table = display_table(&rows, &filter, MatchMode::ByCode, Locale::Ru);

        assert_eq!(table.columns[0], "Шифр расценки");
        assert_eq!(table.rows.len(), 2);
        let first = &table.rows[0];
        assert_eq!(first.quantity_a, "10.000");
        assert_eq!(first.quantity_b, "20.000");
        assert_eq!(first.divergence, "50%");
        assert_eq!(first.label, "Расхождение");
        assert_eq!(table.rows[1].quantity_b, "");
        assert_eq!(table.rows[1].label, "Нет в ВОР");
    }

    #[test]
    fn empty_filter_shows_everything() {
        let f = StatusFilter::parse::<&str>(&[]).unwrap();
        assert_eq!(f, StatusFilter::all());
        assert!(StatusFilter::parse(&["bogus"][..]).is_err());
    }

    #[test]
    fn export_reattaches_source_columns() {
        let estimate = Table::new(
            vec!["Шифр".into(), "Кол-во".into()],
            vec![vec![CellValue::from("101"), CellValue::Number(10.0)]],
        );
        let boq = Table::new(
            vec!["Код".into(), "Объём".into(), "Ед.".into()],
            vec![vec![CellValue::from("101"), CellValue::Number(20.0), CellValue::from("м3")]],
        );
        let rows = vec![
            row("101", Some(10.0), Some(20.0), Some(50.0), Status::Diverged),
            JoinedRow { row_b: None, ..row("999", Some(1.0), None, Some(100.0), Status::MissingInB) },
        ];
        let export = export_table(&estimate, &boq, &rows, Locale::Ru);

        assert_eq!(
            export.table.columns(),
            &[
                "Шифр_смета", "Кол-во_смета", "Код_ВОР", "Объём_ВОР", "Ед._ВОР",
                "key", "quantity_a", "quantity_b", "divergence_percent", "status",
            ]
        );
        assert_eq!(export.status_column, 9);
        assert_eq!(export.table.row_count(), 2);
        assert_eq!(export.table.cell(0, 4), Some(&CellValue::from("м3")));
        assert_eq!(export.table.cell(0, 9), Some(&CellValue::from("Расхождение")));
        assert_eq!(export.table.cell(1, 2), Some(&CellValue::Empty));
        assert_eq!(export.table.cell(1, 7), Some(&CellValue::Empty));
        assert_eq!(export.row_colors, vec![Some(0xFFCCCC), Some(0xFFFFCC)]);
    }
}
