//! Plain-text tables for the terminal.

use std::fmt::Write as _;

use crossterm::style::{Color, Stylize};
use unicode_width::UnicodeWidthStr;
use vorcheck_core::Table;
use vorcheck_recon::report::DisplayTable;
use vorcheck_recon::{ColumnRoleMapping, Locale, ReconSummary, StatusColor};

const MAX_CELL_WIDTH: usize = 48;

fn background(color: StatusColor) -> Color {
    let rgb = color.rgb();
    Color::Rgb {
        r: (rgb >> 16) as u8,
        g: (rgb >> 8) as u8,
        b: rgb as u8,
    }
}

fn clip(s: &str) -> String {
    if s.width() <= MAX_CELL_WIDTH {
        return s.to_string();
    }
    let mut out = String::new();
    for ch in s.chars() {
        if out.width() + 1 >= MAX_CELL_WIDTH {
            break;
        }
        out.push(ch);
    }
    out.push('…');
    out
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{s}{}", " ".repeat(fill))
}

fn pad_left(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{}{s}", " ".repeat(fill))
}

fn widths(header: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut w: Vec<usize> = header.iter().map(|h| h.width()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(slot) = w.get_mut(i) {
                *slot = (*slot).max(cell.width());
            }
        }
    }
    w
}

/// Comparison table. Numeric columns are right-aligned, the status cell is
/// colored when `color` is set.
pub fn comparison_table(table: &DisplayTable, color: bool) -> String {
    let header: Vec<String> = table.columns.iter().map(|c| c.to_string()).collect();
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| {
            vec![
                clip(&r.key),
                r.quantity_a.clone(),
                r.quantity_b.clone(),
                r.divergence.clone(),
                r.label.to_string(),
            ]
        })
        .collect();
    let w = widths(&header, &cells);

    let mut out = String::new();
    let head: Vec<String> = header.iter().zip(&w).map(|(h, w)| pad(h, *w)).collect();
    let _ = writeln!(out, "{}", head.join("  ").trim_end());
    let rule: Vec<String> = w.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));

    for (row, display) in cells.iter().zip(&table.rows) {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            match i {
                1..=3 => line.push_str(&pad_left(cell, w[i])),
                4 if color => {
                    let styled = pad(cell, w[i]).with(Color::Black).on(background(display.color));
                    line.push_str(&styled.to_string());
                }
                _ => line.push_str(&pad(cell, w[i])),
            }
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

pub fn summary_line(summary: &ReconSummary, locale: Locale) -> String {
    match locale {
        Locale::Ru => format!(
            "строк: {}; совпадает: {}, расхождение: {}, нет в смете: {}, нет в ВОР: {}",
            summary.total_rows,
            summary.matched,
            summary.diverged,
            summary.missing_in_a,
            summary.missing_in_b
        ),
        Locale::En => format!(
            "{} rows: {} matched, {} diverged, {} missing in estimate, {} missing in BoQ",
            summary.total_rows,
            summary.matched,
            summary.diverged,
            summary.missing_in_a,
            summary.missing_in_b
        ),
    }
}

/// First rows of an extracted table.
pub fn preview(table: &Table, rows: usize) -> String {
    let header: Vec<String> = table.columns().iter().map(|c| clip(c)).collect();
    let cells: Vec<Vec<String>> = table
        .head(rows)
        .iter()
        .map(|r| r.iter().map(|v| clip(&v.display())).collect())
        .collect();
    let w = widths(&header, &cells);

    let mut out = String::new();
    for row in std::iter::once(&header).chain(&cells) {
        let line: Vec<String> = row.iter().zip(&w).map(|(c, w)| pad(c, *w)).collect();
        let _ = writeln!(out, "{}", line.join(" | ").trim_end());
    }
    if table.row_count() > rows {
        let _ = writeln!(out, "... {} more row(s)", table.row_count() - rows);
    }
    out
}

pub fn roles(table: &Table, mapping: &ColumnRoleMapping) -> String {
    let name = |idx: Option<usize>| match idx {
        Some(i) => format!("{:?} (column {})", table.columns()[i], i + 1),
        None => "-".to_string(),
    };
    format!(
        "key:      {}\nname:     {}\nquantity: {}\n",
        name(mapping.key),
        name(mapping.name),
        name(mapping.quantity)
    )
}
