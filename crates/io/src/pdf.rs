// PDF import via `pdftotext -layout` (poppler-utils)
//
// The layout text keeps column alignment, so a table row is a line whose
// cells are separated by runs of two or more spaces.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use vorcheck_core::{CellValue, Table};

use crate::error::FormatReadError;

const TOOL: &str = "pdftotext";

/// Where to find the text extraction tool.
#[derive(Debug, Clone, Default)]
pub struct PdfOptions {
    /// Explicit path to `pdftotext`; looked up on PATH when `None`.
    pub pdftotext: Option<PathBuf>,
}

/// Extract the table of a PDF file.
pub fn extract_file(path: &Path, options: &PdfOptions) -> Result<Table, FormatReadError> {
    let text = run_pdftotext(path, options)?;
    table_from_layout_text(&text)
}

/// Extract the table of a PDF held in memory (spooled to a temporary file).
pub fn extract(bytes: &[u8], options: &PdfOptions) -> Result<Table, FormatReadError> {
    let io_err = |source: std::io::Error| FormatReadError::Io { path: "temporary PDF".to_string(), source };

    let mut file = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.flush().map_err(io_err)?;

    extract_file(file.path(), options)
}

/// Run `pdftotext -layout <file> -` and capture stdout.
fn run_pdftotext(file: &Path, options: &PdfOptions) -> Result<String, FormatReadError> {
    let tool = match &options.pdftotext {
        Some(path) => path.clone(),
        None => which::which(TOOL).map_err(|_| FormatReadError::ToolMissing {
            tool: TOOL,
            hint: "install with: apt install poppler-utils / brew install poppler",
        })?,
    };

    let output = Command::new(&tool)
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(file)
        .arg("-")
        .output()
        .map_err(|source| FormatReadError::Io { path: tool.display().to_string(), source })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FormatReadError::ToolFailed {
            tool: TOOL,
            code: output.status.code().unwrap_or(-1),
            stderr: stderr.trim().to_string(),
        });
    }

    let text = String::from_utf8(output.stdout).map_err(|_| FormatReadError::Encoding("UTF-8"))?;
    tracing::debug!("pdf: extracted {} bytes of text from {}", text.len(), file.display());
    Ok(text)
}

fn cell_gap() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("invalid cell gap regex"))
}

/// Build a table from `pdftotext -layout` output. Pages are separated by form feeds.
///
/// Each page contributes its longest run of consecutive lines that split into
/// the same number (>= 2) of cells. Page tables whose width matches the first
/// page's table are concatenated in page order; the first row is the header,
/// and a later page starting with the same header row has that row skipped.
pub fn table_from_layout_text(text: &str) -> Result<Table, FormatReadError> {
    if text.trim().is_empty() {
        return Err(FormatReadError::NoTextLayer);
    }

    let page_tables: Vec<Vec<Vec<String>>> = text
        .split('\u{000C}')
        .filter_map(page_table)
        .collect();

    tracing::debug!("pdf: {} page(s) with a table candidate", page_tables.len());

    let mut pages = page_tables.into_iter();
    let first = pages.next().ok_or(FormatReadError::NoTable("pdf"))?;
    let width = first[0].len();

    let mut rows = first.into_iter();
    let header = rows.next().ok_or(FormatReadError::NoTable("pdf"))?;
    let mut body: Vec<Vec<String>> = rows.collect();

    for page in pages {
        if page[0].len() != width {
            tracing::warn!(
                "pdf: skipping page table with {} columns (expected {})",
                page[0].len(),
                width
            );
            continue;
        }
        let skip = usize::from(page[0] == header);
        body.extend(page.into_iter().skip(skip));
    }

    let rows = body
        .into_iter()
        .map(|row| row.iter().map(|c| CellValue::infer(c)).collect())
        .collect();

    Ok(Table::new(header, rows))
}

/// Longest run of consecutive equal-width table lines on one page.
fn page_table(page: &str) -> Option<Vec<Vec<String>>> {
    let mut best: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for line in page.lines() {
        let cells = split_cells(line);
        let continues = cells.len() >= 2
            && current.first().map_or(true, |first| first.len() == cells.len());

        if continues {
            current.push(cells);
            continue;
        }

        if current.len() > best.len() {
            best = std::mem::take(&mut current);
        }
        current.clear();
        if cells.len() >= 2 {
            current.push(cells);
        }
    }
    if current.len() > best.len() {
        best = current;
    }

    if best.is_empty() {
        None
    } else {
        Some(best)
    }
}

fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    cell_gap().split(trimmed).map(str::to_string).collect()
}
