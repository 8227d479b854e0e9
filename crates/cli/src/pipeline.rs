//! Extraction → column selection → normalization → reconciliation → report.
//!
//! One comparison runs start to finish on the calling thread. The first
//! document that fails to extract aborts the whole run.

use std::path::{Path, PathBuf};

use thiserror::Error;
use vorcheck_core::Table;
use vorcheck_io::{ExportError, ExportSheet, ExtractOptions, FormatReadError, XLSX_MIME};
use vorcheck_recon::report::{display_table, export_table, DisplayTable};
use vorcheck_recon::{
    normalize_table, run, select_columns, suggest_roles, ColumnOverrides, ColumnRoleMapping,
    ColumnSelection, ColumnSelectionError, KeywordTable, Locale, MatchMode, NormalizeOutput,
    ReconResult, RunOptions, Side, StatusFilter, Threshold,
};

/// Deterministic name of the exported workbook.
pub const REPORT_FILE_NAME: &str = "comparison-report.xlsx";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{}: {source}", path.display())]
    Read {
        /// `None` outside a comparison.
        side: Option<Side>,
        path: PathBuf,
        #[source]
        source: FormatReadError,
    },
    #[error(transparent)]
    Columns(#[from] ColumnSelectionError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Settings-derived context shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub keywords: KeywordTable,
    pub extract: ExtractOptions,
}

#[derive(Debug, Clone)]
pub struct SideInput {
    pub path: PathBuf,
    pub overrides: ColumnOverrides,
}

impl SideInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), overrides: ColumnOverrides::default() }
    }
}

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub name: String,
    pub estimate: SideInput,
    pub boq: SideInput,
    pub match_by: MatchMode,
    pub threshold: Threshold,
}

/// One side after extraction and normalization.
#[derive(Debug, Clone)]
pub struct PreparedSide {
    pub table: Table,
    pub mapping: ColumnRoleMapping,
    pub selection: ColumnSelection,
    pub normalized: NormalizeOutput,
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub estimate: PreparedSide,
    pub boq: PreparedSide,
    pub result: ReconResult,
}

/// In-memory report workbook.
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub file_name: &'static str,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

pub fn extract(side: Option<Side>, path: &Path, ctx: &Context) -> Result<Table, PipelineError> {
    vorcheck_io::extract_file(path, &ctx.extract).map_err(|source| PipelineError::Read {
        side,
        path: path.to_path_buf(),
        source,
    })
}

fn prepare(
    side: Side,
    input: &SideInput,
    mode: MatchMode,
    ctx: &Context,
) -> Result<PreparedSide, PipelineError> {
    let table = extract(Some(side), &input.path, ctx)?;
    let mapping = suggest_roles(table.columns(), &ctx.keywords);
    let selection = select_columns(&table, &mapping, &input.overrides, mode, side)?;
    let normalized = normalize_table(&table, selection, mode, side);
    Ok(PreparedSide { table, mapping, selection, normalized })
}

pub fn compare(req: &CompareRequest, ctx: &Context) -> Result<Comparison, PipelineError> {
    let estimate = prepare(Side::Estimate, &req.estimate, req.match_by, ctx)?;
    let boq = prepare(Side::Boq, &req.boq, req.match_by, ctx)?;

    let options = RunOptions {
        name: req.name.clone(),
        match_by: req.match_by,
        threshold: req.threshold,
    };
    let result = run(&options, &estimate.normalized, &boq.normalized);
    Ok(Comparison { estimate, boq, result })
}

impl Comparison {
    pub fn display(&self, filter: &StatusFilter, locale: Locale) -> DisplayTable {
        display_table(&self.result.rows, filter, self.result.meta.match_by, locale)
    }

    /// Full, unfiltered report as an xlsx payload.
    pub fn export(&self, locale: Locale) -> Result<ExportPayload, PipelineError> {
        let export = export_table(&self.estimate.table, &self.boq.table, &self.result.rows, locale);
        let sheet_name = match locale {
            Locale::Ru => "Сравнение",
            Locale::En => "Comparison",
        };
        let sheet = ExportSheet {
            name: sheet_name,
            table: &export.table,
            highlight_column: Some(export.status_column),
            row_colors: &export.row_colors,
        };
        let bytes = vorcheck_io::xlsx::export_to_buffer(&[sheet])?;
        Ok(ExportPayload { file_name: REPORT_FILE_NAME, mime: XLSX_MIME, bytes })
    }
}

/// Preview of one document and the columns the heuristics would pick.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub table: Table,
    pub mapping: ColumnRoleMapping,
}

pub fn inspect(path: &Path, ctx: &Context) -> Result<Inspection, PipelineError> {
    let table = extract(None, path, ctx)?;
    let mapping = suggest_roles(table.columns(), &ctx.keywords);
    Ok(Inspection { table, mapping })
}
