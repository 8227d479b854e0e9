//! `vorcheck-io`: turns uploaded documents into [`Table`]s and writes the
//! reconciliation report workbook.

pub mod csv;
pub mod error;
pub mod html;
pub mod pdf;
pub mod xlsx;
pub mod xml;

use std::path::Path;

use vorcheck_core::{SourceFormat, Table};

pub use error::{ExportError, FormatReadError};
pub use pdf::PdfOptions;
pub use xlsx::{ExportSheet, XLSX_MIME};

/// Options shared by all extractors.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub pdf: PdfOptions,
}

/// Extract a table from a file, choosing the extractor by extension.
pub fn extract_file(path: &Path, options: &ExtractOptions) -> Result<Table, FormatReadError> {
    let format = SourceFormat::from_path(path).ok_or_else(|| {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("(none)");
        FormatReadError::UnsupportedFormat(format!("extension {:?}", ext))
    })?;

    tracing::debug!("extracting {} as {}", path.display(), format);

    // pdftotext reads the file directly; no need to buffer it
    if format == SourceFormat::Pdf {
        return pdf::extract_file(path, &options.pdf);
    }

    let bytes = std::fs::read(path).map_err(|source| FormatReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    extract_bytes(&bytes, format, options)
}

/// Extract a table from an in-memory document of a declared format.
pub fn extract_bytes(
    bytes: &[u8],
    format: SourceFormat,
    options: &ExtractOptions,
) -> Result<Table, FormatReadError> {
    let table = match format {
        SourceFormat::Spreadsheet => xlsx::extract(bytes)?,
        SourceFormat::Csv => csv::extract(bytes)?,
        SourceFormat::Pdf => pdf::extract(bytes, &options.pdf)?,
        SourceFormat::Xml => xml::extract(bytes)?,
        SourceFormat::Html => html::extract(bytes)?,
    };

    tracing::debug!(
        "{}: {} columns, {} rows",
        format,
        table.column_count(),
        table.row_count()
    );
    Ok(table)
}

/// Decode text documents: UTF-8 first, Windows-1251 otherwise (Russian Excel/1C exports).
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            tracing::debug!("input is not UTF-8, decoding as windows-1251");
            let (decoded, _, _) = encoding_rs::WINDOWS_1251.decode(bytes);
            decoded.into_owned()
        }
    }
}
