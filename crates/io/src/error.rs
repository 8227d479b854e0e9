use thiserror::Error;

/// An extractor could not produce a table from a document.
///
/// Aborts the pipeline for that document; the message is user-facing and
/// the underlying cause (if any) is available through `source()`.
#[derive(Debug, Error)]
pub enum FormatReadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("cannot open spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed {format} document: {message}")]
    Malformed { format: &'static str, message: String },

    #[error("document is not valid {0}")]
    Encoding(&'static str),

    #[error("no table found in {0} document")]
    NoTable(&'static str),

    #[error("PDF has no text layer (scanned or image-only)")]
    NoTextLayer,

    #[error("{tool} not found")]
    ToolMissing { tool: &'static str, hint: &'static str },

    #[error("{tool} failed (exit {code}): {stderr}")]
    ToolFailed { tool: &'static str, code: i32, stderr: String },
}

impl FormatReadError {
    pub(crate) fn malformed(format: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed { format, message: message.into() }
    }

    /// Optional remediation text for the user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::ToolMissing { hint, .. } => Some(hint),
            Self::NoTextLayer => Some("run OCR on the document or export the table to xlsx"),
            Self::UnsupportedFormat(_) => Some("supported formats: xlsx, xls, ods, csv, pdf, xml, html"),
            _ => None,
        }
    }
}

/// The report workbook could not be written.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build xlsx: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("cannot write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
