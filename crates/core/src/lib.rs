//! `vorcheck-core`: data model shared by the extractors and the reconciliation engine.

pub mod cell;
pub mod format;
pub mod table;

pub use cell::CellValue;
pub use format::SourceFormat;
pub use table::Table;
