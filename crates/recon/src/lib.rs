//! `vorcheck-recon`: estimate vs. bill-of-quantities reconciliation.
//!
//! Pure engine crate: receives extracted tables, returns classified results.
//! No file or process IO.

pub mod config;
pub mod engine;
pub mod error;
pub mod heuristics;
pub mod model;
pub mod normalize;
pub mod report;
pub mod summary;

pub use config::ReconJob;
pub use engine::{reconcile, run, RunOptions};
pub use error::{ColumnSelectionError, ReconError};
pub use heuristics::{suggest_roles, select_columns, ColumnOverrides, ColumnRoleMapping, ColumnSelection, KeywordTable};
pub use model::{JoinedRow, MatchMode, NormalizedRecord, ReconResult, ReconSummary, Side, Status, Threshold};
pub use normalize::{normalize_table, NormalizeOutput};
pub use report::{Locale, StatusColor, StatusFilter};
