use thiserror::Error;

use crate::model::{ColumnRole, Side};

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad threshold, missing file, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Divergence threshold outside 0..=100.
    #[error("threshold must be between 0 and 100, got {0}")]
    InvalidThreshold(i64),
    /// Unknown status name in a filter.
    #[error("unknown status: {0:?} (expected matched, diverged, missing_in_a or missing_in_b)")]
    UnknownStatus(String),
}

/// A role required to proceed has no valid column.
#[derive(Debug, Error)]
pub enum ColumnSelectionError {
    #[error("{side}: table has no columns")]
    NoColumns { side: Side },

    #[error("{side}: no column {requested:?} for {role} (available: {})", available.join(", "))]
    UnknownColumn {
        side: Side,
        role: ColumnRole,
        requested: String,
        available: Vec<String>,
    },
}

impl ColumnSelectionError {
    pub fn side(&self) -> Side {
        match self {
            Self::NoColumns { side } | Self::UnknownColumn { side, .. } => *side,
        }
    }
}
