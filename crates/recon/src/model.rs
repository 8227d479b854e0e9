use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Which side of the comparison a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Budget estimate (side A).
    Estimate,
    /// Bill of quantities (side B).
    Boq,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Estimate => write!(f, "estimate"),
            Self::Boq => write!(f, "bill of quantities"),
        }
    }
}

/// How rows are matched across the two documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Rate code (шифр расценки), compared after trimming.
    #[default]
    ByCode,
    /// Work item name, compared after trimming and lowercasing.
    ByName,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ByCode => "by_code",
            Self::ByName => "by_name",
        }
    }
}

/// Divergence tolerance in whole percent, 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Threshold(u8);

impl Threshold {
    pub const DEFAULT: Threshold = Threshold(5);

    pub fn new(percent: i64) -> Result<Self, ReconError> {
        match u8::try_from(percent) {
            Ok(p) if p <= 100 => Ok(Self(p)),
            _ => Err(ReconError::InvalidThreshold(percent)),
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Threshold {
    type Error = ReconError;

    fn try_from(percent: i64) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

impl From<Threshold> for u8 {
    fn from(t: Threshold) -> u8 {
        t.0
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Role a column can play in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Key,
    Name,
    Quantity,
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key => write!(f, "key"),
            Self::Name => write!(f, "name"),
            Self::Quantity => write!(f, "quantity"),
        }
    }
}

/// One source row reduced to what matching needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    /// Canonical key: trimmed, lowercased when matching by name. Never empty.
    pub key: String,
    pub quantity: Option<f64>,
    /// Index of the row in its source table.
    pub row: usize,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Matched,
    Diverged,
    MissingInA,
    MissingInB,
}

impl Status {
    pub const ALL: [Status; 4] = [Self::Matched, Self::Diverged, Self::MissingInA, Self::MissingInB];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Diverged => "diverged",
            Self::MissingInA => "missing_in_a",
            Self::MissingInB => "missing_in_b",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the outer join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRow {
    pub key: String,
    pub quantity_a: Option<f64>,
    pub quantity_b: Option<f64>,
    pub divergence_percent: Option<f64>,
    pub status: Status,
    /// Source row in the estimate table, if this key exists there.
    pub row_a: Option<usize>,
    /// Source row in the bill of quantities, if this key exists there.
    pub row_b: Option<usize>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Normalization statistics for one side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SideStats {
    pub source_rows: usize,
    pub records: usize,
    /// Rows dropped because their key was empty.
    pub rows_without_key: usize,
    /// Rows kept whose quantity could not be parsed.
    pub unparsed_quantities: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total_rows: usize,
    pub matched: usize,
    pub diverged: usize,
    pub missing_in_a: usize,
    pub missing_in_b: usize,
    /// Keys that occur more than once on either side (cross-product rows).
    pub duplicate_keys: usize,
    pub estimate: SideStats,
    pub boq: SideStats,
}

impl ReconSummary {
    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Matched => self.matched,
            Status::Diverged => self.diverged,
            Status::MissingInA => self.missing_in_a,
            Status::MissingInB => self.missing_in_b,
        }
    }

    /// True when every row matched within the threshold.
    pub fn is_clean(&self) -> bool {
        self.diverged == 0 && self.missing_in_a == 0 && self.missing_in_b == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub name: String,
    pub match_by: MatchMode,
    pub threshold: Threshold,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub rows: Vec<JoinedRow>,
}
