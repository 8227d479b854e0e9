use serde::Deserialize;
use vorcheck_core::SourceFormat;

use crate::error::ReconError;
use crate::heuristics::ColumnOverrides;
use crate::model::{MatchMode, Status, Threshold};
use crate::report::{Locale, StatusFilter};

// ---------------------------------------------------------------------------
// Top-level job
// ---------------------------------------------------------------------------

/// A saved comparison: two documents plus the options of one run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconJob {
    #[serde(default = "default_name")]
    pub name: String,
    /// Falls back to the user setting when absent.
    #[serde(default)]
    pub match_by: Option<MatchMode>,
    /// Whole percent, 0..=100. Falls back to the user setting when absent.
    #[serde(default)]
    pub threshold: Option<i64>,
    pub estimate: SideConfig,
    pub boq: SideConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "comparison".to_string()
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// One input document and optional column overrides (name or 1-based position).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SideConfig {
    pub file: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
}

impl SideConfig {
    pub fn overrides(&self) -> ColumnOverrides {
        ColumnOverrides {
            key: self.key.clone(),
            name: self.name.clone(),
            quantity: self.quantity.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub xlsx: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
    /// Statuses shown in the terminal table. Empty shows all.
    #[serde(default)]
    pub statuses: Vec<Status>,
    #[serde(default)]
    pub locale: Option<Locale>,
}

impl OutputConfig {
    pub fn status_filter(&self) -> StatusFilter {
        StatusFilter::from_statuses(self.statuses.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconJob {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let job: ReconJob =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        job.validate()?;
        Ok(job)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if let Some(t) = self.threshold {
            if Threshold::new(t).is_err() {
                return Err(ReconError::ConfigValidation(format!(
                    "threshold must be between 0 and 100, got {t}"
                )));
            }
        }

        for (section, side) in [("estimate", &self.estimate), ("boq", &self.boq)] {
            if side.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "[{section}]: file must not be empty"
                )));
            }
            if SourceFormat::from_path(side.file.as_ref()).is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "[{section}]: unsupported file type '{}' (expected xlsx, xls, ods, csv, pdf, xml or html)",
                    side.file
                )));
            }
        }

        if let Some(ref xlsx) = self.output.xlsx {
            if xlsx.trim().is_empty() {
                return Err(ReconError::ConfigValidation(
                    "[output]: xlsx path must not be empty".into(),
                ));
            }
        }
        if let Some(ref json) = self.output.json {
            if json.trim().is_empty() {
                return Err(ReconError::ConfigValidation(
                    "[output]: json path must not be empty".into(),
                ));
            }
        }

        Ok(())
    }

    pub fn threshold_or(&self, default: Threshold) -> Threshold {
        self.threshold
            .and_then(|t| Threshold::new(t).ok())
            .unwrap_or(default)
    }

    pub fn match_by_or(&self, default: MatchMode) -> MatchMode {
        self.match_by.unwrap_or(default)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
