//! Column role detection.
//!
//! Column names are matched against a static, priority-ordered keyword table.
//! For each role the columns are scanned left to right and the first column
//! whose normalized name contains any keyword wins. Roles are resolved
//! independently, so one column may satisfy several roles.

use serde::Serialize;
use vorcheck_core::Table;

use crate::error::ColumnSelectionError;
use crate::model::{ColumnRole, MatchMode, Side};

const KEY_KEYWORDS: &[&str] = &[
    "шифр",
    "код",
    "обоснование",
    "номер",
    "code",
    "id",
    "number",
    "designation",
];

const NAME_KEYWORDS: &[&str] = &[
    "наименование",
    "название",
    "описание",
    "name",
    "description",
    "work item",
];

const QUANTITY_KEYWORDS: &[&str] = &[
    "количество",
    "кол-во",
    "кол.во",
    "объем",
    "объём",
    "qty",
    "quantity",
    "amount",
    "volume",
];

// ---------------------------------------------------------------------------
// Keyword table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable {
    key: Vec<String>,
    name: Vec<String>,
    quantity: Vec<String>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|k| k.to_string()).collect();
        Self {
            key: owned(KEY_KEYWORDS),
            name: owned(NAME_KEYWORDS),
            quantity: owned(QUANTITY_KEYWORDS),
        }
    }
}

impl KeywordTable {
    /// Built-in keywords followed by user-supplied ones.
    pub fn extended(key: &[String], name: &[String], quantity: &[String]) -> Self {
        let mut table = Self::default();
        let push = |dst: &mut Vec<String>, extra: &[String]| {
            for kw in extra {
                let kw = normalize_column_name(kw);
                if !kw.is_empty() && !dst.contains(&kw) {
                    dst.push(kw);
                }
            }
        };
        push(&mut table.key, key);
        push(&mut table.name, name);
        push(&mut table.quantity, quantity);
        table
    }

    pub fn keywords(&self, role: ColumnRole) -> &[String] {
        match role {
            ColumnRole::Key => &self.key,
            ColumnRole::Name => &self.name,
            ColumnRole::Quantity => &self.quantity,
        }
    }

    fn matches(&self, role: ColumnRole, normalized_name: &str) -> bool {
        self.keywords(role)
            .iter()
            .any(|kw| normalized_name.contains(kw.as_str()))
    }
}

fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Suggestion
// ---------------------------------------------------------------------------

/// Suggested column index per role. `None` means no column matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColumnRoleMapping {
    pub key: Option<usize>,
    pub name: Option<usize>,
    pub quantity: Option<usize>,
}

impl ColumnRoleMapping {
    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Key => self.key,
            ColumnRole::Name => self.name,
            ColumnRole::Quantity => self.quantity,
        }
    }
}

pub fn suggest_roles<S: AsRef<str>>(columns: &[S], keywords: &KeywordTable) -> ColumnRoleMapping {
    let normalized: Vec<String> = columns
        .iter()
        .map(|c| normalize_column_name(c.as_ref()))
        .collect();
    let first = |role| normalized.iter().position(|n| keywords.matches(role, n));

    ColumnRoleMapping {
        key: first(ColumnRole::Key),
        name: first(ColumnRole::Name),
        quantity: first(ColumnRole::Quantity),
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// User-chosen columns, each given as a column name or a 1-based position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOverrides {
    pub key: Option<String>,
    pub name: Option<String>,
    pub quantity: Option<String>,
}

/// Columns actually used for matching one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSelection {
    pub key: usize,
    pub quantity: usize,
}

/// Resolve the match column and the quantity column for one table.
///
/// `ByCode` matches on the key role, `ByName` on the name role. An override
/// beats the suggestion; a role with neither falls back to the first column.
pub fn select_columns(
    table: &Table,
    mapping: &ColumnRoleMapping,
    overrides: &ColumnOverrides,
    mode: MatchMode,
    side: Side,
) -> Result<ColumnSelection, ColumnSelectionError> {
    if table.column_count() == 0 {
        return Err(ColumnSelectionError::NoColumns { side });
    }

    let match_role = match mode {
        MatchMode::ByCode => ColumnRole::Key,
        MatchMode::ByName => ColumnRole::Name,
    };
    let match_override = match mode {
        MatchMode::ByCode => overrides.key.as_deref(),
        MatchMode::ByName => overrides.name.as_deref(),
    };

    let key = resolve(table, match_role, match_override, mapping, side)?;
    let quantity = resolve(
        table,
        ColumnRole::Quantity,
        overrides.quantity.as_deref(),
        mapping,
        side,
    )?;

    tracing::debug!(
        "{side}: matching on {:?}, quantity from {:?}",
        table.columns()[key],
        table.columns()[quantity]
    );
    Ok(ColumnSelection { key, quantity })
}

fn resolve(
    table: &Table,
    role: ColumnRole,
    requested: Option<&str>,
    mapping: &ColumnRoleMapping,
    side: Side,
) -> Result<usize, ColumnSelectionError> {
    match requested {
        Some(requested) => find_column(table, requested).ok_or_else(|| {
            ColumnSelectionError::UnknownColumn {
                side,
                role,
                requested: requested.to_string(),
                available: table.columns().to_vec(),
            }
        }),
        None => Ok(mapping.get(role).unwrap_or_else(|| {
            tracing::warn!(
                "{side}: no {role} column recognized, using first column {:?}",
                table.columns()[0]
            );
            0
        })),
    }
}

/// Exact name, then case-insensitive name, then 1-based position.
fn find_column(table: &Table, requested: &str) -> Option<usize> {
    let requested = requested.trim();
    if let Some(idx) = table.column_index(requested) {
        return Some(idx);
    }
    let folded = requested.to_lowercase();
    if let Some(idx) = table
        .columns()
        .iter()
        .position(|c| c.to_lowercase() == folded)
    {
        return Some(idx);
    }
    match requested.parse::<usize>() {
        Ok(pos) if pos >= 1 && pos <= table.column_count() => Some(pos - 1),
        _ => None,
    }
}
