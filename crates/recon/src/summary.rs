use std::collections::BTreeMap;

use crate::model::{JoinedRow, ReconSummary, SideStats, Status};

/// Compute summary statistics from joined rows.
pub fn compute_summary(rows: &[JoinedRow], estimate: &SideStats, boq: &SideStats) -> ReconSummary {
    let mut matched = 0;
    let mut diverged = 0;
    let mut missing_in_a = 0;
    let mut missing_in_b = 0;
    let mut per_key: BTreeMap<&str, usize> = BTreeMap::new();

    for r in rows {
        *per_key.entry(r.key.as_str()).or_insert(0) += 1;

        match r.status {
            Status::Matched => matched += 1,
            Status::Diverged => diverged += 1,
            Status::MissingInA => missing_in_a += 1,
            Status::MissingInB => missing_in_b += 1,
        }
    }

    let duplicate_keys = per_key.values().filter(|n| **n > 1).count();
    if duplicate_keys > 0 {
        tracing::warn!("{duplicate_keys} key(s) occur more than once; their rows are cross-joined");
    }

    ReconSummary {
        total_rows: rows.len(),
        matched,
        diverged,
        missing_in_a,
        missing_in_b,
        duplicate_keys,
        estimate: estimate.clone(),
        boq: boq.clone(),
    }
}
