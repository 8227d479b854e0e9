use std::collections::BTreeMap;

use crate::model::{
    JoinedRow, MatchMode, NormalizedRecord, ReconMeta, ReconResult, Status, Threshold,
};
use crate::normalize::NormalizeOutput;
use crate::summary::compute_summary;

/// Run parameters that end up in the result metadata.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub name: String,
    pub match_by: MatchMode,
    pub threshold: Threshold,
}

/// Reconcile two normalized sides. Returns joined rows + summary.
pub fn run(options: &RunOptions, estimate: &NormalizeOutput, boq: &NormalizeOutput) -> ReconResult {
    let rows = reconcile(&estimate.records, &boq.records, options.threshold);
    let summary = compute_summary(&rows, &estimate.stats, &boq.stats);

    tracing::info!(
        "reconciled {} row(s): {} matched, {} diverged, {} missing in estimate, {} missing in BoQ",
        summary.total_rows,
        summary.matched,
        summary.diverged,
        summary.missing_in_a,
        summary.missing_in_b
    );

    ReconResult {
        meta: ReconMeta {
            name: options.name.clone(),
            match_by: options.match_by,
            threshold: options.threshold,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        rows,
    }
}

/// Full outer join on the canonical key.
///
/// Keys come out in ascending byte order. A key present several times on one
/// side yields every A x B combination, A rows outer, both in source order.
pub fn reconcile(
    estimate: &[NormalizedRecord],
    boq: &[NormalizedRecord],
    threshold: Threshold,
) -> Vec<JoinedRow> {
    let mut groups: BTreeMap<&str, (Vec<&NormalizedRecord>, Vec<&NormalizedRecord>)> =
        BTreeMap::new();
    for rec in estimate {
        groups.entry(rec.key.as_str()).or_default().0.push(rec);
    }
    for rec in boq {
        groups.entry(rec.key.as_str()).or_default().1.push(rec);
    }

    let mut rows = Vec::with_capacity(estimate.len().max(boq.len()));
    for (key, (left, right)) in groups {
        match (left.is_empty(), right.is_empty()) {
            (false, false) => {
                for a in &left {
                    for b in &right {
                        rows.push(joined(key, Some(a), Some(b), threshold));
                    }
                }
            }
            (false, true) => rows.extend(left.iter().map(|a| joined(key, Some(a), None, threshold))),
            (true, false) => rows.extend(right.iter().map(|b| joined(key, None, Some(b), threshold))),
            (true, true) => {}
        }
    }
    rows
}

fn joined(
    key: &str,
    a: Option<&NormalizedRecord>,
    b: Option<&NormalizedRecord>,
    threshold: Threshold,
) -> JoinedRow {
    let quantity_a = a.and_then(|r| r.quantity);
    let quantity_b = b.and_then(|r| r.quantity);
    let divergence_percent = divergence_percent(quantity_a, quantity_b);
    JoinedRow {
        key: key.to_string(),
        quantity_a,
        quantity_b,
        divergence_percent,
        status: classify(quantity_a, quantity_b, divergence_percent, threshold),
        row_a: a.map(|r| r.row),
        row_b: b.map(|r| r.row),
    }
}

/// `|qa - qb| / max(qa, qb) * 100`, rounded to 2 decimals.
///
/// A missing side counts as 0 in the difference but not in the max.
/// `None` when both are missing or the max is 0.
pub fn divergence_percent(qa: Option<f64>, qb: Option<f64>) -> Option<f64> {
    let maxq = match (qa, qb) {
        (None, None) => return None,
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (Some(a), Some(b)) => a.max(b),
    };
    if maxq == 0.0 {
        return None;
    }
    let diff = (qa.unwrap_or(0.0) - qb.unwrap_or(0.0)).abs();
    Some(round2(diff / maxq * 100.0))
}

/// Round to 2 decimal places, exact ties to even (`0.125` → `0.12`).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// First matching rule wins: missing A, missing B, over threshold, matched.
pub fn classify(
    qa: Option<f64>,
    qb: Option<f64>,
    divergence_percent: Option<f64>,
    threshold: Threshold,
) -> Status {
    if qa.is_none() {
        Status::MissingInA
    } else if qb.is_none() {
        Status::MissingInB
    } else if divergence_percent.is_some_and(|d| d > f64::from(threshold.percent())) {
        Status::Diverged
    } else {
        Status::Matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(key: &str, quantity: Option<f64>, row: usize) -> NormalizedRecord {
        NormalizedRecord { key: key.into(), quantity, row }
    }

    fn five() -> Threshold {
        Threshold::new(5).unwrap()
    }

    #[test]
    fn equal_quantities_match() {
        let rows = reconcile(&[rec("101", Some(10.0), 0)], &[rec("101", Some(10.0), 0)], five());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, Status::Matched);
        assert_eq!(rows[0].divergence_percent, Some(0.0));
    }

    #[test]
    fn double_quantity_diverges() {
        let rows = reconcile(&[rec("101", Some(10.0), 0)], &[rec("101", Some(20.0), 0)], five());
        assert_eq!(rows[0].divergence_percent, Some(50.0));
        assert_eq!(rows[0].status, Status::Diverged);
    }

    #[test]
    fn key_only_in_estimate_is_missing_in_boq() {
        let rows = reconcile(&[rec("101", Some(10.0), 0)], &[rec("202", Some(1.0), 0)], five());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "101");
        assert_eq!(rows[0].quantity_b, None);
        assert_eq!(rows[0].status, Status::MissingInB);
        assert_eq!(rows[0].divergence_percent, Some(100.0));
        assert_eq!(rows[0].row_b, None);
        assert_eq!(rows[1].key, "202");
        assert_eq!(rows[1].status, Status::MissingInA);
    }

    #[test]
    fn divergence_at_threshold_still_matches() {
        let rows = reconcile(&[rec("k", Some(100.0), 0)], &[rec("k", Some(95.0), 0)], five());
        assert_eq!(rows[0].divergence_percent, Some(5.0));
        assert_eq!(rows[0].status, Status::Matched);
    }

    #[test]
    fn zero_threshold_flags_any_difference() {
        let t = Threshold::new(0).unwrap();
        assert_eq!(classify(Some(1.0), Some(1.0), Some(0.0), t), Status::Matched);
        assert_eq!(classify(Some(1.0), Some(1.01), Some(0.99), t), Status::Diverged);
    }

    #[test]
    fn both_zero_has_no_divergence_and_matches() {
        assert_eq!(divergence_percent(Some(0.0), Some(0.0)), None);
        assert_eq!(classify(Some(0.0), Some(0.0), None, five()), Status::Matched);
    }

    #[test]
    fn missing_quantity_on_present_row() {
        // A row exists but its quantity could not be read.
        let rows = reconcile(&[rec("k", None, 3)], &[rec("k", Some(2.0), 7)], five());
        assert_eq!(rows[0].status, Status::MissingInA);
        assert_eq!(rows[0].row_a, Some(3));
        assert_eq!(rows[0].divergence_percent, Some(100.0));
    }

    #[test]
    fn duplicate_keys_cross_product() {
        let a = [rec("k", Some(1.0), 0), rec("k", Some(2.0), 1)];
        let b = [rec("k", Some(1.0), 0), rec("k", Some(3.0), 1), rec("k", Some(2.0), 2)];
        let rows = reconcile(&a, &b, five());
        assert_eq!(rows.len(), 6);
        let pairs: Vec<_> = rows.iter().map(|r| (r.row_a.unwrap(), r.row_b.unwrap())).collect();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn keys_sorted_ascending() {
        let a = [rec("b", Some(1.0), 0), rec("a", Some(1.0), 1)];
        let b = [rec("c", Some(1.0), 0)];
        let keys: Vec<_> = reconcile(&a, &b, five()).into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn rounding_half_away_from_zero() {
        assert_eq!(round2(33.333), 33.33);
        assert_eq!(round2(66.666), 66.67);
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(divergence_percent(Some(3.0), Some(2.0)), Some(33.33));
    }

    #[test]
    fn run_fills_meta_and_summary() {
        let estimate = NormalizeOutput {
            records: vec![rec("101", Some(10.0), 0), rec("102", Some(5.0), 1)],
            ..Default::default()
        };
        let boq = NormalizeOutput {
            records: vec![rec("101", Some(20.0), 0)],
            ..Default::default()
        };
        let options = RunOptions {
            name: "Корпус 2".into(),
            match_by: MatchMode::ByCode,
            threshold: five(),
        };
        let result = run(&options, &estimate, &boq);
        assert_eq!(result.meta.name, "Корпус 2");
        assert_eq!(result.meta.threshold.percent(), 5);
        assert!(!result.meta.run_at.is_empty());
        assert_eq!(result.summary.total_rows, 2);
        assert_eq!(result.summary.diverged, 1);
        assert_eq!(result.summary.missing_in_b, 1);
        assert!(!result.summary.is_clean());
    }
}
