// Property-based tests for the join, classification and key normalization.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use vorcheck_core::CellValue;
use vorcheck_recon::engine::{divergence_percent, reconcile, round2};
use vorcheck_recon::normalize::{normalize_key, parse_quantity_text};
use vorcheck_recon::{MatchMode, NormalizedRecord, Status, Threshold};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Quantity: mostly positive, sometimes zero, sometimes unreadable.
fn arb_quantity() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        4 => (0.001..10_000.0f64).prop_map(Some),
        1 => Just(Some(0.0)),
        1 => Just(None),
    ]
}

/// Records over a small key alphabet so that keys collide across and within sides.
fn arb_records(max: usize) -> impl Strategy<Value = Vec<NormalizedRecord>> {
    proptest::collection::vec((r"[A-C][0-2]", arb_quantity()), 0..=max).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(row, (key, quantity))| NormalizedRecord { key, quantity, row })
            .collect()
    })
}

fn arb_threshold() -> impl Strategy<Value = Threshold> {
    (0i64..=100).prop_map(|t| Threshold::new(t).unwrap())
}

// ---------------------------------------------------------------------------
// Join completeness
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn every_record_appears_in_some_joined_row(
        a in arb_records(12),
        b in arb_records(12),
        threshold in arb_threshold(),
    ) {
        let rows = reconcile(&a, &b, threshold);

        let seen_a: HashSet<usize> = rows.iter().filter_map(|r| r.row_a).collect();
        let seen_b: HashSet<usize> = rows.iter().filter_map(|r| r.row_b).collect();
        for rec in &a {
            prop_assert!(seen_a.contains(&rec.row), "estimate row {} lost", rec.row);
        }
        for rec in &b {
            prop_assert!(seen_b.contains(&rec.row), "BoQ row {} lost", rec.row);
        }

        // Cross-product size per key: max(1, |A|) * max(1, |B|) summed
        let keys: HashSet<&str> = a.iter().chain(&b).map(|r| r.key.as_str()).collect();
        let expected: usize = keys
            .iter()
            .map(|k| {
                let na = a.iter().filter(|r| r.key == *k).count().max(1);
                let nb = b.iter().filter(|r| r.key == *k).count().max(1);
                na * nb
            })
            .sum();
        prop_assert_eq!(rows.len(), expected);
    }
}

// ---------------------------------------------------------------------------
// Status rules
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn status_follows_priority_rules(
        a in arb_records(10),
        b in arb_records(10),
        threshold in arb_threshold(),
    ) {
        for r in reconcile(&a, &b, threshold) {
            let expected = if r.quantity_a.is_none() {
                Status::MissingInA
            } else if r.quantity_b.is_none() {
                Status::MissingInB
            } else if r.divergence_percent.is_some_and(|d| d > f64::from(threshold.percent())) {
                Status::Diverged
            } else {
                Status::Matched
            };
            prop_assert_eq!(r.status, expected, "key {}", r.key);
        }
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn divergence_is_deterministic(qa in 0.001..1e6f64, qb in 0.001..1e6f64) {
        let d1 = divergence_percent(Some(qa), Some(qb));
        let d2 = divergence_percent(Some(qa), Some(qb));
        prop_assert_eq!(d1, d2);
        prop_assert_eq!(d1, Some(round2((qa - qb).abs() / qa.max(qb) * 100.0)));
        let d = d1.unwrap();
        prop_assert!((0.0..=100.0).contains(&d));
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn raising_threshold_never_creates_divergence(
        a in arb_records(10),
        b in arb_records(10),
        t1 in 0i64..=100,
        gap in 0i64..=100,
    ) {
        let t2 = (t1 + gap).min(100);
        let low = reconcile(&a, &b, Threshold::new(t1).unwrap());
        let high = reconcile(&a, &b, Threshold::new(t2).unwrap());
        prop_assert_eq!(low.len(), high.len());

        for (l, h) in low.iter().zip(&high) {
            prop_assert_eq!(&l.key, &h.key);
            if l.status == Status::Matched {
                prop_assert_eq!(h.status, Status::Matched);
            }
            if h.status == Status::Diverged {
                prop_assert_eq!(l.status, Status::Diverged);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn key_normalization_is_idempotent(raw in r" {0,3}[A-Za-zА-Яа-я0-9 .\-]{0,20}[ \t]{0,3}") {
        for mode in [MatchMode::ByCode, MatchMode::ByName] {
            if let Some(once) = normalize_key(&CellValue::text(raw.clone()), mode) {
                prop_assert!(!once.is_empty());
                let twice = normalize_key(&CellValue::text(once.clone()), mode);
                prop_assert_eq!(Some(once), twice);
            }
        }
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn quantity_parse_accepts_decimal_comma(int in 0u32..100_000, frac in 0u32..1000) {
        let parsed = parse_quantity_text(&format!("{int},{frac:03} м²"));
        let expected: f64 = format!("{int}.{frac:03}").parse().unwrap();
        prop_assert_eq!(parsed, Some(expected));
    }
}
