//! Property tests for selection and forecasting invariants.
//!
//! Uses proptest to verify:
//! 1. Temporal validity: every returned peer was listed and reported in time
//! 2. Ordering: returned peers are sorted by valuation distance
//! 3. Output length: walk-forward emits len - window records
//! 4. Causality: changing data after a cut never changes earlier forecasts
//! 5. Skill: forecasting the actuals exactly always yields a unit score

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use peervol_core::walk_forward::FeatureFrame;
use peervol_core::{
    evaluate, forecast, select_peers, EntityRecord, ForecastConfig, ForecastRecord,
    SelectionConfig, Series,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
}

fn arb_entity(i: usize) -> impl Strategy<Value = EntityRecord> {
    (
        0i64..3650,
        prop::sample::select(vec!["10", "45"]),
        1.0..500.0_f64,
        prop::collection::vec(0i64..3650, 0..3),
    )
        .prop_map(move |(listed, sector, valuation, reports)| {
            let mut e = EntityRecord::new(
                format!("E{i:03}"),
                base_date() + Duration::days(listed),
                sector,
                valuation,
            );
            for r in reports {
                e = e.with_report_date(base_date() + Duration::days(r));
            }
            e
        })
}

fn arb_universe() -> impl Strategy<Value = Vec<EntityRecord>> {
    (2usize..40).prop_flat_map(|n| (0..n).map(arb_entity).collect::<Vec<_>>())
}

fn arb_path(n: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.001..0.08_f64, n)
}

fn to_series(values: &[f64]) -> Series {
    Series::from_points(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (base_date() + Duration::days(i as i64), *v)),
    )
    .unwrap()
}

// ── 1–2. Peer selection ──────────────────────────────────────────────

proptest! {
    #[test]
    fn peers_are_temporally_valid(universe in arb_universe(), pick in any::<prop::sample::Index>()) {
        let target = &universe[pick.index(universe.len())];
        let peers = select_peers(&universe, &target.ticker, 10, &SelectionConfig::default()).unwrap();
        let cutoff = target.listing_date - Duration::days(45);

        prop_assert!(peers.len() <= 10);
        for p in &peers {
            let rec = universe.iter().find(|e| &e.ticker == p).unwrap();
            prop_assert_ne!(&rec.ticker, &target.ticker);
            prop_assert_eq!(&rec.sector, &target.sector);
            prop_assert!(rec.listing_date < target.listing_date);
            prop_assert!(rec.latest_report_date().unwrap() < cutoff);
        }
    }

    #[test]
    fn peers_are_sorted_by_distance(universe in arb_universe(), pick in any::<prop::sample::Index>()) {
        let target = &universe[pick.index(universe.len())];
        let peers = select_peers(&universe, &target.ticker, 40, &SelectionConfig::default()).unwrap();
        let distances: Vec<f64> = peers
            .iter()
            .map(|p| {
                let rec = universe.iter().find(|e| &e.ticker == p).unwrap();
                (rec.valuation - target.valuation).abs()
            })
            .collect();
        for w in distances.windows(2) {
            prop_assert!(w[0] <= w[1]);
        }
    }
}

// ── 3–4. Walk-forward ────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn output_length_is_rows_minus_window(
        (actual, peer) in (12usize..60).prop_flat_map(|n| (arb_path(n), arb_path(n))),
        window in 2usize..10,
    ) {
        let a = to_series(&actual);
        let p = to_series(&peer);
        let rows = FeatureFrame::build(&a, &p).len();
        let records = forecast(&a, &p, window, &ForecastConfig::default()).unwrap();
        prop_assert_eq!(records.len(), rows - window);
    }

    #[test]
    fn later_data_never_changes_earlier_forecasts(
        (actual, peer, noise) in (20usize..60)
            .prop_flat_map(|n| (arb_path(n), arb_path(n), arb_path(n))),
        cut_frac in 0.3..0.9_f64,
    ) {
        let window = 5;
        let n = actual.len();
        let cut = ((n as f64) * cut_frac) as usize;
        prop_assume!(cut > window + 1);

        // Replace every value at or after `cut` with unrelated noise.
        let mut actual2 = actual.clone();
        let mut peer2 = peer.clone();
        actual2[cut..].copy_from_slice(&noise[cut..]);
        peer2[cut..].copy_from_slice(&noise[..n - cut]);

        let a = forecast(&to_series(&actual), &to_series(&peer), window, &ForecastConfig::default()).unwrap();
        let b = forecast(&to_series(&actual2), &to_series(&peer2), window, &ForecastConfig::default()).unwrap();

        // Raw positions < cut map to aligned rows < cut - 1.
        let shared = cut - 1 - window;
        prop_assert_eq!(&a[..shared], &b[..shared]);
    }
}

// ── 5. Skill ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn exact_forecast_has_unit_skill(values in prop::collection::vec(0.001..0.1_f64, 2..50)) {
        let records: Vec<ForecastRecord> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| ForecastRecord {
                timestamp: base_date() + Duration::days(i as i64),
                actual: v,
                forecast: v,
            })
            .collect();
        match evaluate(&records) {
            Ok(report) => {
                prop_assert_eq!(report.model_error, 0.0);
                prop_assert_eq!(report.skill_score, 1.0);
            }
            // Only when every consecutive pair is equal.
            Err(_) => prop_assert!(values.windows(2).all(|w| w[0] == w[1])),
        }
    }
}
