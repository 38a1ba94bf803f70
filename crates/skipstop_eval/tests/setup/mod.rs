use std::sync::Arc;

use fxhash::FxHashMap;
use skipstop_assign::OdMatrix;
use skipstop_eval::{instance::Instance, stats::Summary};

/// Corridor where every pairwise leg is run time plus one dwell, so a leg
/// between adjacent stops costs 2.0 and skipping a stop saves a dwell.
pub fn dwell_corridor(nstops: usize, run: f64, dwell: f64) -> OdMatrix {
    OdMatrix::from_fn(nstops, |from, to| {
        if from < to {
            (to - from) as f64 * run + dwell
        } else {
            0.0
        }
    })
}

pub fn unit_demand(nstops: usize) -> OdMatrix {
    OdMatrix::from_fn(nstops, |from, to| if from < to { 1.0 } else { 0.0 })
}

/// Five stops, adjacent legs of 2.0 (1.5 run + 0.5 dwell), three buses,
/// capacity 50, no crowding feedback.
pub fn five_stop_instance() -> Arc<Instance> {
    Arc::new(
        Instance::new(
            dwell_corridor(5, 1.5, 0.5),
            unit_demand(5),
            3,
            50.0,
            false,
            10_000,
            "five-stop".into(),
        )
        .unwrap(),
    )
}

/// Same corridor with crowding feedback and enough demand for the load
/// factors to matter.
pub fn congested_five_stop_instance() -> Arc<Instance> {
    let demand = OdMatrix::from_fn(5, |from, to| if from < to { 5.0 } else { 0.0 });
    Arc::new(
        Instance::new(
            dwell_corridor(5, 1.5, 0.5),
            demand,
            3,
            50.0,
            true,
            10_000,
            "five-stop-congested".into(),
        )
        .unwrap(),
    )
}

/// Single-bus variant used to exercise fleet exhaustion and rollback.
pub fn one_bus_instance() -> Arc<Instance> {
    Arc::new(
        Instance::new(
            dwell_corridor(5, 1.5, 0.5),
            unit_demand(5),
            1,
            50.0,
            false,
            10_000,
            "one-bus".into(),
        )
        .unwrap(),
    )
}

/// Equality over stats maps where NaN entries (undefined metrics) count
/// as equal to each other.
pub fn assert_stats_eq(
    left: &FxHashMap<&'static str, Summary>,
    right: &FxHashMap<&'static str, Summary>,
) {
    assert_eq!(left.len(), right.len());
    for (metric, lhs) in left {
        let rhs = right
            .get(metric)
            .unwrap_or_else(|| panic!("metric {metric} missing from right-hand stats"));
        let pairs = [
            (lhs.min, rhs.min),
            (lhs.mean, rhs.mean),
            (lhs.max, rhs.max),
            (lhs.sum, rhs.sum),
        ];
        for (l, r) in pairs {
            assert!(
                l == r || (l.is_nan() && r.is_nan()),
                "metric {metric} differs: {l} vs {r}"
            );
        }
    }
}
