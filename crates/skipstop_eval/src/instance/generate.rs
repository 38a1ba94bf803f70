use std::f64::consts::PI;

use rand::{Rng, rngs::SmallRng};
use skipstop_assign::OdMatrix;
use tracing::debug;

use super::{Instance, InstanceError, params::InstanceParams};

impl Instance {
    /// Draws a synthetic corridor: stop spacings within a band, a fleet
    /// sized so the all-stop headway lands between the configured bounds,
    /// and an OD demand surface of uniform noise plus a handful of
    /// bivariate peaks (commuter hot spots).
    pub fn random(
        params: &InstanceParams,
        rng: &mut SmallRng,
    ) -> Result<Instance, InstanceError> {
        check_params(params)?;

        let nstops = rng.random_range(params.min_stops..=params.max_stops);

        // Stop positions in meters along the corridor; every pairwise leg
        // time carries one dwell, so a skipped stop saves a dwell.
        let mut position = vec![0.0; nstops];
        for stop in 1..nstops {
            position[stop] =
                position[stop - 1] + rng.random_range(params.min_spacing..=params.max_spacing);
        }
        let travel_time = OdMatrix::from_fn(nstops, |from, to| {
            if from < to {
                (position[to] - position[from]) / 1000.0 / params.speed * 60.0 + params.dwell_time
            } else {
                0.0
            }
        });

        let ass_trip_time: f64 = (0..nstops - 1)
            .map(|stop| travel_time.get(stop, stop + 1))
            .sum();
        let min_buses = ((ass_trip_time / params.max_headway).ceil() as usize).max(1);
        let max_buses = ((ass_trip_time / params.min_headway).floor() as usize).max(min_buses);
        let nbuses = rng.random_range(min_buses..=max_buses);

        let demand = random_demand(params, nstops, rng);

        let name = format!("synthetic-{nstops:02}");
        debug!(nstops, nbuses, "drew synthetic corridor");

        Instance::new(
            travel_time,
            demand,
            nbuses,
            params.capacity,
            params.congested,
            params.max_iters,
            name,
        )
    }
}

fn random_demand(params: &InstanceParams, nstops: usize, rng: &mut SmallRng) -> OdMatrix {
    let mut rows: Vec<Vec<f64>> = (0..nstops)
        .map(|from| {
            (0..nstops)
                .map(|to| if from < to { rng.random::<f64>() } else { 0.0 })
                .collect()
        })
        .collect();

    if params.max_demand_peaks > 1 {
        for _ in 0..rng.random_range(1..params.max_demand_peaks) {
            add_demand_peak(params, nstops, rng, &mut rows);
        }
    }

    let raw = OdMatrix::from_rows(&rows);
    let peak = raw.upper_max();
    let scale = rng.random::<f64>() * params.capacity * params.max_od_demand;

    // Later origins have fewer destinations left, so their pairs get a
    // larger share to keep departures comparable along the corridor.
    OdMatrix::from_fn(nstops, |from, to| {
        if from < to && peak > 0.0 {
            raw.get(from, to) / peak * scale / (nstops + 1 - from) as f64
        } else {
            0.0
        }
    })
}

fn add_demand_peak(
    params: &InstanceParams,
    nstops: usize,
    rng: &mut SmallRng,
    rows: &mut [Vec<f64>],
) {
    let a = rng.random_range(1..=nstops);
    let b = rng.random_range(1..=nstops);
    let (mean_x, mean_y) = (a.min(b) as f64, a.max(b) as f64);

    let spread_x = rng.random::<f64>();
    let spread_y = rng.random::<f64>();
    let shared = rng.random::<f64>();
    // A near-zero draw collapses the peak to a point; keep it finite.
    let var_x = (spread_x * nstops as f64 / shared / params.demand_peak_conc).max(1e-9);
    let var_y = (spread_y * nstops as f64 / shared / params.demand_peak_conc).max(1e-9);

    let weight = rng.random::<f64>() * params.demand_peak_size;
    let norm = 1.0 / (2.0 * PI * (var_x * var_y).sqrt());

    for (from, row) in rows.iter_mut().enumerate() {
        for (to, value) in row.iter_mut().enumerate() {
            if from >= to {
                continue;
            }
            let dx = (from + 1) as f64 - mean_x;
            let dy = (to + 1) as f64 - mean_y;
            let density = norm * (-0.5 * (dx * dx / var_x + dy * dy / var_y)).exp();
            *value += weight * density;
        }
    }
}

fn check_params(params: &InstanceParams) -> Result<(), InstanceError> {
    if params.min_stops < 2 || params.min_stops > params.max_stops {
        return Err(InstanceError::BadParams { name: "stops" });
    }
    if params.min_spacing <= 0.0 || params.min_spacing > params.max_spacing {
        return Err(InstanceError::BadParams { name: "spacing" });
    }
    if params.min_headway <= 0.0 || params.min_headway > params.max_headway {
        return Err(InstanceError::BadParams { name: "headway" });
    }
    if params.speed <= 0.0 {
        return Err(InstanceError::BadParams { name: "speed" });
    }
    if params.dwell_time < 0.0 {
        return Err(InstanceError::BadParams { name: "dwell_time" });
    }
    if params.capacity <= 0.0 {
        return Err(InstanceError::BadParams { name: "capacity" });
    }
    if params.max_od_demand <= 0.0 {
        return Err(InstanceError::BadParams { name: "max_od_demand" });
    }
    if params.demand_peak_conc <= 0.0 || params.demand_peak_size < 0.0 {
        return Err(InstanceError::BadParams { name: "demand_peaks" });
    }
    if params.max_iters == 0 {
        return Err(InstanceError::BadParams { name: "max_iters" });
    }
    Ok(())
}
