use std::fmt;

use serde::Serialize;
use skipstop_assign::{AssignError, Line, OdMatrix, congested_assign, linear_assign, trip_time};
use thiserror::Error;
use tracing::debug;

use crate::stats::{Summary, summarize, summarize_matrix};

mod generate;
pub mod params;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InstanceError {
    #[error("corridor needs at least two stops, got {nstops}")]
    TooFewStops { nstops: usize },
    #[error("travel time covers {travel_time_stops} stops but demand covers {demand_stops}")]
    ShapeMismatch {
        travel_time_stops: usize,
        demand_stops: usize,
    },
    #[error("fleet needs at least one bus")]
    EmptyFleet,
    #[error("capacity must be positive, got {capacity}")]
    BadCapacity { capacity: f64 },
    #[error("generation parameter {name} is out of range")]
    BadParams { name: &'static str },
    #[error("baseline assignment failed: {0}")]
    Baseline(#[from] AssignError),
}

/// One frozen evaluation problem: a corridor, its OD demand, a fleet, and
/// the all-stop baseline that every candidate design is scored against.
///
/// Instances are immutable once built and meant to be shared behind an
/// `Arc` by any number of solutions.
#[derive(Debug, Clone, Serialize)]
pub struct Instance {
    id: String,
    name: String,
    travel_time: OdMatrix,
    demand: OdMatrix,
    nbuses: usize,
    capacity: f64,
    congested: bool,
    max_iters: usize,
    ass_trip_time: f64,
    base_ttd: OdMatrix,
    base_flow: OdMatrix,
    base_segment_flow: Vec<f64>,
    base_objective: f64,
}

impl Instance {
    /// Freezes a problem and scores its baseline: the whole fleet on the
    /// all-stop line, no overlay.
    pub fn new(
        travel_time: OdMatrix,
        demand: OdMatrix,
        nbuses: usize,
        capacity: f64,
        congested: bool,
        max_iters: usize,
        name: String,
    ) -> Result<Self, InstanceError> {
        let nstops = travel_time.n();
        if nstops < 2 {
            return Err(InstanceError::TooFewStops { nstops });
        }
        if demand.n() != nstops {
            return Err(InstanceError::ShapeMismatch {
                travel_time_stops: nstops,
                demand_stops: demand.n(),
            });
        }
        if nbuses == 0 {
            return Err(InstanceError::EmptyFleet);
        }
        if !capacity.is_finite() || capacity <= 0.0 {
            return Err(InstanceError::BadCapacity { capacity });
        }

        let stops: Vec<usize> = (0..nstops).collect();
        let ass_trip_time = trip_time(&travel_time, &stops);
        let baseline = [Line {
            stops: &stops,
            frequency: nbuses as f64 / ass_trip_time,
        }];

        let out = if congested {
            congested_assign(&baseline, &travel_time, &demand, capacity, max_iters)?
        } else {
            linear_assign(&baseline, &travel_time, &demand)?
        };

        let mut line_flows = out.line_flows;
        let base_segment_flow = line_flows.swap_remove(0);
        let base_flow = OdMatrix::from_fn(nstops, |from, to| {
            if to == from + 1 {
                base_segment_flow[from]
            } else {
                0.0
            }
        });

        let id = calculate_id(&travel_time, &demand, nbuses, capacity);
        debug!(id = %id, nstops, nbuses, congested, "instance baseline scored");

        Ok(Self {
            id,
            name,
            travel_time,
            demand,
            nbuses,
            capacity,
            congested,
            max_iters,
            ass_trip_time,
            base_ttd: out.ttd,
            base_flow,
            base_segment_flow,
            base_objective: out.total_time,
        })
    }

    /// Short content hash of the problem data, stable across runs.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nstops(&self) -> usize {
        self.travel_time.n()
    }

    pub fn nbuses(&self) -> usize {
        self.nbuses
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn congested(&self) -> bool {
        self.congested
    }

    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    pub fn travel_time(&self) -> &OdMatrix {
        &self.travel_time
    }

    pub fn demand(&self) -> &OdMatrix {
        &self.demand
    }

    /// Trip time of the all-stop line over the whole corridor.
    pub fn ass_trip_time(&self) -> f64 {
        self.ass_trip_time
    }

    /// Baseline door-to-door times per OD pair.
    pub fn base_ttd(&self) -> &OdMatrix {
        &self.base_ttd
    }

    /// Baseline in-vehicle flow embedded on adjacent-stop pairs.
    pub fn base_flow(&self) -> &OdMatrix {
        &self.base_flow
    }

    /// Baseline in-vehicle flow per corridor segment.
    pub fn base_segment_flow(&self) -> &[f64] {
        &self.base_segment_flow
    }

    /// Demand-weighted total travel time of the baseline.
    pub fn base_objective(&self) -> f64 {
        self.base_objective
    }

    /// Flow the full fleet can carry per unit time on the all-stop line.
    pub fn base_max_load(&self) -> f64 {
        self.nbuses as f64 / self.ass_trip_time * self.capacity
    }
}

fn calculate_id(travel_time: &OdMatrix, demand: &OdMatrix, nbuses: usize, capacity: f64) -> String {
    let mut hasher = blake3::Hasher::new();
    for (_, _, value) in travel_time.upper_triangle() {
        hasher.update(&value.to_le_bytes());
    }
    for (_, _, value) in demand.upper_triangle() {
        hasher.update(&value.to_le_bytes());
    }
    hasher.update(&(nbuses as u64).to_le_bytes());
    hasher.update(&capacity.to_le_bytes());

    let mut id = hex::encode(hasher.finalize().as_bytes());
    id.truncate(10);
    id
}

fn row_sums(matrix: &OdMatrix) -> Vec<f64> {
    let mut sums = vec![0.0; matrix.n()];
    for (from, _, value) in matrix.upper_triangle() {
        sums[from] += value;
    }
    sums
}

fn col_sums(matrix: &OdMatrix) -> Vec<f64> {
    let mut sums = vec![0.0; matrix.n()];
    for (_, to, value) in matrix.upper_triangle() {
        sums[to] += value;
    }
    sums
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Instance  : {}", self.id)?;
        writeln!(f, "  Name      : {}", self.name)?;
        writeln!(f, "  Buses     : {}", self.nbuses)?;
        writeln!(f, "  Stops     : {}", self.nstops())?;
        writeln!(
            f,
            "  Headway   : {:.1} min",
            self.ass_trip_time / self.nbuses as f64
        )?;
        writeln!(f, "  Capacity  : {}", self.capacity)?;
        writeln!(f, "  Congested : {}", self.congested)?;
        writeln!(f, "  Objective : {:.4}", self.base_objective)?;
        writeln!(f)?;

        let load_factors = if self.congested {
            summarize(
                self.base_segment_flow
                    .iter()
                    .map(|flow| flow / self.nbuses as f64 / self.capacity * 100.0),
                false,
            )
        } else {
            Summary::NAN
        };

        writeln!(f, "  Stats (min/avg/max/sum)")?;
        stat_line(f, "OD Demand", summarize_matrix(&self.demand, true), "")?;
        stat_line(f, "Dep Demand", summarize(row_sums(&self.demand), true), "")?;
        stat_line(f, "Arr Demand", summarize(col_sums(&self.demand), true), "")?;
        stat_line(
            f,
            "Link Travel time",
            summarize_matrix(&self.travel_time, false),
            " (min)",
        )?;
        stat_line(
            f,
            "Time to dest",
            summarize_matrix(&self.base_ttd, true),
            " (min)",
        )?;
        stat_line(f, "Load factor", load_factors, " (%)")
    }
}

fn stat_line(f: &mut fmt::Formatter<'_>, label: &str, summary: Summary, unit: &str) -> fmt::Result {
    writeln!(
        f,
        "  {label:<18}: {:7.2} / {:7.2} / {:7.2} / {:8.2}{unit}",
        summary.min, summary.mean, summary.max, summary.sum
    )
}
