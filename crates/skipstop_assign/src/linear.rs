use smallvec::SmallVec;

use crate::{error::AssignError, line::Line, matrix::OdMatrix};

/// Expected wait before boarding is `WAIT_FACTOR / combined frequency`
/// (exponential-headway assumption of the frequency-based model).
const WAIT_FACTOR: f64 = 1.0;

/// Result of loading one demand matrix onto a set of lines.
#[derive(Debug, Clone)]
pub struct Assignment {
    /// Expected door-to-door time (wait + ride) per OD pair, strict upper
    /// triangle. A pair with no demand and no serving line keeps a zero
    /// entry; a pair with demand and no serving line fails the assignment.
    pub ttd: OdMatrix,

    /// In-vehicle flow per line, one entry per consecutive-stop segment of
    /// that line.
    pub line_flows: Vec<Vec<f64>>,

    /// Demand-weighted total travel time over all OD pairs.
    pub total_time: f64,
}

/// Per-line lookup from corridor stop index to the stop's position on the
/// line, `None` where the line does not call.
pub(crate) struct LineGeometry {
    position_of: Vec<Option<usize>>,
}

impl LineGeometry {
    pub(crate) fn position_of(&self, stop: usize) -> Option<usize> {
        self.position_of[stop]
    }
}

pub(crate) fn line_geometries(lines: &[Line], nstops: usize) -> Vec<LineGeometry> {
    lines
        .iter()
        .map(|line| {
            let mut position_of = vec![None; nstops];
            for (position, &stop) in line.stops.iter().enumerate() {
                debug_assert!(stop < nstops, "line stop out of corridor range");
                position_of[stop] = Some(position);
            }
            LineGeometry { position_of }
        })
        .collect()
}

/// Uncrowded time of every line leg, taken straight from the travel-time
/// matrix.
pub(crate) fn base_leg_times(lines: &[Line], travel_time: &OdMatrix) -> Vec<Vec<f64>> {
    lines
        .iter()
        .map(|line| {
            line.stops
                .windows(2)
                .map(|leg| travel_time.get(leg[0], leg[1]))
                .collect()
        })
        .collect()
}

pub(crate) fn check_inputs(
    lines: &[Line],
    travel_time: &OdMatrix,
    demand: &OdMatrix,
) -> Result<(), AssignError> {
    if lines.is_empty() {
        return Err(AssignError::NoLines);
    }

    if travel_time.n() != demand.n() {
        return Err(AssignError::DimensionMismatch {
            travel_time_stops: travel_time.n(),
            demand_stops: demand.n(),
        });
    }

    Ok(())
}

/// Frequency-based common-lines assignment with uncrowded leg times.
///
/// Per OD pair, passengers consider every line calling at both stops,
/// build the attractive set greedily in ascending ride time while a line
/// still lowers the expected time `(WAIT_FACTOR + sum f*t) / sum f`, and
/// split in proportion to frequency. Line stops must be strictly ascending
/// corridor indices.
pub fn linear_assign(
    lines: &[Line],
    travel_time: &OdMatrix,
    demand: &OdMatrix,
) -> Result<Assignment, AssignError> {
    check_inputs(lines, travel_time, demand)?;

    let geometries = line_geometries(lines, travel_time.n());
    let leg_times = base_leg_times(lines, travel_time);

    assign_flows(lines, &geometries, demand, &leg_times)
}

struct Candidate {
    line: usize,
    from_position: usize,
    to_position: usize,
    ride: f64,
    frequency: f64,
}

/// One full demand loading with the given (possibly crowded) leg times.
pub(crate) fn assign_flows(
    lines: &[Line],
    geometries: &[LineGeometry],
    demand: &OdMatrix,
    leg_times: &[Vec<f64>],
) -> Result<Assignment, AssignError> {
    let n = demand.n();

    // Prefix sums per line so ride time between two positions is one
    // subtraction.
    let cumulative: Vec<Vec<f64>> = leg_times
        .iter()
        .map(|legs| {
            let mut cums = Vec::with_capacity(legs.len() + 1);
            let mut total = 0.0;
            cums.push(0.0);
            for &leg in legs {
                total += leg;
                cums.push(total);
            }
            cums
        })
        .collect();

    let mut line_flows: Vec<Vec<f64>> =
        leg_times.iter().map(|legs| vec![0.0; legs.len()]).collect();
    let mut ttd = vec![0.0; n * n];
    let mut total_time = 0.0;

    for from in 0..n {
        for to in from + 1..n {
            let volume = demand.get(from, to);
            debug_assert!(volume >= 0.0, "negative demand entry");

            let mut candidates: SmallVec<[Candidate; 4]> = SmallVec::new();
            for (index, line) in lines.iter().enumerate() {
                if line.frequency <= 0.0 {
                    continue;
                }

                let (Some(from_position), Some(to_position)) = (
                    geometries[index].position_of(from),
                    geometries[index].position_of(to),
                ) else {
                    continue;
                };

                debug_assert!(from_position < to_position, "line stops not ascending");
                candidates.push(Candidate {
                    line: index,
                    from_position,
                    to_position,
                    ride: cumulative[index][to_position] - cumulative[index][from_position],
                    frequency: line.frequency,
                });
            }

            if candidates.is_empty() {
                if volume > 0.0 {
                    return Err(AssignError::UnservedDemand { from, to });
                }
                continue;
            }

            candidates.sort_by(|a, b| a.ride.total_cmp(&b.ride));

            // Attractive set: keep adding lines while their ride time stays
            // below the expected time of the set built so far.
            let mut combined_frequency = 0.0;
            let mut weighted_ride = 0.0;
            let mut expected = f64::INFINITY;
            let mut attractive = 0;
            for candidate in &candidates {
                if candidate.ride >= expected {
                    break;
                }
                combined_frequency += candidate.frequency;
                weighted_ride += candidate.frequency * candidate.ride;
                expected = (WAIT_FACTOR + weighted_ride) / combined_frequency;
                attractive += 1;
            }

            ttd[from * n + to] = expected;
            total_time += volume * expected;

            if volume > 0.0 {
                for candidate in &candidates[..attractive] {
                    let share = volume * candidate.frequency / combined_frequency;
                    for segment in candidate.from_position..candidate.to_position {
                        line_flows[candidate.line][segment] += share;
                    }
                }
            }
        }
    }

    Ok(Assignment {
        ttd: OdMatrix::from_flat(n, ttd),
        line_flows,
        total_time,
    })
}
