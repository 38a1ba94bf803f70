use tracing::debug;

use crate::{
    error::AssignError,
    line::Line,
    linear::{Assignment, assign_flows, base_leg_times, check_inputs, line_geometries},
    matrix::OdMatrix,
};

/// BPR crowding coefficients: a leg at its line's capacity runs
/// `1 + ALPHA` times its uncrowded time.
const BPR_ALPHA: f64 = 0.15;
const BPR_BETA: f64 = 4.0;

/// Convergence gap per unit of demand.
const RELATIVE_TOLERANCE: f64 = 1e-6;

/// Common-lines assignment with crowding, solved by the method of
/// successive averages.
///
/// Each iteration reassigns all demand against leg times inflated by the
/// current average flows, then blends the fresh flows into the average
/// with step `1/k`. Stops when the largest flow change falls below
/// `RELATIVE_TOLERANCE` times total demand, or after `max_iters`
/// iterations. Overloaded legs are slowed, never refused, so the result
/// is defined even for infeasible capacities.
///
/// `capacity` is passengers per vehicle; a line's segment capacity per
/// unit time is `frequency * capacity`.
pub fn congested_assign(
    lines: &[Line],
    travel_time: &OdMatrix,
    demand: &OdMatrix,
    capacity: f64,
    max_iters: usize,
) -> Result<Assignment, AssignError> {
    check_inputs(lines, travel_time, demand)?;
    if max_iters == 0 {
        return Err(AssignError::InvalidMaxIters);
    }

    let geometries = line_geometries(lines, travel_time.n());
    let base_times = base_leg_times(lines, travel_time);
    let max_loads: Vec<f64> = lines.iter().map(|line| line.frequency * capacity).collect();

    let total_demand: f64 = demand.upper_triangle().map(|(_, _, volume)| volume).sum();
    let tolerance = RELATIVE_TOLERANCE * total_demand;

    // Iteration 1 is the uncrowded loading, so the average starts there.
    let mut average = assign_flows(lines, &geometries, demand, &base_times)?.line_flows;

    for iteration in 2..=max_iters {
        let crowded = crowded_leg_times(&base_times, &average, &max_loads);
        let fresh = assign_flows(lines, &geometries, demand, &crowded)?.line_flows;

        let step = 1.0 / iteration as f64;
        let mut gap = 0.0f64;
        for (average_line, fresh_line) in average.iter_mut().zip(&fresh) {
            for (average_flow, &fresh_flow) in average_line.iter_mut().zip(fresh_line) {
                gap = gap.max((fresh_flow - *average_flow).abs());
                *average_flow += step * (fresh_flow - *average_flow);
            }
        }

        if gap <= tolerance {
            debug!(iteration, gap, "congested assignment converged");
            break;
        }
        if iteration == max_iters {
            debug!(max_iters, gap, "congested assignment hit iteration cap");
        }
    }

    // Travel times consistent with the averaged flows; the flows of this
    // final loading are discarded in favour of the averages.
    let crowded = crowded_leg_times(&base_times, &average, &max_loads);
    let mut out = assign_flows(lines, &geometries, demand, &crowded)?;
    out.line_flows = average;
    Ok(out)
}

fn crowded_leg_times(
    base_times: &[Vec<f64>],
    flows: &[Vec<f64>],
    max_loads: &[f64],
) -> Vec<Vec<f64>> {
    base_times
        .iter()
        .zip(flows)
        .zip(max_loads)
        .map(|((legs, leg_flows), &max_load)| {
            legs.iter()
                .zip(leg_flows)
                .map(|(&time, &flow)| {
                    if max_load > 0.0 {
                        time * (1.0 + BPR_ALPHA * (flow / max_load).powf(BPR_BETA))
                    } else {
                        time
                    }
                })
                .collect()
        })
        .collect()
}
