use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    #[error("no lines to assign demand to")]
    NoLines,

    #[error("travel time is {travel_time_stops} stops but demand is {demand_stops}")]
    DimensionMismatch {
        travel_time_stops: usize,
        demand_stops: usize,
    },

    #[error("demand from stop {from} to stop {to} is served by no line")]
    UnservedDemand { from: usize, to: usize },

    #[error("congested assignment needs at least one iteration")]
    InvalidMaxIters,
}
