use skipstop_assign::{OdMatrix, trip_time};
use thiserror::Error;

pub mod all_stop;
pub mod limited_stop;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    #[error("stop {stop} is outside the corridor of {nstops} stops")]
    OutOfRange { stop: usize, nstops: usize },
    #[error("stop {stop} is a terminal and cannot be toggled")]
    ProtectedStop { stop: usize },
    #[error("cannot remove a bus from a service with none")]
    NoBusesLeft,
    #[error("in-vehicle flow has {got} segments but the service has {expected}")]
    FlowLengthMismatch { expected: usize, got: usize },
}

/// Behaviour shared by the two services running on a corridor.
///
/// A service is a stop set, a bus count and a reference to the corridor
/// travel-time matrix; trip time, frequency and load limit derive from
/// those. The travel-time matrix is shared storage owned by the instance,
/// never copied or mutated here.
pub trait Service {
    fn nstops(&self) -> usize;

    fn nbuses(&self) -> usize;

    fn capacity(&self) -> f64;

    fn travel_time(&self) -> &OdMatrix;

    /// Served stops in ascending corridor order.
    fn stops(&self) -> Vec<usize>;

    /// True once the configuration can run a meaningful trip.
    fn is_valid(&self) -> bool;

    /// True while the stop set is too thin to carry anyone.
    fn not_serving_any_stops(&self) -> bool;

    fn is_serving(&self, stop: usize) -> Result<bool, ServiceError>;

    /// Passengers on board between consecutive served stops, one entry per
    /// segment. Written back by the owning solution after each assignment.
    fn invehicle_flow(&self) -> &[f64];

    fn set_invehicle_flow(&mut self, flow: Vec<f64>) -> Result<(), ServiceError>;

    fn last_stop(&self) -> usize {
        self.nstops() - 1
    }

    /// Number of consecutive-stop legs the service runs.
    fn num_segments(&self) -> usize {
        self.stops().len().saturating_sub(1)
    }

    /// Time to run the current stop sequence end to end.
    fn trip_time(&self) -> f64 {
        trip_time(self.travel_time(), &self.stops())
    }

    /// Departures per unit time. Zero while the service cannot run.
    fn frequency(&self) -> f64 {
        let trip_time = self.trip_time();
        if self.nbuses() == 0 || trip_time <= 0.0 {
            return 0.0;
        }
        self.nbuses() as f64 / trip_time
    }

    /// Largest passenger flow the service can move per unit time.
    fn max_load(&self) -> f64 {
        self.frequency() * self.capacity()
    }

    /// Embeds the per-segment flow into a corridor-sized matrix, one entry
    /// per served leg at `(stop, next served stop)`. Always a fresh copy,
    /// so callers may aggregate across services without aliasing.
    fn invehicle_flow_matrix(&self) -> OdMatrix {
        let n = self.nstops();
        let stops = self.stops();
        let mut values = vec![0.0; n * n];
        for (leg, &volume) in stops.windows(2).zip(self.invehicle_flow()) {
            values[leg[0] * n + leg[1]] = volume;
        }
        OdMatrix::from_flat(n, values)
    }
}
