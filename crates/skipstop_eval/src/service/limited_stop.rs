use fixedbitset::FixedBitSet;
use skipstop_assign::OdMatrix;

use super::{Service, ServiceError};

/// The express overlay. Calls only where a bit is set; the two corridor
/// terminals are pinned so the service always runs end to end.
#[derive(Debug, Clone)]
pub struct LimitedStopService {
    nstops: usize,
    nbuses: usize,
    travel_time: OdMatrix,
    capacity: f64,
    served: FixedBitSet,
    invehicle_flow: Vec<f64>,
}

impl LimitedStopService {
    /// Starts with only the terminals served.
    pub fn new(nbuses: usize, travel_time: OdMatrix, capacity: f64) -> Self {
        let nstops = travel_time.n();
        debug_assert!(nstops >= 2, "corridor needs at least two stops");

        let mut served = FixedBitSet::with_capacity(nstops);
        served.insert(0);
        served.insert(nstops - 1);

        Self {
            nstops,
            nbuses,
            travel_time,
            capacity,
            served,
            invehicle_flow: vec![0.0; 1],
        }
    }

    /// Flips whether `stop` is served. The terminals are rejected. The
    /// in-vehicle flow is reset to zeros since its segments no longer line
    /// up with the new stop set.
    pub fn toggle(&mut self, stop: usize) -> Result<(), ServiceError> {
        if stop >= self.nstops {
            return Err(ServiceError::OutOfRange {
                stop,
                nstops: self.nstops,
            });
        }
        if stop == 0 || stop == self.nstops - 1 {
            return Err(ServiceError::ProtectedStop { stop });
        }

        self.served.toggle(stop);
        self.invehicle_flow = vec![0.0; self.num_segments()];
        Ok(())
    }

    pub fn add_bus(&mut self) {
        self.nbuses += 1;
    }

    pub(crate) fn remove_bus(&mut self) {
        debug_assert!(self.nbuses > 0, "no bus to remove");
        self.nbuses -= 1;
    }

    /// Internal write path for flows whose length is right by construction.
    pub(crate) fn store_flow(&mut self, flow: Vec<f64>) {
        debug_assert_eq!(flow.len(), self.num_segments());
        self.invehicle_flow = flow;
    }

    /// One bit per corridor stop, set where the service calls.
    pub fn stops_binary(&self) -> &FixedBitSet {
        &self.served
    }
}

impl Service for LimitedStopService {
    fn nstops(&self) -> usize {
        self.nstops
    }

    fn nbuses(&self) -> usize {
        self.nbuses
    }

    fn capacity(&self) -> f64 {
        self.capacity
    }

    fn travel_time(&self) -> &OdMatrix {
        &self.travel_time
    }

    fn stops(&self) -> Vec<usize> {
        self.served.ones().collect()
    }

    fn is_valid(&self) -> bool {
        self.nbuses > 0 && !self.not_serving_any_stops()
    }

    fn not_serving_any_stops(&self) -> bool {
        // The terminals are always set, so two bits means no real calls.
        self.served.count_ones(..) == 2
    }

    fn is_serving(&self, stop: usize) -> Result<bool, ServiceError> {
        if stop >= self.nstops {
            return Err(ServiceError::OutOfRange {
                stop,
                nstops: self.nstops,
            });
        }
        Ok(self.served.contains(stop))
    }

    fn invehicle_flow(&self) -> &[f64] {
        &self.invehicle_flow
    }

    fn set_invehicle_flow(&mut self, flow: Vec<f64>) -> Result<(), ServiceError> {
        let expected = self.num_segments();
        if flow.len() != expected {
            return Err(ServiceError::FlowLengthMismatch {
                expected,
                got: flow.len(),
            });
        }
        self.invehicle_flow = flow;
        Ok(())
    }
}
