use skipstop_assign::OdMatrix;

use super::{Service, ServiceError};

/// The base service, calling at every corridor stop. Its stop set never
/// changes; only its share of the fleet does.
#[derive(Debug, Clone)]
pub struct AllStopService {
    nstops: usize,
    nbuses: usize,
    travel_time: OdMatrix,
    capacity: f64,
    invehicle_flow: Vec<f64>,
}

impl AllStopService {
    pub fn new(nbuses: usize, travel_time: OdMatrix, capacity: f64) -> Self {
        let nstops = travel_time.n();
        debug_assert!(nstops >= 2, "corridor needs at least two stops");
        Self {
            nstops,
            nbuses,
            travel_time,
            capacity,
            invehicle_flow: vec![0.0; nstops - 1],
        }
    }

    /// Hands one bus back to the pool.
    pub fn remove_bus(&mut self) -> Result<(), ServiceError> {
        if self.nbuses == 0 {
            return Err(ServiceError::NoBusesLeft);
        }
        self.nbuses -= 1;
        Ok(())
    }

    pub(crate) fn add_bus(&mut self) {
        self.nbuses += 1;
    }

    /// Internal write path for flows whose length is right by construction.
    pub(crate) fn store_flow(&mut self, flow: Vec<f64>) {
        debug_assert_eq!(flow.len(), self.nstops - 1);
        self.invehicle_flow = flow;
    }
}

impl Service for AllStopService {
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
        (0..self.nstops).collect()
    }

    fn is_valid(&self) -> bool {
        self.nbuses > 0
    }

    fn not_serving_any_stops(&self) -> bool {
        false
    }

    fn is_serving(&self, stop: usize) -> Result<bool, ServiceError> {
        if stop >= self.nstops {
            return Err(ServiceError::OutOfRange {
                stop,
                nstops: self.nstops,
            });
        }
        Ok(true)
    }

    fn invehicle_flow(&self) -> &[f64] {
        &self.invehicle_flow
    }

    fn set_invehicle_flow(&mut self, flow: Vec<f64>) -> Result<(), ServiceError> {
        if flow.len() != self.nstops - 1 {
            return Err(ServiceError::FlowLengthMismatch {
                expected: self.nstops - 1,
                got: flow.len(),
            });
        }
        self.invehicle_flow = flow;
        Ok(())
    }
}
