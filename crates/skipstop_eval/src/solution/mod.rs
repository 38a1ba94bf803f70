use std::sync::Arc;

use fxhash::FxHashMap;
use skipstop_assign::{AssignError, Line, OdMatrix, congested_assign, linear_assign};
use thiserror::Error;
use tracing::debug;

use crate::{
    instance::Instance,
    service::{Service, ServiceError, all_stop::AllStopService, limited_stop::LimitedStopService},
    stats::{Summary, summarize, summarize_matrix},
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolutionError {
    #[error("solution has been terminated")]
    Terminated,
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Assign(#[from] AssignError),
}

/// Arrays derived from the current design. Dropped on termination, which
/// doubles as the terminated flag.
#[derive(Debug, Clone)]
struct Derived {
    ttd: OdMatrix,
    flow: OdMatrix,
    rel_ttd: OdMatrix,
}

/// One candidate design under evaluation: the all-stop base service plus
/// the limited-stop overlay, re-scored eagerly after every mutation so
/// that reads never see stale data.
///
/// The objective is the demand-weighted total travel time normalized by
/// the instance baseline; 1.0 means no better than running the whole
/// fleet all-stop. A mutation whose re-score fails (for example a design
/// that strands demand) is rolled back completely before the error is
/// returned.
#[derive(Debug, Clone)]
pub struct Solution {
    instance: Arc<Instance>,
    allstop: AllStopService,
    limited: LimitedStopService,
    objective: f64,
    prev_objective: f64,
    derived: Option<Derived>,
}

impl Solution {
    /// Starts from the status quo: the whole fleet on the all-stop line,
    /// the overlay serving only the terminals with no buses.
    pub fn new(instance: Arc<Instance>) -> Self {
        let mut allstop = AllStopService::new(
            instance.nbuses(),
            instance.travel_time().clone(),
            instance.capacity(),
        );
        allstop.store_flow(instance.base_segment_flow().to_vec());

        let limited =
            LimitedStopService::new(0, instance.travel_time().clone(), instance.capacity());

        let derived = Derived {
            ttd: instance.base_ttd().clone(),
            flow: instance.base_flow().clone(),
            rel_ttd: OdMatrix::upper_ones(instance.nstops()),
        };

        Self {
            instance,
            allstop,
            limited,
            objective: 1.0,
            prev_objective: 1.0,
            derived: Some(derived),
        }
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn allstop(&self) -> &AllStopService {
        &self.allstop
    }

    pub fn limited(&self) -> &LimitedStopService {
        &self.limited
    }

    /// Current normalized objective.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Objective before the most recent successful mutation, for delta
    /// based accept/reject decisions.
    pub fn prev_objective(&self) -> f64 {
        self.prev_objective
    }

    pub fn is_terminated(&self) -> bool {
        self.derived.is_none()
    }

    /// Door-to-door time per OD pair for the current design.
    pub fn ttd(&self) -> Result<&OdMatrix, SolutionError> {
        Ok(&self.active()?.ttd)
    }

    /// In-vehicle flow of both services embedded on corridor stop pairs.
    pub fn flow(&self) -> Result<&OdMatrix, SolutionError> {
        Ok(&self.active()?.flow)
    }

    /// Travel time relative to the all-stop baseline, per OD pair.
    pub fn rel_ttd(&self) -> Result<&OdMatrix, SolutionError> {
        Ok(&self.active()?.rel_ttd)
    }

    /// Flips one overlay stop and re-scores the design.
    pub fn toggle(&mut self, stop: usize) -> Result<(), SolutionError> {
        self.active()?;

        let saved_flow = self.limited.invehicle_flow().to_vec();
        self.limited.toggle(stop)?;

        if let Err(err) = self.rescore() {
            self.limited.toggle(stop)?;
            self.limited.store_flow(saved_flow);
            return Err(err);
        }
        Ok(())
    }

    /// Moves one bus from the all-stop service to the overlay and
    /// re-scores the design. Fails when the all-stop service has no bus
    /// left to give.
    pub fn add_bus(&mut self) -> Result<(), SolutionError> {
        self.active()?;

        self.allstop.remove_bus()?;
        self.limited.add_bus();

        if let Err(err) = self.rescore() {
            self.limited.remove_bus();
            self.allstop.add_bus();
            return Err(err);
        }
        Ok(())
    }

    /// Summaries of the current design, keyed by metric: `"ttd"`,
    /// `"rel_ttd"`, `"load_factor"` and `"express_flow_share"`.
    pub fn stats(&self) -> Result<FxHashMap<&'static str, Summary>, SolutionError> {
        let derived = self.active()?;

        let mut stats = FxHashMap::default();
        stats.insert("ttd", summarize_matrix(&derived.ttd, true));
        stats.insert("rel_ttd", summarize_matrix(&derived.rel_ttd, true));
        stats.insert("load_factor", self.load_factor_summary());
        stats.insert(
            "express_flow_share",
            Summary::of_scalar(self.express_flow_share()),
        );
        Ok(stats)
    }

    /// Share of all in-vehicle flow riding the overlay; zero while the
    /// overlay is degenerate.
    pub fn express_flow_share(&self) -> f64 {
        if !self.limited.is_valid() {
            return 0.0;
        }
        let express: f64 = self.limited.invehicle_flow().iter().sum();
        let total: f64 = express + self.allstop.invehicle_flow().iter().sum::<f64>();
        express / total
    }

    /// Ends the evaluation and drops the per-design arrays. Idempotent.
    /// The scalar objectives stay readable; matrix reads and mutations
    /// fail from here on.
    pub fn terminate(&mut self) {
        if self.derived.take().is_some() {
            self.prev_objective = self.objective;
            debug!(objective = self.objective, "solution terminated");
        }
    }

    fn active(&self) -> Result<&Derived, SolutionError> {
        self.derived.as_ref().ok_or(SolutionError::Terminated)
    }

    /// Re-derives every dependent quantity from the current services.
    /// Commits all-or-nothing: on error the previous arrays and
    /// objectives are untouched.
    fn rescore(&mut self) -> Result<(), SolutionError> {
        if !self.limited.is_valid() {
            // Degenerate overlay: scored as the unmodified corridor no
            // matter how the fleet is currently split.
            self.allstop
                .store_flow(self.instance.base_segment_flow().to_vec());
            self.limited
                .store_flow(vec![0.0; self.limited.num_segments()]);

            self.prev_objective = self.objective;
            self.objective = 1.0;
            self.derived = Some(Derived {
                ttd: self.instance.base_ttd().clone(),
                flow: self.instance.base_flow().clone(),
                rel_ttd: OdMatrix::upper_ones(self.instance.nstops()),
            });
            return Ok(());
        }

        let ass_stops = self.allstop.stops();
        let lss_stops = self.limited.stops();
        let lines = [
            Line {
                stops: &ass_stops,
                frequency: self.allstop.frequency(),
            },
            Line {
                stops: &lss_stops,
                frequency: self.limited.frequency(),
            },
        ];

        let assignment = if self.instance.congested() {
            congested_assign(
                &lines,
                self.instance.travel_time(),
                self.instance.demand(),
                self.instance.capacity(),
                self.instance.max_iters(),
            )?
        } else {
            linear_assign(&lines, self.instance.travel_time(), self.instance.demand())?
        };

        let mut line_flows = assignment.line_flows;
        let lss_flow = line_flows.swap_remove(1);
        let ass_flow = line_flows.swap_remove(0);
        self.allstop.store_flow(ass_flow);
        self.limited.store_flow(lss_flow);

        let n = self.instance.nstops();
        let allstop_flow = self.allstop.invehicle_flow_matrix();
        let limited_flow = self.limited.invehicle_flow_matrix();
        let flow = OdMatrix::from_fn(n, |from, to| {
            allstop_flow.get(from, to) + limited_flow.get(from, to)
        });

        let base_ttd = self.instance.base_ttd();
        let rel_ttd = OdMatrix::from_fn(n, |from, to| {
            let base = base_ttd.get(from, to);
            if base != 0.0 {
                assignment.ttd.get(from, to) / base
            } else {
                0.0
            }
        });

        self.prev_objective = self.objective;
        self.objective = assignment.total_time / self.instance.base_objective();
        self.derived = Some(Derived {
            ttd: assignment.ttd,
            flow,
            rel_ttd,
        });

        debug!(objective = self.objective, "design re-scored");
        Ok(())
    }

    fn load_factor_summary(&self) -> Summary {
        if !self.instance.congested() {
            // Without crowding feedback the load factor carries no signal.
            return Summary::NAN;
        }

        if !self.limited.is_valid() {
            let max_load = self.instance.base_max_load();
            return summarize(
                self.instance
                    .base_segment_flow()
                    .iter()
                    .map(|flow| flow / max_load),
                true,
            );
        }

        let allstop_max = self.allstop.max_load();
        let limited_max = self.limited.max_load();
        summarize(
            self.allstop
                .invehicle_flow()
                .iter()
                .map(|flow| flow / allstop_max)
                .chain(
                    self.limited
                        .invehicle_flow()
                        .iter()
                        .map(|flow| flow / limited_max),
                ),
            true,
        )
    }
}
