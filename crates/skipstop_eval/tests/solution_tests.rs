use std::sync::Arc;

use skipstop_assign::AssignError;
use skipstop_eval::{
    service::{Service, ServiceError},
    solution::{Solution, SolutionError},
    stats::summarize_matrix,
};

mod setup;

#[test]
fn test_initial_state_matches_the_baseline() {
    let instance = setup::five_stop_instance();
    let solution = Solution::new(Arc::clone(&instance));

    assert_eq!(solution.objective(), 1.0);
    assert_eq!(solution.prev_objective(), 1.0);
    assert_eq!(solution.allstop().nbuses(), 3);
    assert_eq!(solution.limited().nbuses(), 0);
    assert_eq!(solution.limited().stops(), vec![0, 4]);
    assert!(solution.limited().not_serving_any_stops());

    assert_eq!(solution.ttd().unwrap(), instance.base_ttd());
    assert_eq!(solution.flow().unwrap(), instance.base_flow());
    assert_eq!(solution.rel_ttd().unwrap().get(0, 1), 1.0);
    assert_eq!(solution.rel_ttd().unwrap().get(1, 0), 0.0);

    let stats = solution.stats().unwrap();
    assert_eq!(stats["ttd"], summarize_matrix(instance.base_ttd(), true));
    assert_eq!(stats["express_flow_share"].mean, 0.0);
    assert!(stats["load_factor"].mean.is_nan());
}

#[test]
fn test_travel_time_matrix_is_shared_not_copied() {
    let instance = setup::five_stop_instance();
    let solution = Solution::new(Arc::clone(&instance));

    assert!(
        solution
            .allstop()
            .travel_time()
            .shares_storage_with(instance.travel_time())
    );
    assert!(
        solution
            .limited()
            .travel_time()
            .shares_storage_with(instance.travel_time())
    );
}

#[test]
fn test_toggle_then_add_bus_activates_the_overlay() {
    let instance = setup::five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));
    let baseline_stats = solution.stats().unwrap();

    // Serving {0, 2, 4} skips two dwells, so the overlay trip is shorter
    // than the 8.0 all-stop round.
    solution.toggle(2).unwrap();
    assert_eq!(solution.limited().stops(), vec![0, 2, 4]);
    assert_eq!(solution.limited().trip_time(), 7.0);
    assert!(solution.limited().trip_time() < solution.allstop().trip_time());

    // Still no buses on the overlay: the design scores as the baseline.
    assert!(!solution.limited().is_valid());
    assert_eq!(solution.objective(), 1.0);
    setup::assert_stats_eq(&solution.stats().unwrap(), &baseline_stats);

    solution.add_bus().unwrap();
    assert_eq!(solution.allstop().nbuses(), 2);
    assert_eq!(solution.limited().nbuses(), 1);
    assert!(solution.limited().frequency() > 0.0);
    assert!(solution.limited().is_valid());

    assert_ne!(solution.objective(), 1.0);
    assert_eq!(solution.prev_objective(), 1.0);
    let stats = solution.stats().unwrap();
    assert_ne!(stats["ttd"], baseline_stats["ttd"]);
    assert!(stats["express_flow_share"].mean > 0.0);
}

#[test]
fn test_double_toggle_restores_stats_exactly() {
    let instance = setup::congested_five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));
    solution.toggle(2).unwrap();
    solution.add_bus().unwrap();

    let before = solution.stats().unwrap();
    let objective = solution.objective();
    let served_before: Vec<usize> = solution.limited().stops();

    solution.toggle(3).unwrap();
    assert_ne!(solution.stats().unwrap()["ttd"], before["ttd"]);

    solution.toggle(3).unwrap();
    assert_eq!(solution.limited().stops(), served_before);
    assert_eq!(solution.objective(), objective);
    setup::assert_stats_eq(&solution.stats().unwrap(), &before);
}

#[test]
fn test_is_serving_agrees_with_the_stop_bits() {
    let instance = setup::five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));
    solution.toggle(2).unwrap();
    solution.toggle(3).unwrap();

    for stop in 0..instance.nstops() {
        assert_eq!(
            solution.limited().is_serving(stop).unwrap(),
            solution.limited().stops_binary().contains(stop)
        );
        assert!(solution.allstop().is_serving(stop).unwrap());
    }
}

#[test]
fn test_allstop_stop_set_never_changes() {
    let instance = setup::five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));

    solution.toggle(2).unwrap();
    solution.add_bus().unwrap();
    solution.toggle(3).unwrap();

    assert_eq!(solution.allstop().stops(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_each_added_bus_raises_overlay_frequency_and_max_load() {
    let instance = setup::five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));
    solution.toggle(2).unwrap();

    solution.add_bus().unwrap();
    let frequency_one = solution.limited().frequency();
    let max_load_one = solution.limited().max_load();
    assert!(frequency_one > 0.0);

    solution.add_bus().unwrap();
    assert!(solution.limited().frequency() > frequency_one);
    assert!(solution.limited().max_load() > max_load_one);
    // the all-stop side gave those buses up
    assert_eq!(solution.allstop().nbuses(), 1);
}

#[test]
fn test_stats_reflect_every_mutation() {
    let instance = setup::congested_five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));

    solution.toggle(2).unwrap();
    solution.add_bus().unwrap();
    let first = solution.stats().unwrap();

    solution.add_bus().unwrap();
    let second = solution.stats().unwrap();
    assert_ne!(first["ttd"], second["ttd"]);
    assert_ne!(first["load_factor"], second["load_factor"]);
}

#[test]
fn test_rel_ttd_is_the_ratio_to_the_baseline() {
    let instance = setup::five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));
    solution.toggle(2).unwrap();
    solution.add_bus().unwrap();

    let ttd = solution.ttd().unwrap().clone();
    let rel = solution.rel_ttd().unwrap();
    for (from, to, value) in rel.upper_triangle() {
        let expected = ttd.get(from, to) / instance.base_ttd().get(from, to);
        assert!((value - expected).abs() < 1e-12);
    }
}

#[test]
fn test_mutation_errors_leave_the_solution_untouched() {
    let instance = setup::five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));
    solution.toggle(2).unwrap();
    solution.add_bus().unwrap();
    let before = solution.stats().unwrap();

    assert_eq!(
        solution.toggle(9).unwrap_err(),
        SolutionError::Service(ServiceError::OutOfRange { stop: 9, nstops: 5 })
    );
    assert_eq!(
        solution.toggle(0).unwrap_err(),
        SolutionError::Service(ServiceError::ProtectedStop { stop: 0 })
    );
    assert_eq!(
        solution.toggle(4).unwrap_err(),
        SolutionError::Service(ServiceError::ProtectedStop { stop: 4 })
    );

    setup::assert_stats_eq(&solution.stats().unwrap(), &before);
}

#[test]
fn test_draining_the_allstop_fleet_is_rolled_back() {
    let instance = setup::one_bus_instance();
    let mut solution = Solution::new(Arc::clone(&instance));
    solution.toggle(2).unwrap();
    let before = solution.stats().unwrap();

    // Moving the only bus would leave stop 1 unreachable: the overlay
    // skips it and the all-stop line would run no buses at all.
    let err = solution.add_bus().unwrap_err();
    assert_eq!(
        err,
        SolutionError::Assign(AssignError::UnservedDemand { from: 0, to: 1 })
    );

    assert_eq!(solution.allstop().nbuses(), 1);
    assert_eq!(solution.limited().nbuses(), 0);
    assert_eq!(solution.objective(), 1.0);
    setup::assert_stats_eq(&solution.stats().unwrap(), &before);

    // the design is still mutable after the rejected move
    solution.toggle(3).unwrap();
    assert_eq!(solution.limited().stops(), vec![0, 2, 3, 4]);
}

#[test]
fn test_moving_a_bus_to_a_degenerate_overlay_still_scores_baseline() {
    let instance = setup::one_bus_instance();
    let mut solution = Solution::new(Arc::clone(&instance));

    // No intermediate stops served, so the overlay stays invalid and the
    // design keeps the baseline score even with the fleet moved over.
    solution.add_bus().unwrap();
    assert_eq!(solution.allstop().nbuses(), 0);
    assert_eq!(solution.limited().nbuses(), 1);
    assert_eq!(solution.objective(), 1.0);

    // the pool is empty now
    assert_eq!(
        solution.add_bus().unwrap_err(),
        SolutionError::Service(ServiceError::NoBusesLeft)
    );
}

#[test]
fn test_congested_load_factors_are_defined() {
    let instance = setup::congested_five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));

    let baseline = solution.stats().unwrap();
    assert!(baseline["load_factor"].max > 0.0);

    solution.toggle(2).unwrap();
    solution.add_bus().unwrap();
    let stats = solution.stats().unwrap();
    assert!(stats["load_factor"].max > 0.0);
    assert!(stats["express_flow_share"].mean > 0.0);
    assert!(stats["express_flow_share"].mean < 1.0);
    assert_eq!(stats.len(), 4);
}

#[test]
fn test_terminate_freezes_the_solution() {
    let instance = setup::five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));
    solution.toggle(2).unwrap();
    solution.add_bus().unwrap();
    let objective = solution.objective();

    solution.terminate();
    assert!(solution.is_terminated());
    assert_eq!(solution.objective(), objective);
    assert_eq!(solution.prev_objective(), objective);

    assert_eq!(solution.stats().unwrap_err(), SolutionError::Terminated);
    assert_eq!(solution.ttd().unwrap_err(), SolutionError::Terminated);
    assert_eq!(solution.toggle(2).unwrap_err(), SolutionError::Terminated);
    assert_eq!(solution.add_bus().unwrap_err(), SolutionError::Terminated);

    // calling it again changes nothing
    solution.terminate();
    assert!(solution.is_terminated());
    assert_eq!(solution.objective(), objective);
}

#[test]
fn test_cloned_solutions_evolve_independently() {
    let instance = setup::five_stop_instance();
    let mut solution = Solution::new(Arc::clone(&instance));
    solution.toggle(2).unwrap();
    solution.add_bus().unwrap();

    let snapshot = solution.clone();
    solution.toggle(3).unwrap();

    assert_ne!(solution.objective(), snapshot.objective());
    assert_eq!(snapshot.limited().stops(), vec![0, 2, 4]);
    assert_eq!(solution.limited().stops(), vec![0, 2, 3, 4]);
}
