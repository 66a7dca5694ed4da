//! Monte Carlo reliability: estimator properties, memoization and policies.

use grex_algo::test_utils::outage_network;
use grex_algo::{GoodLpGateway, InfeasiblePolicy, MonteCarloConfig, MonteCarloReliabilityEngine};
use grex_core::HOURS_PER_YEAR;
use grex_solver_common::{LinearProblem, SolveError, SolvedProblem, SolverGateway};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts solver invocations.
#[derive(Default)]
struct CountingGateway {
    inner: GoodLpGateway,
    calls: AtomicUsize,
}

impl CountingGateway {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SolverGateway for CountingGateway {
    fn name(&self) -> &str {
        "counting"
    }

    fn solve(&self, problem: &LinearProblem) -> Result<SolvedProblem, SolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.solve(problem)
    }
}

/// Rejects every problem as infeasible.
struct InfeasibleGateway;

impl SolverGateway for InfeasibleGateway {
    fn name(&self) -> &str {
        "infeasible"
    }

    fn solve(&self, _problem: &LinearProblem) -> Result<SolvedProblem, SolveError> {
        Err(SolveError::Infeasible("no dispatch".into()))
    }
}

fn config(max_iterations: usize, seed: u64) -> MonteCarloConfig {
    MonteCarloConfig {
        max_iterations,
        seed,
        progress_interval: 0,
        ..MonteCarloConfig::default()
    }
}

#[test]
fn test_reliable_system_has_zero_indices() {
    let net = outage_network(0.0, 0.0);
    let mut engine = MonteCarloReliabilityEngine::new(CountingGateway::default(), config(200, 1));
    let results = engine.run(&net, None).unwrap();

    assert_eq!(results.lolp, 0.0);
    assert_eq!(results.epns, 0.0);
    assert_eq!(results.eens, 0.0);
    assert_eq!(results.samples, 200);
    assert!(!results.converged);
    // every sample is the intact system
    assert_eq!(engine.gateway().calls(), 1);
    assert_eq!(results.cache_hits, 199);
}

#[test]
fn test_same_seed_reproduces_indices() {
    let net = outage_network(0.2, 0.1);
    let run = || {
        MonteCarloReliabilityEngine::new(GoodLpGateway::default(), config(300, 7))
            .run(&net, None)
            .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first.lolp.to_bits(), second.lolp.to_bits());
    assert_eq!(first.epns.to_bits(), second.epns.to_bits());
    assert_eq!(first, second);
}

#[test]
fn test_outages_produce_consistent_indices() {
    let net = outage_network(0.2, 0.1);
    let results = MonteCarloReliabilityEngine::new(GoodLpGateway::default(), config(500, 3))
        .run(&net, None)
        .unwrap();

    assert!(results.lolp > 0.0 && results.lolp < 1.0);
    assert!(results.epns > 0.0);
    assert!((results.lole - HOURS_PER_YEAR * results.lolp).abs() < 1e-9);
    assert!((results.epns_mw - 100.0 * results.epns).abs() < 1e-9);
    assert!((results.eens - HOURS_PER_YEAR * results.epns_mw).abs() < 1e-6);
    assert_eq!(results.beta_history.len(), results.samples - 1);
    assert!(results.beta_history.iter().all(|&b| (0.0..=1.0).contains(&b)));
}

#[test]
fn test_repeated_contingencies_hit_the_cache() {
    let net = outage_network(0.2, 0.1);
    let mut engine = MonteCarloReliabilityEngine::new(CountingGateway::default(), config(400, 11));
    let results = engine.run(&net, None).unwrap();

    // one double circuit (0..=2 failed units) and two generators
    assert!(engine.gateway().calls() <= 3 * 4);
    assert_eq!(engine.gateway().calls(), results.solver_calls);
    assert_eq!(results.cache_misses, results.solver_calls);
    assert_eq!(results.cache_hits + results.cache_misses, results.samples);
}

#[test]
fn test_disabled_cache_solves_every_sample() {
    let net = outage_network(0.2, 0.1);
    let config = MonteCarloConfig {
        cache_capacity: 0,
        ..config(50, 5)
    };
    let mut engine = MonteCarloReliabilityEngine::new(CountingGateway::default(), config);
    let results = engine.run(&net, None).unwrap();
    assert_eq!(engine.gateway().calls(), 50);
    assert_eq!(results.cache_hits, 0);
}

#[test]
fn test_cache_does_not_change_estimates() {
    let net = outage_network(0.2, 0.1);
    let cached = MonteCarloReliabilityEngine::new(GoodLpGateway::default(), config(150, 9))
        .run(&net, None)
        .unwrap();
    let uncached = MonteCarloReliabilityEngine::new(
        GoodLpGateway::default(),
        MonteCarloConfig {
            cache_capacity: 0,
            ..config(150, 9)
        },
    )
    .run(&net, None)
    .unwrap();
    assert!((cached.lolp - uncached.lolp).abs() < 1e-12);
    assert!((cached.epns - uncached.epns).abs() < 1e-9);
}

#[test]
fn test_infeasible_contingency_policies() {
    let net = outage_network(0.0, 0.0);

    let counted = MonteCarloReliabilityEngine::new(InfeasibleGateway, config(10, 1))
        .run(&net, None)
        .unwrap();
    assert_eq!(counted.lolp, 1.0);
    assert!((counted.epns - net.total_demand()).abs() < 1e-12);

    let abort = MonteCarloConfig {
        infeasible_policy: InfeasiblePolicy::Abort,
        ..config(10, 1)
    };
    let err = MonteCarloReliabilityEngine::new(InfeasibleGateway, abort)
        .run(&net, None)
        .unwrap_err();
    assert!(matches!(
        err,
        grex_algo::StudyError::Solve(SolveError::Infeasible(_))
    ));
}

#[test]
fn test_sharded_run_is_deterministic() {
    let net = outage_network(0.2, 0.1);
    let engine = MonteCarloReliabilityEngine::new(CountingGateway::default(), config(203, 13));
    let first = engine.run_sharded(&net, None, 4).unwrap();
    let second = engine.run_sharded(&net, None, 4).unwrap();

    assert_eq!(first.samples, 203);
    assert_eq!(first.lolp.to_bits(), second.lolp.to_bits());
    assert_eq!(first.epns.to_bits(), second.epns.to_bits());
    assert!(first.lolp > 0.0);
}

#[test]
fn test_stopping_rule_ends_run_before_iteration_limit() {
    let net = outage_network(0.2, 0.1);
    let mut cfg = config(100_000, 0);
    cfg.beta_tolerance = 0.3;
    let results = MonteCarloReliabilityEngine::new(GoodLpGateway::default(), cfg.clone())
        .run(&net, None)
        .unwrap();

    assert!(results.converged);
    assert!(results.samples >= cfg.min_iterations);
    assert!(results.samples < cfg.max_iterations);
    assert_eq!(results.beta_history.len(), results.samples - 1);
    assert!(results.beta_history.last().copied().unwrap() < cfg.beta_tolerance);
}

#[test]
fn test_stopping_rule_waits_for_min_iterations() {
    let net = outage_network(0.2, 0.1);
    let mut cfg = config(100_000, 0);
    cfg.beta_tolerance = 0.3;
    cfg.min_iterations = 300;
    let results = MonteCarloReliabilityEngine::new(GoodLpGateway::default(), cfg.clone())
        .run(&net, None)
        .unwrap();

    // beta_history[k] is the estimate after sample k + 2
    let before_gate = &results.beta_history[..cfg.min_iterations - 2];
    assert!(before_gate.iter().any(|&b| b < cfg.beta_tolerance));
    assert!(results.converged);
    assert_eq!(results.samples, cfg.min_iterations);
}
