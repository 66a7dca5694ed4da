//! Sequential Monte Carlo over circuit and generator outages.
//!
//! Every iteration starts from the base network, samples one Bernoulli
//! outcome per parallel circuit unit and per generator, and solves a DC-OPF
//! for the resulting contingency (memoized by contingency key). Total shed
//! load feeds the LOLP/EPNS estimators until the coefficient of variation
//! drops below the tolerance or the iteration limit is reached.

use super::cache::{ContingencyCache, ContingencyKey};
use super::stats::ReliabilityAccumulator;
use crate::config::{InfeasiblePolicy, MonteCarloConfig};
use crate::opf::{ProblemFormulator, ResultsExtractor, Variant};
use crate::StudyResult;
use grex_core::{CircuitIdx, Network, PowerBase, HOURS_PER_YEAR};
use grex_solver_common::{ModelError, SolverGateway};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Reliability indices of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityResults {
    /// Loss-of-load probability
    pub lolp: f64,
    /// Expected power not supplied (pu)
    pub epns: f64,
    pub epns_mw: f64,
    /// Loss-of-load expectation (h/yr)
    pub lole: f64,
    /// Expected energy not supplied (MWh/yr)
    pub eens: f64,
    pub samples: usize,
    /// Stopping statistic after each iteration from the second on
    pub beta_history: Vec<f64>,
    pub converged: bool,
    pub solver_calls: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

impl ReliabilityResults {
    fn from_accumulator(acc: &ReliabilityAccumulator, base: PowerBase) -> Self {
        let lolp = acc.lolp();
        let epns = acc.epns();
        Self {
            lolp,
            epns,
            epns_mw: base.to_mw(epns),
            lole: HOURS_PER_YEAR * lolp,
            eens: HOURS_PER_YEAR * base.to_mw(epns),
            samples: acc.samples,
            beta_history: Vec::new(),
            converged: false,
            solver_calls: 0,
            cache_hits: 0,
            cache_misses: 0,
        }
    }
}

/// Per-worker sampling state: RNG, cache, working copy and counters.
struct Sampler<'a> {
    base: &'a Network,
    contingencies: &'a [CircuitIdx],
    config: &'a MonteCarloConfig,
    work: Network,
    rng: StdRng,
    solver_calls: usize,
}

impl<'a> Sampler<'a> {
    fn new(
        base: &'a Network,
        contingencies: &'a [CircuitIdx],
        config: &'a MonteCarloConfig,
        seed: u64,
    ) -> Self {
        Self {
            base,
            contingencies,
            config,
            work: base.clone(),
            rng: StdRng::seed_from_u64(seed),
            solver_calls: 0,
        }
    }

    /// Reset the working copy to base values and apply a fresh outage draw.
    fn sample(&mut self) -> ContingencyKey {
        for (work, base) in self.work.circuits.iter_mut().zip(&self.base.circuits) {
            work.flow_max = base.flow_max;
            work.b_lin = base.b_lin;
            work.b = base.b;
        }
        for (work, base) in self.work.generators.iter_mut().zip(&self.base.generators) {
            work.pg_max = base.pg_max;
        }

        let mut circuit_failures = Vec::with_capacity(self.contingencies.len());
        for &idx in self.contingencies {
            let base = &self.base.circuits[idx.value()];
            let units = base.parallel.max(1);
            let failed = (0..units)
                .filter(|_| self.rng.gen::<f64>() < base.forced_outage_rate)
                .count();
            let circuit = &mut self.work.circuits[idx.value()];
            if failed == units {
                circuit.flow_max = self.base.synthetic_line.flow_max;
                circuit.b_lin = self.base.synthetic_line.b_lin;
                circuit.b = self.base.synthetic_line.b_lin;
            } else if failed > 0 {
                let remaining = (units - failed) as f64 / units as f64;
                circuit.flow_max *= remaining;
                circuit.b_lin *= remaining;
                circuit.b *= remaining;
            }
            circuit_failures.push(failed);
        }

        let mut generator_failures = Vec::with_capacity(self.work.generators.len());
        for generator in self.work.generators.iter_mut() {
            let failed = self.rng.gen::<f64>() < generator.forced_outage_rate;
            if failed {
                generator.pg_max = 0.0;
            }
            generator_failures.push(failed);
        }

        ContingencyKey {
            circuit_failures,
            generator_failures,
        }
    }

    /// Total shed (pu) of the current working network.
    fn evaluate(&mut self, gateway: &dyn SolverGateway) -> StudyResult<f64> {
        let formulation = ProblemFormulator::new(&self.work).formulate(Variant::Opf, None)?;
        self.solver_calls += 1;
        match gateway.solve(&formulation.problem) {
            Ok(solved) => {
                let results = ResultsExtractor::extract(&self.work, &formulation, &solved);
                Ok(results.blocks.iter().map(|b| b.total_shed()).sum())
            }
            Err(err)
                if err.is_infeasible()
                    && self.config.infeasible_policy == InfeasiblePolicy::CountAsFullShed =>
            {
                let shed = self.work.total_demand();
                warn!(error = %err, shed, "infeasible contingency counted as full shed");
                Ok(shed)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn step(
        &mut self,
        gateway: &dyn SolverGateway,
        cache: &mut ContingencyCache,
    ) -> StudyResult<f64> {
        let key = self.sample();
        if let Some(shed) = cache.get(&key) {
            return Ok(shed);
        }
        let shed = self.evaluate(gateway)?;
        cache.insert(key, shed);
        Ok(shed)
    }
}

/// Monte Carlo reliability engine owning its gateway and contingency cache.
pub struct MonteCarloReliabilityEngine<G> {
    gateway: G,
    config: MonteCarloConfig,
    cache: ContingencyCache,
}

impl<G: SolverGateway> MonteCarloReliabilityEngine<G> {
    pub fn new(gateway: G, config: MonteCarloConfig) -> Self {
        let cache = ContingencyCache::new(config.cache_capacity);
        Self {
            gateway,
            config,
            cache,
        }
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Cache of the most recent run.
    pub fn cache(&self) -> &ContingencyCache {
        &self.cache
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Run until the stopping rule fires or `max_iterations` is reached.
    ///
    /// `contingencies` defaults to every non-synthetic circuit. The cache is
    /// cleared at the start of each run since keys do not identify the
    /// network they were computed on.
    pub fn run(
        &mut self,
        network: &Network,
        contingencies: Option<&[CircuitIdx]>,
    ) -> StudyResult<ReliabilityResults> {
        self.config.validate()?;
        let contingencies = contingency_set(network, contingencies)?;
        self.cache = ContingencyCache::new(self.config.cache_capacity);

        let config = &self.config;
        let mut sampler = Sampler::new(network, &contingencies, config, config.seed);
        let mut acc = ReliabilityAccumulator::default();
        let mut beta_history = Vec::new();
        let mut converged = false;

        info!(
            contingencies = contingencies.len(),
            generators = network.generators.len(),
            max_iterations = config.max_iterations,
            seed = config.seed,
            "starting Monte Carlo reliability run"
        );

        for iteration in 1..=config.max_iterations {
            let shed = sampler.step(&self.gateway, &mut self.cache)?;
            acc.record(shed, config.shed_tolerance);

            if iteration >= 2 {
                let beta = acc.beta().unwrap_or(1.0);
                beta_history.push(beta);
                if iteration >= config.min_iterations && beta < config.beta_tolerance {
                    converged = true;
                    debug!(iteration, beta, "stopping rule met");
                    break;
                }
            }

            if config.progress_interval > 0 && iteration % config.progress_interval == 0 {
                info!(
                    iteration,
                    lolp = acc.lolp(),
                    epns = acc.epns(),
                    beta = beta_history.last().copied().unwrap_or(1.0),
                    cache_hits = self.cache.hits(),
                    "Monte Carlo progress"
                );
            }
        }

        let mut results = ReliabilityResults::from_accumulator(&acc, network.power_base);
        results.beta_history = beta_history;
        results.converged = converged;
        results.solver_calls = sampler.solver_calls;
        results.cache_hits = self.cache.hits();
        results.cache_misses = self.cache.misses();

        info!(
            samples = results.samples,
            lolp = results.lolp,
            epns_mw = results.epns_mw,
            lole = results.lole,
            eens = results.eens,
            converged,
            solver_calls = results.solver_calls,
            "Monte Carlo reliability run finished"
        );
        Ok(results)
    }
}

impl<G: SolverGateway + Sync> MonteCarloReliabilityEngine<G> {
    /// Split `max_iterations` over `shards` rayon workers.
    ///
    /// Shard `i` draws from its own generator seeded with `seed + i` and keeps
    /// its own cache; the running sums are merged in shard order, so a given
    /// seed and shard count always reproduce the same indices. No early
    /// stop: each shard runs its full share.
    pub fn run_sharded(
        &self,
        network: &Network,
        contingencies: Option<&[CircuitIdx]>,
        shards: usize,
    ) -> StudyResult<ReliabilityResults> {
        self.config.validate()?;
        let contingencies = contingency_set(network, contingencies)?;
        let shards = shards.clamp(1, self.config.max_iterations);
        let config = &self.config;
        let gateway = &self.gateway;
        let set = contingencies.as_slice();

        let outcomes: StudyResult<Vec<ShardOutcome>> = (0..shards)
            .into_par_iter()
            .map(|shard| -> StudyResult<ShardOutcome> {
                let share = config.max_iterations / shards
                    + usize::from(shard < config.max_iterations % shards);
                let seed = config.seed.wrapping_add(shard as u64);
                let mut sampler = Sampler::new(network, set, config, seed);
                let mut cache = ContingencyCache::new(config.cache_capacity);
                let mut acc = ReliabilityAccumulator::default();
                for _ in 0..share {
                    let shed = sampler.step(gateway, &mut cache)?;
                    acc.record(shed, config.shed_tolerance);
                }
                debug!(shard, seed, samples = acc.samples, "shard finished");
                Ok(ShardOutcome {
                    acc,
                    solver_calls: sampler.solver_calls,
                    cache_hits: cache.hits(),
                    cache_misses: cache.misses(),
                })
            })
            .collect();
        let outcomes = outcomes?;

        let mut acc = ReliabilityAccumulator::default();
        for outcome in &outcomes {
            acc.merge(&outcome.acc);
        }
        let beta = acc.beta().unwrap_or(1.0);

        let mut results = ReliabilityResults::from_accumulator(&acc, network.power_base);
        results.beta_history = vec![beta];
        results.converged = beta < config.beta_tolerance;
        results.solver_calls = outcomes.iter().map(|o| o.solver_calls).sum();
        results.cache_hits = outcomes.iter().map(|o| o.cache_hits).sum();
        results.cache_misses = outcomes.iter().map(|o| o.cache_misses).sum();

        info!(
            shards,
            samples = results.samples,
            lolp = results.lolp,
            epns_mw = results.epns_mw,
            "sharded Monte Carlo run finished"
        );
        Ok(results)
    }
}

struct ShardOutcome {
    acc: ReliabilityAccumulator,
    solver_calls: usize,
    cache_hits: usize,
    cache_misses: usize,
}

/// Explicit set validated against the network, or every non-synthetic circuit.
fn contingency_set(
    network: &Network,
    contingencies: Option<&[CircuitIdx]>,
) -> Result<Vec<CircuitIdx>, ModelError> {
    match contingencies {
        Some(set) => {
            for idx in set {
                if idx.value() >= network.circuits.len() {
                    return Err(ModelError::IndexOutOfRange {
                        set: "circuits",
                        index: idx.value(),
                        len: network.circuits.len(),
                    });
                }
            }
            Ok(set.to_vec())
        }
        None => Ok(network
            .circuit_indices()
            .filter(|&idx| !network.circuits[idx.value()].synthetic)
            .collect()),
    }
}
