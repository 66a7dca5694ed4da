//! Quadratic losses inside a linear OPF by iterative demand inflation.
//!
//! Each round solves the OPF, estimates every circuit's loss as
//! `0.5·g·Δθ²` from the solved angles, resets demand to its original value
//! and adds half of each loss to both endpoints. Rounds stop once the sum of
//! squared demand changes falls below the tolerance.

use super::{DispatchResults, Formulation, OptimizationProblem, ProblemFormulator, ResultsExtractor, Variant};
use crate::config::LossConfig;
use crate::{StudyError, StudyResult};
use grex_core::Network;
use grex_solver_common::{ModelError, SolvedProblem, SolverGateway};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The iteration hit its round limit before the tolerance was met.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceWarning {
    pub iterations: usize,
    pub residual: f64,
    pub tolerance: f64,
}

impl std::fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "loss allocation did not converge after {} iterations (residual {:.3e}, tolerance {:.3e})",
            self.iterations, self.residual, self.tolerance
        )
    }
}

/// Result of the loss iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossOutcome {
    /// Dispatch of the last solved round; `results.blocks[0].demand` is the
    /// demand it was solved against
    pub results: DispatchResults,
    /// Loss estimate per circuit from that dispatch's angles (pu)
    pub losses: Vec<f64>,
    /// Demand for the next round: original demand plus `losses` (pu, per bus).
    ///
    /// Differs from the solved demand by at most `sqrt(residual)` per bus.
    pub demand: Vec<f64>,
    pub iterations: usize,
    /// Sum of squared differences between `demand` and the solved demand
    pub residual: f64,
    pub warning: Option<ConvergenceWarning>,
}

impl LossOutcome {
    pub fn converged(&self) -> bool {
        self.warning.is_none()
    }

    pub fn total_losses(&self) -> f64 {
        self.losses.iter().sum()
    }
}

/// Fixed-point loop around the OPF that reallocates losses as demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossAllocationIterator {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for LossAllocationIterator {
    fn default() -> Self {
        Self::from(&LossConfig::default())
    }
}

impl From<&LossConfig> for LossAllocationIterator {
    fn from(config: &LossConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }
}

impl LossAllocationIterator {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }
}

/// `0.5·g·Δθ²` per circuit.
pub fn circuit_losses(network: &Network, theta: &[f64]) -> Vec<f64> {
    network
        .circuits
        .iter()
        .map(|c| c.loss(theta[c.from.value()], theta[c.to.value()]))
        .collect()
}

impl OptimizationProblem for LossAllocationIterator {
    type Output = LossOutcome;

    fn id(&self) -> &str {
        "opf-losses"
    }

    /// Every bus gets a shedding variable because losses can put demand on
    /// buses that had none.
    fn formulate(&self, network: &Network) -> Result<Formulation, ModelError> {
        ProblemFormulator::new(network)
            .shed_all_buses(true)
            .formulate(Variant::Opf, None)
    }

    /// Outcome of a single round, without the fixed-point loop.
    fn extract_results(
        &self,
        network: &Network,
        formulation: &Formulation,
        solved: &SolvedProblem,
    ) -> LossOutcome {
        let results = ResultsExtractor::extract(network, formulation, solved);
        let losses = circuit_losses(network, &results.blocks[0].theta);
        let mut demand: Vec<f64> = network.buses.iter().map(|b| b.pd).collect();
        allocate(network, &losses, &mut demand);
        let residual = squared_change(network, &demand);
        LossOutcome {
            results,
            losses,
            demand,
            iterations: 1,
            residual,
            warning: None,
        }
    }

    fn solve(&self, network: &Network, gateway: &dyn SolverGateway) -> StudyResult<LossOutcome> {
        if self.max_iterations == 0 {
            return Err(StudyError::Config(
                "loss allocation needs at least one iteration".into(),
            ));
        }

        let mut working = network.clone();
        let original: Vec<f64> = network.buses.iter().map(|b| b.pd).collect();
        let mut last = None;

        for iteration in 1..=self.max_iterations {
            let formulation = self.formulate(&working)?;
            let solved = gateway.solve(&formulation.problem)?;
            let results = ResultsExtractor::extract(&working, &formulation, &solved);

            let losses = circuit_losses(&working, &results.blocks[0].theta);
            let mut demand = original.clone();
            allocate(&working, &losses, &mut demand);

            let residual = squared_change(&working, &demand);
            for (bus, new) in working.buses.iter_mut().zip(&demand) {
                bus.pd = *new;
            }
            debug!(iteration, residual, total_losses = losses.iter().sum::<f64>(), "loss round");

            let outcome = LossOutcome {
                results,
                losses,
                demand,
                iterations: iteration,
                residual,
                warning: None,
            };
            if residual < self.tolerance {
                info!(iterations = iteration, residual, "loss allocation converged");
                return Ok(outcome);
            }
            last = Some(outcome);
        }

        let mut outcome = last.ok_or_else(|| StudyError::Config("no loss round ran".into()))?;
        let warning = ConvergenceWarning {
            iterations: outcome.iterations,
            residual: outcome.residual,
            tolerance: self.tolerance,
        };
        warn!(%warning, "accepting last loss iterate");
        outcome.warning = Some(warning);
        Ok(outcome)
    }
}

fn squared_change(network: &Network, demand: &[f64]) -> f64 {
    network
        .buses
        .iter()
        .zip(demand)
        .map(|(bus, new)| (new - bus.pd).powi(2))
        .sum()
}

/// Add half of each circuit's loss to both of its endpoints.
fn allocate(network: &Network, losses: &[f64], demand: &mut [f64]) {
    for (c, loss) in network.circuits.iter().zip(losses) {
        demand[c.from.value()] += 0.5 * loss;
        demand[c.to.value()] += 0.5 * loss;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mesh_network;

    #[test]
    fn test_losses_zero_for_flat_angles() {
        let net = mesh_network();
        let losses = circuit_losses(&net, &vec![0.0; net.buses.len()]);
        assert!(losses.iter().all(|&l| l == 0.0));
    }

    #[test]
    fn test_allocation_splits_each_loss_between_endpoints() {
        let net = mesh_network();
        let losses = vec![0.02; net.circuits.len()];
        let mut demand = vec![0.0; net.buses.len()];
        allocate(&net, &losses, &mut demand);
        let total: f64 = demand.iter().sum();
        assert!((total - 0.02 * net.circuits.len() as f64).abs() < 1e-12);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let net = mesh_network();
        let gateway = crate::backends::GoodLpGateway::default();
        let err = LossAllocationIterator::new(0, 1e-8)
            .solve(&net, &gateway)
            .unwrap_err();
        assert!(matches!(err, StudyError::Config(_)));
    }
}
