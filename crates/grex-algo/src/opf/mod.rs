//! DC optimal power flow and transmission expansion.
//!
//! | Problem | Variant | Problem class |
//! |---------|---------|---------------|
//! | [`Opf`] | existing circuits | LP |
//! | [`Tep`] | + investment slots, big-M disjunction | MILP |
//! | [`ScenarioOpf`] | OPF per scenario observation, weighted | LP |
//! | [`LossAllocationIterator`] | OPF re-solved with losses as demand | LP (iterated) |
//!
//! Each implements [`OptimizationProblem`]: `formulate` builds the abstract
//! problem, the gateway solves it, `extract_results` reads the values back.

pub mod extract;
pub mod formulator;
pub mod losses;

pub use extract::{BlockResults, DispatchResults, InvestmentResults, ResultsExtractor};
pub use formulator::{BlockLayout, Formulation, InvestmentLayout, ProblemFormulator, Variant};
pub use losses::{ConvergenceWarning, LossAllocationIterator, LossOutcome};

use crate::StudyResult;
use grex_core::{Network, ScenarioSet};
use grex_solver_common::{ModelError, SolvedProblem, SolverGateway};
use tracing::info;

/// Capability shared by every study variant.
pub trait OptimizationProblem {
    type Output;

    /// Short identifier for logs.
    fn id(&self) -> &str;

    fn formulate(&self, network: &Network) -> Result<Formulation, ModelError>;

    fn extract_results(
        &self,
        network: &Network,
        formulation: &Formulation,
        solved: &SolvedProblem,
    ) -> Self::Output;

    /// Formulate, solve once and extract.
    fn solve(&self, network: &Network, gateway: &dyn SolverGateway) -> StudyResult<Self::Output> {
        let formulation = self.formulate(network)?;
        let solved = gateway.solve(&formulation.problem)?;
        info!(
            problem = self.id(),
            solver = gateway.name(),
            objective = solved.objective,
            status = %solved.status,
            "solved"
        );
        Ok(self.extract_results(network, &formulation, &solved))
    }
}

/// Plain DC-OPF over existing circuits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Opf;

impl OptimizationProblem for Opf {
    type Output = DispatchResults;

    fn id(&self) -> &str {
        "opf"
    }

    fn formulate(&self, network: &Network) -> Result<Formulation, ModelError> {
        ProblemFormulator::new(network).formulate(Variant::Opf, None)
    }

    fn extract_results(
        &self,
        network: &Network,
        formulation: &Formulation,
        solved: &SolvedProblem,
    ) -> DispatchResults {
        ResultsExtractor::extract(network, formulation, solved)
    }
}

/// Transmission expansion planning.
///
/// Shedding is priced at `shedding_cost_factor` times the most expensive
/// investment slot so that unserved load always costs more than building.
#[derive(Debug, Clone, Copy)]
pub struct Tep {
    pub shedding_cost_factor: f64,
}

impl Default for Tep {
    fn default() -> Self {
        Self {
            shedding_cost_factor: 100.0,
        }
    }
}

impl OptimizationProblem for Tep {
    type Output = DispatchResults;

    fn id(&self) -> &str {
        "tep"
    }

    fn formulate(&self, network: &Network) -> Result<Formulation, ModelError> {
        if network.slots.is_empty() {
            return Err(ModelError::MissingData(
                "expansion planning needs at least one investment slot".into(),
            ));
        }
        ProblemFormulator::new(network)
            .shedding_cost(self.shedding_cost_factor * network.max_slot_cost())
            .formulate(Variant::Tep, None)
    }

    fn extract_results(
        &self,
        network: &Network,
        formulation: &Formulation,
        solved: &SolvedProblem,
    ) -> DispatchResults {
        ResultsExtractor::extract(network, formulation, solved)
    }
}

/// OPF replicated over scenario observations.
#[derive(Debug, Clone)]
pub struct ScenarioOpf {
    pub scenarios: ScenarioSet,
}

impl ScenarioOpf {
    pub fn new(scenarios: ScenarioSet) -> Self {
        Self { scenarios }
    }
}

impl OptimizationProblem for ScenarioOpf {
    type Output = DispatchResults;

    fn id(&self) -> &str {
        "scenario-opf"
    }

    fn formulate(&self, network: &Network) -> Result<Formulation, ModelError> {
        ProblemFormulator::new(network).formulate(Variant::ScenarioOpf, Some(&self.scenarios))
    }

    fn extract_results(
        &self,
        network: &Network,
        formulation: &Formulation,
        solved: &SolvedProblem,
    ) -> DispatchResults {
        ResultsExtractor::extract(network, formulation, solved)
    }
}
