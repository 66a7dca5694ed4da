//! # grex-algo: Expansion planning and reliability studies
//!
//! Optimization studies over a [`grex_core::Network`]:
//!
//! | Study | Type | Problem Class |
//! |-------|------|---------------|
//! | DC-OPF | [`opf::Opf`] | LP |
//! | Transmission expansion | [`opf::Tep`] | MILP |
//! | Scenario-weighted OPF | [`opf::ScenarioOpf`] | LP |
//! | OPF with losses | [`opf::LossAllocationIterator`] | iterated LP |
//! | Monte Carlo reliability | [`reliability::MonteCarloReliabilityEngine`] | many LPs |
//!
//! ### Architecture
//!
//! - **[`opf::ProblemFormulator`]**: builds a solver-neutral
//!   [`grex_solver_common::LinearProblem`] (what to solve)
//! - **[`grex_solver_common::SolverGateway`]**: submits it to a numerical
//!   engine (how to solve it); [`backends::GoodLpGateway`] is the default
//! - **[`opf::ResultsExtractor`]**: maps solved values back onto buses,
//!   circuits and investment slots
//!
//! ## Example
//!
//! ```ignore
//! use grex_algo::{backends::GoodLpGateway, opf::{OptimizationProblem, Tep}, StudyConfig};
//! use grex_core::NetworkTopologyBuilder;
//!
//! let config = StudyConfig::from_path("study.toml")?;
//! let network = NetworkTopologyBuilder::new(config.topology.clone()).build(&tables)?;
//! let gateway = GoodLpGateway::new(config.solver.engine);
//! let plan = Tep::default().solve(&network, &gateway)?;
//! println!("built units per corridor: {:?}", plan.investment.unwrap().built_units);
//! ```

pub mod artifact;
pub mod backends;
pub mod config;
pub mod error;
pub mod opf;
pub mod reliability;
pub mod test_utils;

pub use artifact::ResultArtifact;
pub use backends::{GoodLpGateway, SolverEngine};
pub use config::{InfeasiblePolicy, LossConfig, MonteCarloConfig, SolverConfig, StudyConfig};
pub use error::{StudyError, StudyResult};
pub use opf::{
    DispatchResults, LossAllocationIterator, LossOutcome, Opf, OptimizationProblem, ScenarioOpf,
    Tep,
};
pub use reliability::{MonteCarloReliabilityEngine, ReliabilityResults};
