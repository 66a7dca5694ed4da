//! Study configuration, loaded from TOML.
//!
//! ```toml
//! [topology]
//! power_base = 100.0
//! reference_bus = 0
//!
//! [losses]
//! max_iterations = 4
//! tolerance = 1e-8
//!
//! [monte_carlo]
//! seed = 7
//! beta_tolerance = 0.05
//! infeasible_policy = "count_as_full_shed"
//!
//! [solver]
//! engine = "microlp"
//! ```
//!
//! Every section and field is optional and falls back to its default.

use crate::backends::SolverEngine;
use crate::{StudyError, StudyResult};
use anyhow::Context;
use grex_core::TopologyConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration of a study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub losses: LossConfig,
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl StudyConfig {
    pub fn from_toml_str(contents: &str) -> StudyResult<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| StudyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> StudyResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading study config {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> StudyResult<String> {
        toml::to_string_pretty(self).map_err(|e| StudyError::Config(e.to_string()))
    }

    pub fn validate(&self) -> StudyResult<()> {
        self.topology.validate()?;
        self.losses.validate()?;
        self.monte_carlo.validate()?;
        if !self.solver.engine.is_available() {
            return Err(StudyError::Config(format!(
                "solver engine '{}' is not compiled in; available: {}",
                self.solver.engine,
                SolverEngine::available().join(", ")
            )));
        }
        Ok(())
    }
}

/// Loss allocation iteration limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossConfig {
    #[serde(default = "default_loss_iterations")]
    pub max_iterations: usize,
    /// Threshold on the sum of squared demand changes between rounds
    #[serde(default = "default_loss_tolerance")]
    pub tolerance: f64,
}

fn default_loss_iterations() -> usize {
    4
}

fn default_loss_tolerance() -> f64 {
    1e-8
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_loss_iterations(),
            tolerance: default_loss_tolerance(),
        }
    }
}

impl LossConfig {
    pub fn validate(&self) -> StudyResult<()> {
        if self.max_iterations == 0 {
            return Err(StudyError::Config("losses.max_iterations must be at least 1".into()));
        }
        if !(self.tolerance > 0.0) {
            return Err(StudyError::Config("losses.tolerance must be positive".into()));
        }
        Ok(())
    }
}

/// What to do when a sampled contingency has no feasible dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeasiblePolicy {
    /// Record the whole demand of the derated network as shed
    #[default]
    CountAsFullShed,
    /// Stop the run with the solver error
    Abort,
}

/// Monte Carlo reliability run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "default_mc_iterations")]
    pub max_iterations: usize,
    /// Stop once the coefficient of variation falls below this
    #[serde(default = "default_beta_tolerance")]
    pub beta_tolerance: f64,
    /// The stopping rule is only checked from this iteration on
    #[serde(default = "default_min_iterations")]
    pub min_iterations: usize,
    /// Contingency cache entries kept; 0 disables caching
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default)]
    pub seed: u64,
    /// Shedding above this counts as loss of load (pu)
    #[serde(default = "default_shed_tolerance")]
    pub shed_tolerance: f64,
    #[serde(default)]
    pub infeasible_policy: InfeasiblePolicy,
    /// Iterations between progress log lines; 0 disables them
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_mc_iterations() -> usize {
    100_000
}

fn default_beta_tolerance() -> f64 {
    0.05
}

fn default_min_iterations() -> usize {
    100
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_shed_tolerance() -> f64 {
    1e-6
}

fn default_progress_interval() -> usize {
    1000
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_mc_iterations(),
            beta_tolerance: default_beta_tolerance(),
            min_iterations: default_min_iterations(),
            cache_capacity: default_cache_capacity(),
            seed: 0,
            shed_tolerance: default_shed_tolerance(),
            infeasible_policy: InfeasiblePolicy::default(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> StudyResult<()> {
        if self.max_iterations == 0 {
            return Err(StudyError::Config(
                "monte_carlo.max_iterations must be at least 1".into(),
            ));
        }
        if !(self.beta_tolerance > 0.0) {
            return Err(StudyError::Config(
                "monte_carlo.beta_tolerance must be positive".into(),
            ));
        }
        if !(self.shed_tolerance >= 0.0) {
            return Err(StudyError::Config(
                "monte_carlo.shed_tolerance must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Solver gateway selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub engine: SolverEngine,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = StudyConfig::from_toml_str("").unwrap();
        assert_eq!(config, StudyConfig::default());
        assert_eq!(config.losses.max_iterations, 4);
        assert_eq!(config.monte_carlo.cache_capacity, 1000);
        assert_eq!(config.topology.investment.units, 3);
    }

    #[test]
    fn test_partial_sections() {
        let config = StudyConfig::from_toml_str(
            r#"
            [monte_carlo]
            seed = 7
            infeasible_policy = "abort"

            [topology.investment]
            units = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.monte_carlo.seed, 7);
        assert_eq!(config.monte_carlo.infeasible_policy, InfeasiblePolicy::Abort);
        assert_eq!(config.monte_carlo.min_iterations, 100);
        assert_eq!(config.topology.investment.units, 5);
        assert_eq!(config.topology.investment.unit_cost, 1e6);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = StudyConfig::from_toml_str("[losses]\nmax_iterations = 0\n").unwrap_err();
        assert!(matches!(err, StudyError::Config(_)));
        let err = StudyConfig::from_toml_str("[topology]\nmax_angle_opening = -1.0\n").unwrap_err();
        assert!(matches!(err, StudyError::Network(_)));
    }

    #[test]
    fn test_unknown_engine_rejected() {
        let err = StudyConfig::from_toml_str("[solver]\nengine = \"cplex\"\n").unwrap_err();
        assert!(matches!(err, StudyError::Config(_)));
    }
}
