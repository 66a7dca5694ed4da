//! Values returned by a solver gateway.

use crate::problem::VarId;
use serde::{Deserialize, Serialize};

/// Status of a returned solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    /// Optimal solution found.
    Optimal,
    /// Feasible, optimality not proven (e.g. MIP gap limit).
    Feasible,
}

impl SolutionStatus {
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Feasible => write!(f, "feasible"),
        }
    }
}

/// One value per declared variable, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedProblem {
    pub status: SolutionStatus,
    pub values: Vec<f64>,
    pub objective: f64,
}

impl SolvedProblem {
    #[inline]
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    pub fn values_of(&self, vars: &[VarId]) -> Vec<f64> {
        vars.iter().map(|&v| self.value(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinearProblem;

    #[test]
    fn test_value_lookup() {
        let mut p = LinearProblem::new();
        let a = p.add_variable("a", 0.0, 1.0);
        let b = p.add_variable("b", 0.0, 1.0);
        let solved = SolvedProblem {
            status: SolutionStatus::Optimal,
            values: vec![0.25, 0.75],
            objective: 0.0,
        };
        assert_eq!(solved.value(b), 0.75);
        assert_eq!(solved.values_of(&[b, a]), vec![0.75, 0.25]);
        assert_eq!(solved.status.to_string(), "optimal");
    }
}
