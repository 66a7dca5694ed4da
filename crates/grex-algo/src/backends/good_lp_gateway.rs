//! [`SolverGateway`] backed by the `good_lp` modelling layer.
//!
//! `microlp` (pure Rust, LP and binaries) is always available. `clarabel`
//! (interior point, LP only) and `highs` are behind the `solver-clarabel` and
//! `solver-highs` features.

use anyhow::anyhow;
#[cfg(feature = "solver-clarabel")]
use good_lp::solvers::clarabel::clarabel as clarabel_solver;
#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as highs_solver;
use good_lp::solvers::microlp::microlp as microlp_solver;
use good_lp::{
    constraint, variable, variables, Constraint, Expression, ResolutionError, Solution,
    SolverModel, Variable,
};
use grex_solver_common::{
    LinearExpr, LinearProblem, ProblemType, Sense, SolutionStatus, SolveError, SolvedProblem,
    SolverGateway, VarKind,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Numerical engine used by [`GoodLpGateway`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverEngine {
    #[default]
    Microlp,
    Clarabel,
    Highs,
}

const AVAILABLE_ENGINES: &[&str] = &[
    "microlp",
    #[cfg(feature = "solver-clarabel")]
    "clarabel",
    #[cfg(feature = "solver-highs")]
    "highs",
];

impl SolverEngine {
    /// Engines compiled into this build.
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_ENGINES
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverEngine::Microlp => "microlp",
            SolverEngine::Clarabel => "clarabel",
            SolverEngine::Highs => "highs",
        }
    }

    pub fn is_available(&self) -> bool {
        AVAILABLE_ENGINES.contains(&self.as_str())
    }

    /// Whether the engine handles binary variables.
    pub fn supports_binaries(&self) -> bool {
        !matches!(self, SolverEngine::Clarabel)
    }
}

impl FromStr for SolverEngine {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "microlp" => Ok(SolverEngine::Microlp),
            "clarabel" => Ok(SolverEngine::Clarabel),
            "highs" => Ok(SolverEngine::Highs),
            other => Err(anyhow!(
                "unknown solver engine '{}'; supported values: {}",
                other,
                SolverEngine::available().join(", ")
            )),
        }
    }
}

impl std::fmt::Display for SolverEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translates a [`LinearProblem`] into a `good_lp` model and solves it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpGateway {
    engine: SolverEngine,
}

impl GoodLpGateway {
    pub fn new(engine: SolverEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> SolverEngine {
        self.engine
    }
}

impl SolverGateway for GoodLpGateway {
    fn name(&self) -> &str {
        self.engine.as_str()
    }

    fn solve(&self, problem: &LinearProblem) -> Result<SolvedProblem, SolveError> {
        problem.validate()?;
        if !self.engine.is_available() {
            return Err(SolveError::Unsupported {
                solver: self.engine.to_string(),
                message: "engine is not compiled into this build".into(),
            });
        }
        if problem.problem_type() == ProblemType::Milp && !self.engine.supports_binaries() {
            return Err(SolveError::Unsupported {
                solver: self.engine.to_string(),
                message: format!("{} binary variables in an LP-only engine", problem.num_binaries()),
            });
        }

        let mut vars = variables!();
        let handles: Vec<Variable> = problem
            .variables()
            .iter()
            .map(|def| {
                let mut v = variable();
                if def.kind == VarKind::Binary {
                    v = v.binary();
                }
                if def.lower.is_finite() {
                    v = v.min(def.lower);
                }
                if def.upper.is_finite() {
                    v = v.max(def.upper);
                }
                vars.add(v)
            })
            .collect();

        let objective = to_expression(problem.objective(), &handles);
        let constraints: Vec<Constraint> = problem
            .constraints()
            .iter()
            .map(|c| {
                let lhs = to_expression(&c.expr, &handles);
                let rhs = c.rhs;
                match c.sense {
                    Sense::Le => constraint!(lhs <= rhs),
                    Sense::Ge => constraint!(lhs >= rhs),
                    Sense::Eq => constraint!(lhs == rhs),
                }
            })
            .collect();

        debug!(
            engine = %self.engine,
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            binaries = problem.num_binaries(),
            "submitting problem"
        );

        let unsolved = vars.minimise(objective);
        let values = match self.engine {
            SolverEngine::Microlp => run(unsolved.using(microlp_solver), constraints, &handles),
            #[cfg(feature = "solver-clarabel")]
            SolverEngine::Clarabel => run(unsolved.using(clarabel_solver), constraints, &handles),
            #[cfg(feature = "solver-highs")]
            SolverEngine::Highs => run(unsolved.using(highs_solver), constraints, &handles),
            #[allow(unreachable_patterns)]
            other => Err(SolveError::Unsupported {
                solver: other.to_string(),
                message: "engine is not compiled into this build".into(),
            }),
        }?;

        let objective = problem.objective_value(&values);
        debug!(engine = %self.engine, objective, "solved");
        Ok(SolvedProblem {
            status: SolutionStatus::Optimal,
            values,
            objective,
        })
    }
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for (var, coef) in &expr.terms {
        out += *coef * handles[var.index()];
    }
    out
}

fn run<M>(mut model: M, constraints: Vec<Constraint>, handles: &[Variable]) -> Result<Vec<f64>, SolveError>
where
    M: SolverModel<Error = ResolutionError>,
{
    for c in constraints {
        model = model.with(c);
    }
    let solution = model.solve().map_err(resolution_error)?;
    Ok(handles.iter().map(|v| solution.value(*v)).collect())
}

fn resolution_error(err: ResolutionError) -> SolveError {
    match err {
        ResolutionError::Infeasible => SolveError::Infeasible("solver proved infeasibility".into()),
        ResolutionError::Unbounded => SolveError::Unbounded("objective is unbounded".into()),
        other => SolveError::Backend(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_parsing() {
        assert_eq!("MicroLP".parse::<SolverEngine>().unwrap(), SolverEngine::Microlp);
        assert!("cplex".parse::<SolverEngine>().is_err());
        assert!(SolverEngine::Microlp.is_available());
        assert!(!SolverEngine::Clarabel.supports_binaries());
    }

    #[test]
    fn test_solves_small_lp() {
        let mut p = LinearProblem::new();
        let x = p.add_variable("x", 0.0, 10.0);
        let y = p.add_variable("y", 0.0, 10.0);
        p.add_constraint(
            "demand",
            LinearExpr::new().term(x, 1.0).term(y, 1.0),
            Sense::Eq,
            4.0,
        );
        p.set_objective(LinearExpr::new().term(x, 2.0).term(y, 3.0));

        let solved = GoodLpGateway::default().solve(&p).unwrap();
        assert!((solved.value(x) - 4.0).abs() < 1e-6);
        assert!(solved.value(y).abs() < 1e-6);
        assert!((solved.objective - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_solves_binary_choice() {
        // Build at most one of two options to cover 1.5 units of demand
        let mut p = LinearProblem::new();
        let a = p.add_binary("a");
        let b = p.add_binary("b");
        let short = p.add_variable("short", 0.0, 10.0);
        p.add_constraint(
            "cover",
            LinearExpr::new().term(a, 1.0).term(b, 2.0).term(short, 1.0),
            Sense::Ge,
            1.5,
        );
        p.set_objective(LinearExpr::new().term(a, 1.0).term(b, 1.5).term(short, 100.0));

        let solved = GoodLpGateway::default().solve(&p).unwrap();
        assert!(solved.value(a).abs() < 1e-6);
        assert!((solved.value(b) - 1.0).abs() < 1e-6);
        assert!(solved.value(short).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_is_reported() {
        let mut p = LinearProblem::new();
        let x = p.add_variable("x", 0.0, 1.0);
        p.add_constraint("impossible", LinearExpr::new().term(x, 1.0), Sense::Ge, 2.0);
        p.set_objective(LinearExpr::new().term(x, 1.0));
        let err = GoodLpGateway::default().solve(&p).unwrap_err();
        assert!(err.is_infeasible());
    }

    #[test]
    fn test_invalid_model_rejected_before_submission() {
        let mut p = LinearProblem::new();
        p.add_variable("x", 1.0, 0.0);
        let err = GoodLpGateway::default().solve(&p).unwrap_err();
        assert!(matches!(err, SolveError::Model(_)));
    }
}
