//! Solver-agnostic problem model shared by the grex study crates.
//!
//! Formulators build a [`LinearProblem`] (variables with bounds and kind,
//! linear constraints, linear objective) and hand it to a
//! [`SolverGateway`]. The gateway owns the numerical algorithm; this crate
//! never solves anything itself.
//!
//! ```text
//! formulator ──LinearProblem──> SolverGateway ──SolvedProblem──> extractor
//! ```
//!
//! Gateways report failure through [`SolveError`] and never return stale
//! values: a `SolvedProblem` always carries one value per declared variable.

pub mod error;
pub mod gateway;
pub mod problem;
pub mod solution;

pub use error::{ModelError, SolveError};
pub use gateway::SolverGateway;
pub use problem::{
    ConstraintDef, LinearExpr, LinearProblem, ProblemType, Sense, VarId, VarKind, VariableDef,
};
pub use solution::{SolutionStatus, SolvedProblem};
