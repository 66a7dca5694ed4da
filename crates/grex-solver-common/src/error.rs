//! Error types for problem formulation and solving.

use thiserror::Error;

/// A formulation invariant was violated.
///
/// These are programmer errors: a formulator built from a valid network
/// should never produce one.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// A constraint or the objective references an undeclared variable
    #[error("{location} references unknown variable {var}")]
    UnknownVariable { location: String, var: usize },

    /// Lower bound above upper bound, or a NaN bound
    #[error("variable '{name}' has invalid bounds [{lower}, {upper}]")]
    InvalidBounds { name: String, lower: f64, upper: f64 },

    /// NaN or infinite coefficient/right-hand side
    #[error("non-finite coefficient in {0}")]
    NonFinite(String),

    /// An index used in a formulation rule is outside its declared set
    #[error("{set} index {index} is outside the declared set of {len}")]
    IndexOutOfRange {
        set: &'static str,
        index: usize,
        len: usize,
    },

    /// Input data needed by the chosen variant is missing
    #[error("missing model data: {0}")]
    MissingData(String),
}

/// Errors reported by a [`SolverGateway`](crate::SolverGateway).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    /// The solver proved the problem infeasible
    #[error("problem is infeasible: {0}")]
    Infeasible(String),

    /// The objective is unbounded below
    #[error("problem is unbounded: {0}")]
    Unbounded(String),

    /// The engine cannot handle this problem class (e.g. binaries on an LP solver)
    #[error("unsupported by solver {solver}: {message}")]
    Unsupported { solver: String, message: String },

    /// Any other solver failure
    #[error("solver backend error: {0}")]
    Backend(String),

    /// The problem was rejected before submission
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl SolveError {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, SolveError::Infeasible(_))
    }
}
