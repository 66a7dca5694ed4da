//! Unified error type for studies.
//!
//! Each layer keeps its own error enum ([`NetworkError`] for construction,
//! [`ModelError`] for formulation, [`SolveError`] from the gateway);
//! [`StudyError`] wraps them at the study boundary so drivers can use `?`
//! throughout.

use grex_core::{NetworkError, TopologyError};
use grex_solver_common::{ModelError, SolveError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudyError {
    /// Network construction failed
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Formulation invariant violated
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// The external solver failed
    #[error("Solver error: {0}")]
    Solve(#[from] SolveError),

    /// Invalid study configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Result artifact could not be written or read
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors with file context attached at a loading boundary
    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl From<TopologyError> for StudyError {
    fn from(err: TopologyError) -> Self {
        StudyError::Network(err.into())
    }
}

/// Convenience alias for study results.
pub type StudyResult<T> = Result<T, StudyError>;
