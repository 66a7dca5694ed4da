//! Error types for network construction.
//!
//! Construction errors abort immediately: a partially built network is never
//! handed out. [`TopologyError`] is the structural failure (buses that stay
//! disconnected after the repair pass); everything else is a data problem in
//! the raw tables.

use thiserror::Error;

/// Buses that cannot be reached by any in-service circuit, even after
/// synthetic lines were materialized along candidate corridors.
///
/// Bus numbers are the external numbers from the bus table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("buses {buses:?} are impossible to connect")]
pub struct TopologyError {
    pub buses: Vec<usize>,
}

/// Errors raised while turning raw tables into a [`Network`](crate::Network).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Structural disconnection
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// A table row is shorter than a required column
    #[error("table '{table}' row {row}: missing column {column}")]
    MissingColumn {
        table: &'static str,
        row: usize,
        column: usize,
    },

    /// A bus number that is not declared in the bus table
    #[error("table '{table}' row {row}: unknown bus {bus}")]
    UnknownBus {
        table: &'static str,
        row: usize,
        bus: usize,
    },

    /// A generator references a cost class with no gencost row
    #[error("generator {generator}: unknown cost class {class}")]
    UnknownCostClass { generator: usize, class: usize },

    /// Physically meaningless parameter (zero reactance, negative count, ...)
    #[error("table '{table}' row {row}: {message}")]
    InvalidParameter {
        table: &'static str,
        row: usize,
        message: String,
    },

    /// Inconsistent or missing data that is not tied to a single row
    #[error("Validation error: {0}")]
    Validation(String),

    /// Scenario matrix problems
    #[error("Scenario error: {0}")]
    Scenario(String),
}

/// Convenience alias for network construction results.
pub type NetworkResult<T> = Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_error_names_buses() {
        let err = NetworkError::from(TopologyError { buses: vec![4, 7] });
        let msg = err.to_string();
        assert!(msg.contains("Topology error"));
        assert!(msg.contains("[4, 7]"));
    }

    #[test]
    fn test_question_mark_conversion() {
        fn inner() -> Result<(), TopologyError> {
            Err(TopologyError { buses: vec![1] })
        }

        fn outer() -> NetworkResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(NetworkError::Topology(_))));
    }
}
