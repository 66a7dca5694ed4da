//! Monte Carlo reliability assessment (LOLP, EPNS, LOLE, EENS).

pub mod cache;
pub mod engine;
pub mod stats;

pub use cache::{ContingencyCache, ContingencyKey};
pub use engine::{MonteCarloReliabilityEngine, ReliabilityResults};
pub use stats::ReliabilityAccumulator;
