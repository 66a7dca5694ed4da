//! Solver gateway implementations.

pub mod good_lp_gateway;

pub use good_lp_gateway::{GoodLpGateway, SolverEngine};
