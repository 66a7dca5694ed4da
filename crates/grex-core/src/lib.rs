//! # grex-core: Network model and topology normalization
//!
//! Provides the computational network used by the DC-OPF, transmission
//! expansion (TEP) and Monte Carlo reliability studies in `grex-algo`.
//!
//! ## Design
//!
//! A [`Network`] is a set of dense, typed collections:
//! - [`Bus`] indexed by [`BusIdx`]
//! - [`Circuit`] (existing or synthetic) indexed by [`CircuitIdx`]
//! - [`CandidateCircuit`] (buildable corridors) indexed by [`CandidateIdx`]
//! - [`InvestmentSlot`] (one per buildable unit) indexed by [`SlotIdx`]
//! - [`Generator`] indexed by [`GenIdx`]
//!
//! Index newtypes keep positions in one collection from being used to address
//! another. All electrical quantities are per-unit on [`Network::power_base`].
//!
//! ## Building a network
//!
//! Raw positional tables ([`RawTables`]) go through
//! [`NetworkTopologyBuilder`], which converts to per-unit, merges parallel
//! circuits, repairs islanded buses with synthetic lines and expands candidate
//! corridors into investment slots.
//!
//! ```rust,no_run
//! use grex_core::{NetworkTopologyBuilder, RawTables, TopologyConfig};
//!
//! # fn tables() -> RawTables { unimplemented!() }
//! let network = NetworkTopologyBuilder::new(TopologyConfig::default())
//!     .build(&tables())?;
//! println!("{} buses, {} circuits", network.buses.len(), network.circuits.len());
//! # Ok::<(), grex_core::NetworkError>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub mod graph_utils;
pub mod network;
pub mod scenario;
pub mod tables;
pub mod topology;
pub mod units;

pub use error::{NetworkError, NetworkResult, TopologyError};
pub use graph_utils::{islands, IslandReport};
pub use network::{
    Bus, CandidateCircuit, Circuit, Generator, InvestmentSlot, Network, SyntheticLine,
};
pub use scenario::ScenarioSet;
pub use tables::{RawTables, Table};
pub use topology::{
    deduplicate_parallel, CircuitRecord, InvestmentDefaults, NetworkTopologyBuilder,
    TopologyConfig,
};
pub use units::{PowerBase, HOURS_PER_YEAR};

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            pub fn new(value: usize) -> Self {
                $name(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

index_type!(
    /// Dense position of a bus in [`Network::buses`].
    BusIdx,
    "Bus"
);
index_type!(
    /// Dense position of a circuit in [`Network::circuits`].
    CircuitIdx,
    "Circuit"
);
index_type!(
    /// Dense position of a candidate corridor in [`Network::candidates`].
    CandidateIdx,
    "Candidate"
);
index_type!(
    /// Dense position of an investment slot in [`Network::slots`].
    SlotIdx,
    "Slot"
);
index_type!(
    /// Dense position of a generator in [`Network::generators`].
    GenIdx,
    "Gen"
);
