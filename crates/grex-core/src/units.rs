//! Per-unit conversion helpers.
//!
//! Every quantity inside a [`Network`](crate::Network) is expressed in
//! per-unit on the system power base. Raw tables carry MW/MVAr values and are
//! converted once, at build time, through [`PowerBase`].

use serde::{Deserialize, Serialize};

/// Hours in a (non-leap) year, used to annualize reliability indices.
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// System power base in MVA.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerBase(pub f64);

impl PowerBase {
    /// Convert an absolute MW/MVAr value to per-unit.
    #[inline]
    pub fn to_pu(self, value: f64) -> f64 {
        value / self.0
    }

    /// Convert a per-unit value back to MW/MVAr.
    #[inline]
    pub fn to_mw(self, value_pu: f64) -> f64 {
        value_pu * self.0
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for PowerBase {
    fn default() -> Self {
        PowerBase(100.0)
    }
}

impl std::fmt::Display for PowerBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} MVA", self.0)
    }
}
