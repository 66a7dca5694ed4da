//! Positional raw tables.
//!
//! Tables are produced by a parser collaborator from whatever textual format
//! holds the case. Columns are addressed by position (0-based), following the
//! MATPOWER-style layout:
//!
//! | Table     | Columns used |
//! |-----------|--------------|
//! | `bus`     | 0 number, 1 type, 2 Pd, 3 Qd, 5 reactive injection, 8 area |
//! | `branch`  | 0 from, 1 to, 2 r, 3 x, 4 b, 5 rate, 8 tap, 13 FOR (optional) |
//! | `xbranch` | as `branch`; with 15 columns, 13 max units and 14 unit cost |
//! | `gen`     | 0 bus, 1 Pg, 2 Qg, 3 Qmax, 4 Qmin, 8 Pmax, 9 Pmin, 21 cost class, 22 FOR, 23 series |
//! | `gencost` | row = cost class − 1; 2 operating cost, 3 CO2 factor |

use crate::error::{NetworkError, NetworkResult};
use serde::Serialize;

/// A named table of numeric rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub name: &'static str,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn new(name: &'static str, rows: Vec<Vec<f64>>) -> Self {
        Self { name, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at (`row`, `column`); a short row is a [`NetworkError::MissingColumn`].
    pub fn get(&self, row: usize, column: usize) -> NetworkResult<f64> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .ok_or(NetworkError::MissingColumn {
                table: self.name,
                row,
                column,
            })
    }

    /// Value at (`row`, `column`) or `default` when the row is too short.
    pub fn get_or(&self, row: usize, column: usize, default: f64) -> f64 {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .unwrap_or(default)
    }

    /// Column count of a row (0 for a missing row).
    pub fn width(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }

    /// Read a column that holds an integer id (bus numbers, classes).
    pub fn get_id(&self, row: usize, column: usize) -> NetworkResult<usize> {
        let value = self.get(row, column)?;
        if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
            return Err(NetworkError::InvalidParameter {
                table: self.name,
                row,
                message: format!("column {column} must hold a non-negative integer, got {value}"),
            });
        }
        Ok(value as usize)
    }
}

/// Raw network tables as handed over by the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTables {
    pub bus: Table,
    pub branch: Table,
    /// Candidate corridors; absent for pure operation studies
    pub xbranch: Option<Table>,
    pub gen: Table,
    pub gencost: Table,
    /// CO2 tax applied to every generator's emission factor
    pub co2_tax: f64,
}

impl RawTables {
    pub fn new(
        bus: Vec<Vec<f64>>,
        branch: Vec<Vec<f64>>,
        gen: Vec<Vec<f64>>,
        gencost: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            bus: Table::new("bus", bus),
            branch: Table::new("branch", branch),
            xbranch: None,
            gen: Table::new("gen", gen),
            gencost: Table::new("gencost", gencost),
            co2_tax: 0.0,
        }
    }

    pub fn with_candidates(mut self, xbranch: Vec<Vec<f64>>) -> Self {
        self.xbranch = Some(Table::new("xbranch", xbranch));
        self
    }

    pub fn with_co2_tax(mut self, tax: f64) -> Self {
        self.co2_tax = tax;
        self
    }
}
