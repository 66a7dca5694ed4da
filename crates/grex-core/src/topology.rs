//! Topology normalization: raw positional tables to a [`Network`].
//!
//! The builder converts to per-unit, merges parallel circuits, derives
//! admittances, materializes synthetic lines for islanded buses and expands
//! candidate corridors into one [`InvestmentSlot`] per buildable unit.

use crate::error::{NetworkError, NetworkResult, TopologyError};
use crate::graph_utils::islands;
use crate::network::{
    Bus, CandidateCircuit, Circuit, Generator, InvestmentSlot, Network, SyntheticLine,
};
use crate::tables::{RawTables, Table};
use crate::{BusIdx, CandidateIdx, PowerBase};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Investment limits used when the candidate table has no limit columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestmentDefaults {
    /// Buildable units per corridor
    pub units: usize,
    /// Cost per built unit
    pub unit_cost: f64,
}

impl Default for InvestmentDefaults {
    fn default() -> Self {
        Self {
            units: 3,
            unit_cost: 1e6,
        }
    }
}

/// Topology builder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub power_base: PowerBase,
    /// Largest allowed angle difference across a circuit (rad)
    #[serde(default = "default_max_angle_opening")]
    pub max_angle_opening: f64,
    /// Dense index of the angle reference bus
    #[serde(default)]
    pub reference_bus: usize,
    /// Ceiling substituted for zero ("unlimited") ratings, in MW
    #[serde(default = "default_unlimited_flow_mw")]
    pub unlimited_flow_mw: f64,
    /// Shedding cost as a multiple of the highest generator cost
    #[serde(default = "default_shedding_cost_factor")]
    pub shedding_cost_factor: f64,
    #[serde(default)]
    pub investment: InvestmentDefaults,
}

fn default_max_angle_opening() -> f64 {
    4.0 * std::f64::consts::PI
}

fn default_unlimited_flow_mw() -> f64 {
    99_999.0
}

fn default_shedding_cost_factor() -> f64 {
    100.0
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            power_base: PowerBase::default(),
            max_angle_opening: default_max_angle_opening(),
            reference_bus: 0,
            unlimited_flow_mw: default_unlimited_flow_mw(),
            shedding_cost_factor: default_shedding_cost_factor(),
            investment: InvestmentDefaults::default(),
        }
    }
}

impl TopologyConfig {
    pub fn validate(&self) -> NetworkResult<()> {
        if !(self.power_base.value() > 0.0) {
            return Err(NetworkError::Validation(format!(
                "power base must be positive, got {}",
                self.power_base
            )));
        }
        if !(self.max_angle_opening > 0.0) {
            return Err(NetworkError::Validation(format!(
                "max angle opening must be positive, got {}",
                self.max_angle_opening
            )));
        }
        if !(self.unlimited_flow_mw > 0.0) {
            return Err(NetworkError::Validation(
                "unlimited flow ceiling must be positive".into(),
            ));
        }
        if self.shedding_cost_factor < 0.0 {
            return Err(NetworkError::Validation(
                "shedding cost factor must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// A branch row reduced to single-circuit parameters plus a parallel count.
///
/// Keeping single-circuit parameters here (rather than the aggregated
/// equivalent) makes [`deduplicate_parallel`] idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub from: BusIdx,
    pub to: BusIdx,
    pub r: f64,
    pub x: f64,
    /// Total line-charging susceptance
    pub b: f64,
    /// Rating in MW, 0 = unlimited
    pub rate_mw: f64,
    pub tap: f64,
    pub forced_outage_rate: f64,
    pub parallel: usize,
    /// Candidate investment limits, when the table carries them
    pub max_units: Option<usize>,
    pub unit_cost: Option<f64>,
}

/// Merge records that share the same ordered (from, to) pair.
///
/// The first record of a pair keeps its parameters and position and absorbs
/// the parallel counts of the later ones. Reversed pairs are distinct
/// corridors.
pub fn deduplicate_parallel(records: Vec<CircuitRecord>) -> Vec<CircuitRecord> {
    let mut position: HashMap<(BusIdx, BusIdx), usize> = HashMap::new();
    let mut merged: Vec<CircuitRecord> = Vec::with_capacity(records.len());
    for record in records {
        match position.get(&(record.from, record.to)) {
            Some(&i) => {
                debug!(from = %record.from, to = %record.to, "merging parallel circuit");
                merged[i].parallel += record.parallel;
            }
            None => {
                position.insert((record.from, record.to), merged.len());
                merged.push(record);
            }
        }
    }
    merged
}

/// Builds a [`Network`] from [`RawTables`].
#[derive(Debug, Clone, Default)]
pub struct NetworkTopologyBuilder {
    config: TopologyConfig,
}

impl NetworkTopologyBuilder {
    pub fn new(config: TopologyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Normalize `tables` into a network.
    ///
    /// Fails with [`NetworkError::Topology`] when some bus stays unreachable
    /// after synthetic lines were materialized along candidate corridors.
    pub fn build(&self, tables: &RawTables) -> NetworkResult<Network> {
        self.config.validate()?;
        let base = self.config.power_base;

        let (mut buses, numbering) = parse_buses(&tables.bus, base)?;
        if self.config.reference_bus >= buses.len() {
            return Err(NetworkError::Validation(format!(
                "reference bus index {} is outside the {} declared buses",
                self.config.reference_bus,
                buses.len()
            )));
        }

        let mut circuits = parse_circuits(&tables.branch, &numbering, false)?
            .iter()
            .enumerate()
            .map(|(row, rec)| self.equivalent_circuit(rec, "branch", row))
            .collect::<NetworkResult<Vec<_>>>()?;

        let candidates = match &tables.xbranch {
            Some(table) => parse_circuits(table, &numbering, true)?
                .iter()
                .enumerate()
                .map(|(row, rec)| self.candidate(rec, row))
                .collect::<NetworkResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        let generators = parse_generators(tables, &numbering, base)?;
        let max_cost = generators.iter().map(|g| g.cost).fold(0.0, f64::max);
        for bus in &mut buses {
            bus.shed_cost = self.config.shedding_cost_factor * max_cost;
        }

        let synthetic_line = self.synthetic_line(&circuits, &candidates)?;

        mark_isolated(&mut buses, &circuits);
        if buses.iter().any(|b| b.isolated) {
            if tables.xbranch.is_none() {
                return Err(unreachable_buses(&buses).into());
            }
            let created = repair_islands(&buses, &candidates, &synthetic_line, &mut circuits);
            info!(synthetic_lines = created, "repaired isolated buses with synthetic lines");
            mark_isolated(&mut buses, &circuits);
            if buses.iter().any(|b| b.isolated) {
                return Err(unreachable_buses(&buses).into());
            }
        }

        let slots = expand_slots(&candidates);

        let network = Network {
            power_base: base,
            max_angle_opening: self.config.max_angle_opening,
            reference_bus: BusIdx::new(self.config.reference_bus),
            buses,
            circuits,
            candidates,
            slots,
            generators,
            synthetic_line,
        };

        let report = islands(&network);
        if !report.is_connected() {
            warn!(
                islands = report.count(),
                buses = ?network.bus_numbers(&report.stranded_buses()),
                "network splits into several electrical islands"
            );
        }

        info!(
            buses = network.buses.len(),
            circuits = network.circuits.len(),
            candidates = network.candidates.len(),
            slots = network.slots.len(),
            generators = network.generators.len(),
            "network built"
        );
        Ok(network)
    }

    fn equivalent_circuit(
        &self,
        rec: &CircuitRecord,
        table: &'static str,
        row: usize,
    ) -> NetworkResult<Circuit> {
        if rec.parallel == 0 {
            return Err(NetworkError::InvalidParameter {
                table,
                row,
                message: "parallel count must be at least one".into(),
            });
        }
        if rec.x == 0.0 {
            return Err(NetworkError::InvalidParameter {
                table,
                row,
                message: "series reactance must be non-zero".into(),
            });
        }
        let n = rec.parallel as f64;
        let r = rec.r / n;
        let x = rec.x / n;
        let deno = r * r + x * x;
        let b_lin = -1.0 / x;

        let unlimited = rec.rate_mw == 0.0;
        let rate_mw = if unlimited {
            self.config.unlimited_flow_mw
        } else {
            rec.rate_mw * n
        };

        Ok(Circuit {
            from: rec.from,
            to: rec.to,
            r,
            x,
            b_shunt: 0.5 * rec.b * n,
            g: r / deno,
            b: -x / deno,
            b_lin,
            flow_max: self.config.power_base.to_pu(rate_mw),
            unlimited,
            tap: if rec.tap == 0.0 { 1.0 } else { rec.tap },
            big_m: self.config.max_angle_opening * b_lin.abs(),
            parallel: rec.parallel,
            synthetic: false,
            forced_outage_rate: rec.forced_outage_rate,
        })
    }

    fn candidate(&self, rec: &CircuitRecord, row: usize) -> NetworkResult<CandidateCircuit> {
        let circuit = self.equivalent_circuit(rec, "xbranch", row)?;
        let (max_units, unit_cost) = match (rec.max_units, rec.unit_cost) {
            (Some(units), Some(cost)) => (units, cost),
            _ => (self.config.investment.units, self.config.investment.unit_cost),
        };
        Ok(CandidateCircuit {
            circuit,
            max_units,
            unit_cost,
        })
    }

    fn synthetic_line(
        &self,
        circuits: &[Circuit],
        candidates: &[CandidateCircuit],
    ) -> NetworkResult<SyntheticLine> {
        let mut limit = circuits
            .iter()
            .map(|c| c.flow_max)
            .fold(f64::INFINITY, f64::min);
        if !limit.is_finite() {
            limit = candidates
                .iter()
                .map(|c| c.circuit.flow_max)
                .fold(f64::INFINITY, f64::min);
        }
        if !limit.is_finite() {
            return Err(NetworkError::Validation(
                "network has neither circuits nor candidate corridors".into(),
            ));
        }
        Ok(SyntheticLine::from_min_limit(
            limit,
            self.config.max_angle_opening,
        ))
    }
}

fn parse_buses(table: &Table, base: PowerBase) -> NetworkResult<(Vec<Bus>, HashMap<usize, BusIdx>)> {
    if table.is_empty() {
        return Err(NetworkError::Validation("bus table is empty".into()));
    }
    let mut buses = Vec::with_capacity(table.len());
    let mut numbering = HashMap::with_capacity(table.len());
    for row in 0..table.len() {
        let number = table.get_id(row, 0)?;
        if numbering.insert(number, BusIdx::new(row)).is_some() {
            return Err(NetworkError::InvalidParameter {
                table: table.name,
                row,
                message: format!("bus number {number} is declared twice"),
            });
        }
        buses.push(Bus {
            number,
            kind: table.get(row, 1)? as i32,
            pd: base.to_pu(table.get(row, 2)?),
            qd: base.to_pu(table.get(row, 3)? - table.get(row, 5)?),
            area: table.get_id(row, 8)?,
            isolated: true,
            shed_cost: 0.0,
        });
    }
    debug!(buses = buses.len(), "parsed bus table");
    Ok((buses, numbering))
}

fn lookup_bus(
    numbering: &HashMap<usize, BusIdx>,
    table: &Table,
    row: usize,
    column: usize,
) -> NetworkResult<BusIdx> {
    let bus = table.get_id(row, column)?;
    numbering
        .get(&bus)
        .copied()
        .ok_or(NetworkError::UnknownBus {
            table: table.name,
            row,
            bus,
        })
}

fn parse_circuits(
    table: &Table,
    numbering: &HashMap<usize, BusIdx>,
    candidates: bool,
) -> NetworkResult<Vec<CircuitRecord>> {
    let mut records = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let (max_units, unit_cost, forced_outage_rate) = if candidates {
            if table.width(row) == 15 {
                (
                    Some(table.get_id(row, 13)?),
                    Some(table.get(row, 14)?),
                    0.0,
                )
            } else {
                (None, None, 0.0)
            }
        } else {
            (None, None, table.get_or(row, 13, 0.0))
        };
        if !(0.0..=1.0).contains(&forced_outage_rate) {
            return Err(NetworkError::InvalidParameter {
                table: table.name,
                row,
                message: format!("forced outage rate {forced_outage_rate} outside [0, 1]"),
            });
        }
        records.push(CircuitRecord {
            from: lookup_bus(numbering, table, row, 0)?,
            to: lookup_bus(numbering, table, row, 1)?,
            r: table.get(row, 2)?,
            x: table.get(row, 3)?,
            b: table.get(row, 4)?,
            rate_mw: table.get(row, 5)?,
            tap: table.get(row, 8)?,
            forced_outage_rate,
            parallel: 1,
            max_units,
            unit_cost,
        });
    }
    let rows = records.len();
    let merged = deduplicate_parallel(records);
    if merged.len() < rows {
        debug!(
            table = table.name,
            rows,
            circuits = merged.len(),
            "collapsed parallel circuits"
        );
    }
    Ok(merged)
}

fn parse_generators(
    tables: &RawTables,
    numbering: &HashMap<usize, BusIdx>,
    base: PowerBase,
) -> NetworkResult<Vec<Generator>> {
    let table = &tables.gen;
    let mut generators = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let cost_class = table.get_id(row, 21)?;
        if cost_class == 0 || cost_class > tables.gencost.len() {
            return Err(NetworkError::UnknownCostClass {
                generator: row,
                class: cost_class,
            });
        }
        let opex = tables.gencost.get(cost_class - 1, 2)?;
        let co2 = tables.gencost.get(cost_class - 1, 3)?;

        let forced_outage_rate = table.get_or(row, 22, 0.0);
        if !(0.0..=1.0).contains(&forced_outage_rate) {
            return Err(NetworkError::InvalidParameter {
                table: table.name,
                row,
                message: format!("forced outage rate {forced_outage_rate} outside [0, 1]"),
            });
        }
        let series = match table.get_or(row, 23, -1.0) {
            s if s < 0.0 => None,
            _ => Some(table.get_id(row, 23)?),
        };

        generators.push(Generator {
            bus: lookup_bus(numbering, table, row, 0)?,
            pg: base.to_pu(table.get(row, 1)?),
            qg: base.to_pu(table.get(row, 2)?),
            qg_max: base.to_pu(table.get(row, 3)?),
            qg_min: base.to_pu(table.get(row, 4)?),
            pg_max: base.to_pu(table.get(row, 8)?),
            pg_min: base.to_pu(table.get(row, 9)?),
            cost_class,
            cost: opex + co2 * tables.co2_tax,
            forced_outage_rate,
            series,
        });
    }
    Ok(generators)
}

/// A bus is cleared as soon as any circuit is incident to it.
fn mark_isolated(buses: &mut [Bus], circuits: &[Circuit]) {
    for bus in buses.iter_mut() {
        bus.isolated = true;
    }
    for circuit in circuits {
        for end in [circuit.from, circuit.to] {
            if let Some(bus) = buses.get_mut(end.value()) {
                bus.isolated = false;
            }
        }
    }
}

/// Materialize one synthetic line per candidate corridor incident to an
/// isolated bus. Returns the number of lines created.
fn repair_islands(
    buses: &[Bus],
    candidates: &[CandidateCircuit],
    line: &SyntheticLine,
    circuits: &mut Vec<Circuit>,
) -> usize {
    let mut materialized: HashSet<CandidateIdx> = HashSet::new();
    for (b, bus) in buses.iter().enumerate() {
        if !bus.isolated {
            continue;
        }
        let bus_idx = BusIdx::new(b);
        for (k, cand) in candidates.iter().enumerate() {
            let idx = CandidateIdx::new(k);
            if cand.circuit.touches(bus_idx) && materialized.insert(idx) {
                debug!(bus = bus.number, candidate = %idx, "creating synthetic line");
                circuits.push(Circuit::synthetic(cand.circuit.from, cand.circuit.to, line));
            }
        }
    }
    materialized.len()
}

fn unreachable_buses(buses: &[Bus]) -> TopologyError {
    TopologyError {
        buses: buses
            .iter()
            .filter(|b| b.isolated)
            .map(|b| b.number)
            .collect(),
    }
}

fn expand_slots(candidates: &[CandidateCircuit]) -> Vec<InvestmentSlot> {
    candidates
        .iter()
        .enumerate()
        .flat_map(|(k, cand)| {
            (0..cand.max_units).map(move |_| InvestmentSlot {
                candidate: CandidateIdx::new(k),
                circuit: cand.circuit.clone(),
                unit_cost: cand.unit_cost,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus_row(number: f64, pd: f64) -> Vec<f64> {
        vec![number, 1.0, pd, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]
    }

    fn branch_row(from: f64, to: f64, x: f64, rate: f64) -> Vec<f64> {
        vec![from, to, 0.01, x, 0.02, rate, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    }

    fn gen_row(bus: f64, pmax: f64, class: f64) -> Vec<f64> {
        let mut row = vec![0.0; 22];
        row[0] = bus;
        row[8] = pmax;
        row[21] = class;
        row
    }

    fn tables() -> RawTables {
        RawTables::new(
            vec![bus_row(1.0, 0.0), bus_row(2.0, 50.0), bus_row(3.0, 30.0)],
            vec![
                branch_row(1.0, 2.0, 0.1, 100.0),
                branch_row(1.0, 2.0, 0.1, 100.0),
                branch_row(2.0, 3.0, 0.2, 0.0),
            ],
            vec![gen_row(1.0, 200.0, 1.0)],
            vec![vec![0.0, 0.0, 10.0, 0.5]],
        )
        .with_co2_tax(2.0)
    }

    fn record(from: usize, to: usize) -> CircuitRecord {
        CircuitRecord {
            from: BusIdx::new(from),
            to: BusIdx::new(to),
            r: 0.0,
            x: 0.1,
            b: 0.0,
            rate_mw: 10.0,
            tap: 0.0,
            forced_outage_rate: 0.0,
            parallel: 1,
            max_units: None,
            unit_cost: None,
        }
    }

    #[test]
    fn test_dedup_merges_same_ordered_pair_only() {
        let merged = deduplicate_parallel(vec![record(0, 1), record(1, 2), record(0, 1), record(1, 0)]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].parallel, 2);
        assert_eq!((merged[2].from, merged[2].to), (BusIdx::new(1), BusIdx::new(0)));
    }

    #[test]
    fn test_parallel_circuits_aggregate_parameters() {
        let net = NetworkTopologyBuilder::default().build(&tables()).unwrap();
        assert_eq!(net.circuits.len(), 2);
        let c = &net.circuits[0];
        assert_eq!(c.parallel, 2);
        assert!((c.x - 0.05).abs() < 1e-12);
        assert!((c.r - 0.005).abs() < 1e-12);
        assert!((c.b_shunt - 0.02).abs() < 1e-12);
        assert!((c.flow_max - 2.0).abs() < 1e-12);
        assert!((c.b_lin + 20.0).abs() < 1e-9);
        assert!((c.big_m - 4.0 * std::f64::consts::PI * 20.0).abs() < 1e-9);
        assert_eq!(c.tap, 1.0);
    }

    #[test]
    fn test_unlimited_rating_uses_ceiling() {
        let net = NetworkTopologyBuilder::default().build(&tables()).unwrap();
        let c = &net.circuits[1];
        assert!(c.unlimited);
        assert!((c.flow_max - 999.99).abs() < 1e-9);
    }

    #[test]
    fn test_generator_cost_and_shedding_cost() {
        let net = NetworkTopologyBuilder::default().build(&tables()).unwrap();
        assert!((net.generators[0].cost - 11.0).abs() < 1e-12);
        assert!((net.generators[0].pg_max - 2.0).abs() < 1e-12);
        assert!(net.buses.iter().all(|b| (b.shed_cost - 1100.0).abs() < 1e-9));
        assert!(net.buses.iter().all(|b| !b.isolated));
        assert_eq!(net.demand_buses(), vec![BusIdx::new(1), BusIdx::new(2)]);
    }

    #[test]
    fn test_zero_reactance_rejected() {
        let mut t = tables();
        t.branch.rows[2][3] = 0.0;
        let err = NetworkTopologyBuilder::default().build(&t).unwrap_err();
        assert!(matches!(err, NetworkError::InvalidParameter { table: "branch", .. }));
    }

    #[test]
    fn test_unknown_bus_rejected() {
        let mut t = tables();
        t.branch.rows[2][1] = 9.0;
        let err = NetworkTopologyBuilder::default().build(&t).unwrap_err();
        assert!(matches!(err, NetworkError::UnknownBus { bus: 9, .. }));
    }

    #[test]
    fn test_isolated_bus_without_candidates_is_fatal() {
        let mut t = tables();
        t.bus.rows.push(bus_row(4.0, 10.0));
        let err = NetworkTopologyBuilder::default().build(&t).unwrap_err();
        assert_eq!(err, NetworkError::Topology(TopologyError { buses: vec![4] }));
    }

    #[test]
    fn test_candidates_use_configured_defaults() {
        let config = TopologyConfig {
            investment: InvestmentDefaults {
                units: 2,
                unit_cost: 500.0,
            },
            ..TopologyConfig::default()
        };
        let t = tables().with_candidates(vec![branch_row(1.0, 3.0, 0.1, 40.0)]);
        let net = NetworkTopologyBuilder::new(config).build(&t).unwrap();
        assert_eq!(net.candidates[0].max_units, 2);
        assert_eq!(net.slots.len(), 2);
        assert!(net.slots.iter().all(|s| s.unit_cost == 500.0));
        assert!(net.slots.iter().all(|s| s.candidate == CandidateIdx::new(0)));
    }

    #[test]
    fn test_reference_bus_validated() {
        let config = TopologyConfig {
            reference_bus: 7,
            ..TopologyConfig::default()
        };
        let err = NetworkTopologyBuilder::new(config).build(&tables()).unwrap_err();
        assert!(matches!(err, NetworkError::Validation(_)));
    }
}
