//! Computational network: buses, circuits, candidate corridors, investment
//! slots and generators.
//!
//! Collections are dense and addressed with the typed indices from the crate
//! root. Fields that studies mutate between solves (`Bus::pd`,
//! `Circuit::flow_max`, `Circuit::b_lin`, `Generator::pg_max`) are plain
//! values; studies work on a clone and restore from the base network.

use crate::{BusIdx, CandidateIdx, CircuitIdx, GenIdx, PowerBase, SlotIdx};
use serde::{Deserialize, Serialize};

/// A network bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    /// External bus number from the bus table
    pub number: usize,
    /// Bus type code (1 = PQ, 2 = PV, 3 = reference)
    pub kind: i32,
    /// Active power demand (pu)
    pub pd: f64,
    /// Net reactive demand (pu), reactive injection already subtracted
    pub qd: f64,
    /// Area id, addresses a scenario series column
    pub area: usize,
    /// Set while no in-service circuit touches the bus
    pub isolated: bool,
    /// Load-shedding cost per pu
    pub shed_cost: f64,
}

impl Bus {
    pub fn has_demand(&self) -> bool {
        self.pd > 0.0
    }
}

/// An existing (or synthetic) circuit after parallel-circuit aggregation.
///
/// Electrical parameters are the equivalent of the whole parallel group:
/// series impedance divided by `parallel`, shunt and thermal limit multiplied
/// by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    pub from: BusIdx,
    pub to: BusIdx,
    /// Series resistance (pu)
    pub r: f64,
    /// Series reactance (pu)
    pub x: f64,
    /// Half line-charging susceptance (pu)
    pub b_shunt: f64,
    /// Series conductance r/(r²+x²)
    pub g: f64,
    /// Series susceptance -x/(r²+x²)
    pub b: f64,
    /// Linearized susceptance -1/x used by the DC flow law
    pub b_lin: f64,
    /// Thermal limit (pu)
    pub flow_max: f64,
    /// Zero rating in the source table, `flow_max` holds the ceiling
    pub unlimited: bool,
    /// Transformer tap (1 for lines)
    pub tap: f64,
    /// Big-M bound for the disjunctive angle term
    pub big_m: f64,
    /// Number of merged parallel circuits
    pub parallel: usize,
    /// Materialized by island repair, not present in the source data
    pub synthetic: bool,
    /// Forced outage rate of a single parallel unit
    pub forced_outage_rate: f64,
}

impl Circuit {
    /// Synthetic "dumb" line used to keep an islanded bus attached.
    pub fn synthetic(from: BusIdx, to: BusIdx, line: &SyntheticLine) -> Self {
        Self {
            from,
            to,
            r: 0.0,
            x: -1.0 / line.b_lin,
            b_shunt: 0.0,
            g: 0.0,
            b: line.b_lin,
            b_lin: line.b_lin,
            flow_max: line.flow_max,
            unlimited: false,
            tap: 1.0,
            big_m: line.big_m,
            parallel: 1,
            synthetic: true,
            forced_outage_rate: 0.0,
        }
    }

    #[inline]
    pub fn touches(&self, bus: BusIdx) -> bool {
        self.from == bus || self.to == bus
    }

    /// DC flow from `from` to `to` for the given terminal angles.
    #[inline]
    pub fn dc_flow(&self, theta_from: f64, theta_to: f64) -> f64 {
        self.b_lin * (theta_from - theta_to)
    }

    /// Quadratic loss estimate `0.5·g·Δθ²`.
    #[inline]
    pub fn loss(&self, theta_from: f64, theta_to: f64) -> f64 {
        let delta = theta_from - theta_to;
        0.5 * self.g * delta * delta
    }
}

/// A candidate corridor: circuit parameters plus investment limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCircuit {
    pub circuit: Circuit,
    /// Maximum number of buildable units
    pub max_units: usize,
    /// Investment cost per built unit
    pub unit_cost: f64,
}

/// One buildable unit of a candidate corridor; the 0/1 decision unit of TEP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentSlot {
    pub candidate: CandidateIdx,
    /// Replica of the parent corridor's electrical parameters
    pub circuit: Circuit,
    pub unit_cost: f64,
}

/// A generating unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub bus: BusIdx,
    pub pg: f64,
    pub qg: f64,
    pub qg_max: f64,
    pub qg_min: f64,
    pub pg_max: f64,
    pub pg_min: f64,
    /// 1-based cost class from the generator table
    pub cost_class: usize,
    /// Linear cost per pu: operating cost + CO2 tax × emission factor
    pub cost: f64,
    pub forced_outage_rate: f64,
    /// Scenario series column scaling availability; `None` = always available
    pub series: Option<usize>,
}

/// Parameters of the synthetic lines created by island repair.
///
/// Capacity is 1.1× a hundredth of the smallest real limit; susceptance is
/// sized so the flow bound is reached at the maximum angle opening.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticLine {
    pub flow_max: f64,
    pub b_lin: f64,
    pub big_m: f64,
}

impl SyntheticLine {
    pub fn from_min_limit(min_flow_max: f64, max_angle_opening: f64) -> Self {
        let scaled = min_flow_max / 100.0;
        let flow_max = 1.1 * scaled;
        Self {
            flow_max,
            b_lin: -scaled / max_angle_opening,
            big_m: flow_max,
        }
    }
}

/// The normalized computational network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub power_base: PowerBase,
    pub max_angle_opening: f64,
    /// Bus whose angle is fixed at zero
    pub reference_bus: BusIdx,
    pub buses: Vec<Bus>,
    pub circuits: Vec<Circuit>,
    pub candidates: Vec<CandidateCircuit>,
    pub slots: Vec<InvestmentSlot>,
    pub generators: Vec<Generator>,
    pub synthetic_line: SyntheticLine,
}

impl Network {
    pub fn bus(&self, idx: BusIdx) -> Option<&Bus> {
        self.buses.get(idx.value())
    }

    pub fn circuit(&self, idx: CircuitIdx) -> Option<&Circuit> {
        self.circuits.get(idx.value())
    }

    pub fn candidate(&self, idx: CandidateIdx) -> Option<&CandidateCircuit> {
        self.candidates.get(idx.value())
    }

    pub fn slot(&self, idx: SlotIdx) -> Option<&InvestmentSlot> {
        self.slots.get(idx.value())
    }

    pub fn generator(&self, idx: GenIdx) -> Option<&Generator> {
        self.generators.get(idx.value())
    }

    pub fn bus_indices(&self) -> impl Iterator<Item = BusIdx> {
        (0..self.buses.len()).map(BusIdx::new)
    }

    pub fn circuit_indices(&self) -> impl Iterator<Item = CircuitIdx> {
        (0..self.circuits.len()).map(CircuitIdx::new)
    }

    pub fn slot_indices(&self) -> impl Iterator<Item = SlotIdx> {
        (0..self.slots.len()).map(SlotIdx::new)
    }

    pub fn generator_indices(&self) -> impl Iterator<Item = GenIdx> {
        (0..self.generators.len()).map(GenIdx::new)
    }

    /// Buses with positive demand, in index order.
    pub fn demand_buses(&self) -> Vec<BusIdx> {
        self.bus_indices()
            .filter(|&b| self.buses[b.value()].has_demand())
            .collect()
    }

    /// Total active demand (pu).
    pub fn total_demand(&self) -> f64 {
        self.buses.iter().map(|b| b.pd).sum()
    }

    /// Total generation capacity (pu).
    pub fn total_capacity(&self) -> f64 {
        self.generators.iter().map(|g| g.pg_max).sum()
    }

    pub fn generators_at(&self, bus: BusIdx) -> impl Iterator<Item = GenIdx> + '_ {
        self.generator_indices()
            .filter(move |g| self.generators[g.value()].bus == bus)
    }

    pub fn circuits_at(&self, bus: BusIdx) -> impl Iterator<Item = CircuitIdx> + '_ {
        self.circuit_indices()
            .filter(move |k| self.circuits[k.value()].touches(bus))
    }

    pub fn synthetic_circuit_count(&self) -> usize {
        self.circuits.iter().filter(|c| c.synthetic).count()
    }

    pub fn max_generator_cost(&self) -> f64 {
        self.generators.iter().map(|g| g.cost).fold(0.0, f64::max)
    }

    pub fn max_slot_cost(&self) -> f64 {
        self.slots.iter().map(|s| s.unit_cost).fold(0.0, f64::max)
    }

    /// Multiply every bus demand by `factor`.
    pub fn scale_demand(&mut self, factor: f64) {
        for bus in &mut self.buses {
            bus.pd *= factor;
            bus.qd *= factor;
        }
    }

    /// Multiply every generator's active limits by `factor`.
    pub fn scale_generation(&mut self, factor: f64) {
        for gen in &mut self.generators {
            gen.pg_max *= factor;
            gen.pg_min *= factor;
        }
    }

    /// Put every bus in area 0, for scenario matrices with a single demand
    /// series.
    pub fn collapse_areas(&mut self) {
        for bus in &mut self.buses {
            bus.area = 0;
        }
    }

    /// Set the same shedding cost on every bus.
    pub fn set_shedding_cost(&mut self, cost: f64) {
        for bus in &mut self.buses {
            bus.shed_cost = cost;
        }
    }

    /// External bus numbers for a set of dense indices.
    pub fn bus_numbers(&self, buses: &[BusIdx]) -> Vec<usize> {
        buses
            .iter()
            .filter_map(|b| self.bus(*b).map(|bus| bus.number))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_line_sizing() {
        let line = SyntheticLine::from_min_limit(2.0, 4.0 * std::f64::consts::PI);
        assert!((line.flow_max - 0.022).abs() < 1e-12);
        assert!((line.b_lin + 0.02 / (4.0 * std::f64::consts::PI)).abs() < 1e-12);
        assert_eq!(line.big_m, line.flow_max);
    }

    #[test]
    fn test_synthetic_circuit_carries_dumb_parameters() {
        let line = SyntheticLine::from_min_limit(1.0, 1.0);
        let c = Circuit::synthetic(BusIdx::new(0), BusIdx::new(2), &line);
        assert!(c.synthetic);
        assert_eq!(c.b_lin, line.b_lin);
        assert!(c.x > 0.0);
        assert!((c.b_lin + 1.0 / c.x).abs() < 1e-12);
        assert_eq!(c.flow_max, line.flow_max);
        assert!(c.touches(BusIdx::new(2)));
        assert!(!c.touches(BusIdx::new(1)));
        assert_eq!(c.loss(0.1, 0.0), 0.0);
    }

    #[test]
    fn test_dc_flow_sign_convention() {
        let line = SyntheticLine::from_min_limit(1.0, 1.0);
        let mut c = Circuit::synthetic(BusIdx::new(0), BusIdx::new(1), &line);
        c.b_lin = -10.0;
        assert!((c.dc_flow(0.0, 0.05) - 0.5).abs() < 1e-12);
    }
}
