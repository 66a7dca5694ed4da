//! Small networks shared by unit and integration tests.
//!
//! Fixtures are built through [`NetworkTopologyBuilder`] from positional
//! rows, so they exercise the same path as real data. They panic if the
//! fixture itself is malformed.

use grex_core::{Network, NetworkTopologyBuilder, RawTables};

/// Bus row: number, type, Pd (MW), area 1.
pub fn bus_row(number: f64, pd: f64) -> Vec<f64> {
    vec![number, 1.0, pd, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]
}

/// Existing circuit row with reactance, resistance and rating (MW).
pub fn branch_row(from: f64, to: f64, r: f64, x: f64, rate: f64) -> Vec<f64> {
    vec![from, to, r, x, 0.0, rate, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]
}

/// Existing circuit row carrying a per-unit forced outage rate.
pub fn branch_row_with_outage(from: f64, to: f64, x: f64, rate: f64, outage: f64) -> Vec<f64> {
    let mut row = branch_row(from, to, 0.0, x, rate);
    row.push(outage);
    row
}

/// Candidate corridor row with explicit unit limit and unit cost.
pub fn candidate_row(from: f64, to: f64, x: f64, rate: f64, units: f64, cost: f64) -> Vec<f64> {
    let mut row = branch_row(from, to, 0.0, x, rate);
    row.push(units);
    row.push(cost);
    row
}

/// Generator row with Pmax (MW), cost class and forced outage rate.
pub fn gen_row(bus: f64, pmax: f64, cost_class: f64, outage: f64) -> Vec<f64> {
    let mut row = vec![0.0; 23];
    row[0] = bus;
    row[8] = pmax;
    row[21] = cost_class;
    row[22] = outage;
    row
}

/// Cost class row: opex and CO2 intensity.
pub fn cost_row(opex: f64, co2: f64) -> Vec<f64> {
    vec![0.0, 0.0, opex, co2]
}

fn build(tables: &RawTables) -> Network {
    NetworkTopologyBuilder::default()
        .build(tables)
        .expect("fixture network builds")
}

/// Three buses in series fed by a 100 MW unit at bus 1.
///
/// Bus 2 needs 50 MW, bus 3 needs 80 MW but the 2-3 circuit is rated
/// 30 MW, so 50 MW must be shed at bus 3. Generation costs 11/pu
/// (opex 10, CO2 0.5 at a tax of 2); shedding costs 100 times that.
pub fn shortage_tables() -> RawTables {
    RawTables::new(
        vec![bus_row(1.0, 0.0), bus_row(2.0, 50.0), bus_row(3.0, 80.0)],
        vec![
            branch_row(1.0, 2.0, 0.0, 0.1, 200.0),
            branch_row(2.0, 3.0, 0.0, 0.1, 30.0),
        ],
        vec![gen_row(1.0, 100.0, 1.0, 0.0)],
        vec![cost_row(10.0, 0.5)],
    )
    .with_co2_tax(2.0)
}

pub fn shortage_network() -> Network {
    build(&shortage_tables())
}

/// Bus 3 (100 MW) is reachable only through a 1-3 candidate corridor of
/// three 60 MW units at 1000 each; a 200 MW unit at bus 1 also feeds
/// bus 2 (50 MW) over an existing line.
pub fn tep_tables() -> RawTables {
    RawTables::new(
        vec![bus_row(1.0, 0.0), bus_row(2.0, 50.0), bus_row(3.0, 100.0)],
        vec![branch_row(1.0, 2.0, 0.0, 0.1, 200.0)],
        vec![gen_row(1.0, 200.0, 1.0, 0.0)],
        vec![cost_row(10.0, 0.0)],
    )
    .with_candidates(vec![candidate_row(1.0, 3.0, 0.1, 60.0, 3.0, 1000.0)])
}

pub fn tep_network() -> Network {
    build(&tep_tables())
}

/// Lossy triangle: r = 0.02, x = 0.1 on every side, 200 MW at bus 1,
/// 60 MW at bus 2 and 40 MW at bus 3.
pub fn mesh_tables() -> RawTables {
    RawTables::new(
        vec![bus_row(1.0, 0.0), bus_row(2.0, 60.0), bus_row(3.0, 40.0)],
        vec![
            branch_row(1.0, 2.0, 0.02, 0.1, 300.0),
            branch_row(2.0, 3.0, 0.02, 0.1, 300.0),
            branch_row(1.0, 3.0, 0.02, 0.1, 300.0),
        ],
        vec![gen_row(1.0, 200.0, 1.0, 0.0)],
        vec![cost_row(10.0, 0.0)],
    )
}

pub fn mesh_network() -> Network {
    build(&mesh_tables())
}

/// Two buses joined by a double circuit, each unit failing with
/// `line_outage`, and a generator failing with `gen_outage`.
pub fn outage_tables(line_outage: f64, gen_outage: f64) -> RawTables {
    RawTables::new(
        vec![bus_row(1.0, 0.0), bus_row(2.0, 80.0)],
        vec![
            branch_row_with_outage(1.0, 2.0, 0.2, 60.0, line_outage),
            branch_row_with_outage(1.0, 2.0, 0.2, 60.0, line_outage),
        ],
        vec![
            gen_row(1.0, 60.0, 1.0, gen_outage),
            gen_row(1.0, 60.0, 1.0, gen_outage),
        ],
        vec![cost_row(10.0, 0.0)],
    )
}

pub fn outage_network(line_outage: f64, gen_outage: f64) -> Network {
    build(&outage_tables(line_outage, gen_outage))
}
