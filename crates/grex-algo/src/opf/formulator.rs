//! Builds the abstract DC problem for a network.
//!
//! One *block* is a full copy of the dispatch variables (generation, angles,
//! shedding, circuit flows) with its own demand and generator limits. OPF and
//! TEP have a single block; scenario OPF has one block per observation,
//! weighted by the observation's weight in the objective.
//!
//! Flow sign convention, shared by every variant and by investment slots:
//! `pf = b_lin · (θ_from − θ_to)` with `b_lin = −1/x`.

use grex_core::{Network, ScenarioSet};
use grex_solver_common::{LinearExpr, LinearProblem, ModelError, Sense, VarId};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Problem variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Existing circuits only
    Opf,
    /// Adds investment slots with disjunctive flow constraints
    Tep,
    /// OPF replicated per scenario observation
    ScenarioOpf,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Opf => write!(f, "OPF"),
            Variant::Tep => write!(f, "TEP"),
            Variant::ScenarioOpf => write!(f, "scenario OPF"),
        }
    }
}

/// Variable handles of one operating block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    /// Objective weight of the block
    pub weight: f64,
    /// Demand used in the balance constraints (pu, per bus)
    pub demand: Vec<f64>,
    pub pg: Vec<VarId>,
    pub theta: Vec<VarId>,
    /// `None` for buses without a shedding variable
    pub shed: Vec<Option<VarId>>,
    pub flow: Vec<VarId>,
}

/// Variable handles of the investment slots (TEP only).
#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentLayout {
    pub flow: Vec<VarId>,
    pub build: Vec<VarId>,
}

/// A formulated problem and the map from domain indices to its variables.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub variant: Variant,
    pub problem: LinearProblem,
    pub blocks: Vec<BlockLayout>,
    pub investment: Option<InvestmentLayout>,
}

/// Per-block inputs: weight, demand and generator limits.
struct BlockInput {
    weight: f64,
    demand: Vec<f64>,
    pg_max: Vec<f64>,
}

/// Turns a [`Network`] into a [`LinearProblem`].
#[derive(Debug, Clone)]
pub struct ProblemFormulator<'a> {
    network: &'a Network,
    shed_all_buses: bool,
    shedding_cost: Option<f64>,
}

impl<'a> ProblemFormulator<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self {
            network,
            shed_all_buses: false,
            shedding_cost: None,
        }
    }

    /// Give every bus a shedding variable, not only buses with demand.
    pub fn shed_all_buses(mut self, enabled: bool) -> Self {
        self.shed_all_buses = enabled;
        self
    }

    /// Price shedding uniformly instead of using each bus's cost.
    pub fn shedding_cost(mut self, cost: f64) -> Self {
        self.shedding_cost = Some(cost);
        self
    }

    pub fn formulate(
        &self,
        variant: Variant,
        scenarios: Option<&ScenarioSet>,
    ) -> Result<Formulation, ModelError> {
        self.check_indices()?;
        let inputs = match variant {
            Variant::Opf | Variant::Tep => vec![self.base_block()],
            Variant::ScenarioOpf => {
                let set = scenarios.ok_or_else(|| {
                    ModelError::MissingData("scenario OPF needs a scenario set".into())
                })?;
                self.scenario_blocks(set)?
            }
        };

        let mut problem = LinearProblem::new();
        let mut objective = LinearExpr::new();

        let investment = if variant == Variant::Tep {
            Some(self.add_investment_variables(&mut problem, &mut objective))
        } else {
            None
        };

        let mut blocks = Vec::with_capacity(inputs.len());
        for (s, input) in inputs.into_iter().enumerate() {
            let block = self.add_block(&mut problem, &mut objective, s, input, investment.as_ref());
            blocks.push(block);
        }

        if let (Some(inv), Some(block)) = (&investment, blocks.first()) {
            self.add_disjunctive_constraints(&mut problem, inv, block);
        }

        problem.set_objective(objective);
        debug!(
            %variant,
            blocks = blocks.len(),
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "formulated problem"
        );
        Ok(Formulation {
            variant,
            problem,
            blocks,
            investment,
        })
    }

    fn check_indices(&self) -> Result<(), ModelError> {
        let net = self.network;
        let buses = net.buses.len();
        let bus_in_range = |index: usize| {
            if index < buses {
                Ok(())
            } else {
                Err(ModelError::IndexOutOfRange {
                    set: "bus",
                    index,
                    len: buses,
                })
            }
        };
        bus_in_range(net.reference_bus.value())?;
        for c in net.circuits.iter().chain(net.slots.iter().map(|s| &s.circuit)) {
            bus_in_range(c.from.value())?;
            bus_in_range(c.to.value())?;
        }
        for g in &net.generators {
            bus_in_range(g.bus.value())?;
        }
        for slot in &net.slots {
            if slot.candidate.value() >= net.candidates.len() {
                return Err(ModelError::IndexOutOfRange {
                    set: "candidate",
                    index: slot.candidate.value(),
                    len: net.candidates.len(),
                });
            }
        }
        Ok(())
    }

    fn base_block(&self) -> BlockInput {
        BlockInput {
            weight: 1.0,
            demand: self.network.buses.iter().map(|b| b.pd).collect(),
            pg_max: self.network.generators.iter().map(|g| g.pg_max).collect(),
        }
    }

    fn scenario_blocks(&self, set: &ScenarioSet) -> Result<Vec<BlockInput>, ModelError> {
        let out_of_range = |index: usize| ModelError::IndexOutOfRange {
            set: "scenario series",
            index,
            len: set.series_count(),
        };
        (0..set.observations())
            .map(|s| {
                let weight = set.weight(s).ok_or_else(|| out_of_range(s))?;
                let demand = self
                    .network
                    .buses
                    .iter()
                    .map(|b| {
                        set.value(s, b.area)
                            .map(|m| b.pd * m)
                            .ok_or_else(|| out_of_range(b.area))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let pg_max = self
                    .network
                    .generators
                    .iter()
                    .map(|g| {
                        set.availability(s, g.series)
                            .map(|m| g.pg_max * m)
                            .ok_or_else(|| out_of_range(g.series.unwrap_or_default()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(BlockInput {
                    weight,
                    demand,
                    pg_max,
                })
            })
            .collect()
    }

    fn add_investment_variables(
        &self,
        problem: &mut LinearProblem,
        objective: &mut LinearExpr,
    ) -> InvestmentLayout {
        let mut flow = Vec::with_capacity(self.network.slots.len());
        let mut build = Vec::with_capacity(self.network.slots.len());
        for (k, slot) in self.network.slots.iter().enumerate() {
            let limit = slot.circuit.flow_max;
            flow.push(problem.add_variable(format!("xpf[{k}]"), -limit, limit));
            let inv = problem.add_binary(format!("invT[{k}]"));
            objective.add_term(inv, slot.unit_cost);
            build.push(inv);
        }
        InvestmentLayout { flow, build }
    }

    fn add_block(
        &self,
        problem: &mut LinearProblem,
        objective: &mut LinearExpr,
        s: usize,
        input: BlockInput,
        investment: Option<&InvestmentLayout>,
    ) -> BlockLayout {
        let net = self.network;
        let w = input.weight;

        let pg: Vec<VarId> = net
            .generators
            .iter()
            .zip(&input.pg_max)
            .enumerate()
            .map(|(g, (gen, &max))| {
                let v = problem.add_variable(format!("pg[{s}][{g}]"), 0.0, max.max(0.0));
                objective.add_term(v, w * gen.cost);
                v
            })
            .collect();

        let theta: Vec<VarId> = net
            .bus_indices()
            .map(|b| {
                let bound = if b == net.reference_bus { 0.0 } else { PI };
                problem.add_variable(format!("th[{s}][{}]", b.value()), -bound, bound)
            })
            .collect();

        let shed: Vec<Option<VarId>> = net
            .buses
            .iter()
            .zip(&input.demand)
            .enumerate()
            .map(|(b, (bus, &demand))| {
                if !(self.shed_all_buses || bus.has_demand()) {
                    return None;
                }
                let v = problem.add_variable(format!("sl[{s}][{b}]"), 0.0, demand.max(0.0));
                objective.add_term(v, w * self.shedding_cost.unwrap_or(bus.shed_cost));
                Some(v)
            })
            .collect();

        let flow: Vec<VarId> = net
            .circuits
            .iter()
            .enumerate()
            .map(|(k, c)| {
                let v = problem.add_variable(format!("pf[{s}][{k}]"), -c.flow_max, c.flow_max);
                // pf - b_lin·θ_from + b_lin·θ_to = 0
                let law = LinearExpr::new()
                    .term(v, 1.0)
                    .term(theta[c.from.value()], -c.b_lin)
                    .term(theta[c.to.value()], c.b_lin);
                problem.add_constraint(format!("dc_law[{s}][{k}]"), law, Sense::Eq, 0.0);
                v
            })
            .collect();

        let mut balance: Vec<LinearExpr> = vec![LinearExpr::new(); net.buses.len()];
        for (g, gen) in net.generators.iter().enumerate() {
            balance[gen.bus.value()].add_term(pg[g], 1.0);
        }
        for (k, c) in net.circuits.iter().enumerate() {
            balance[c.from.value()].add_term(flow[k], -1.0);
            balance[c.to.value()].add_term(flow[k], 1.0);
        }
        if let Some(inv) = investment {
            for (k, slot) in net.slots.iter().enumerate() {
                balance[slot.circuit.from.value()].add_term(inv.flow[k], -1.0);
                balance[slot.circuit.to.value()].add_term(inv.flow[k], 1.0);
            }
        }
        for (b, expr) in balance.into_iter().enumerate() {
            let mut expr = expr;
            if let Some(sl) = shed[b] {
                expr.add_term(sl, 1.0);
            }
            problem.add_constraint(format!("balance[{s}][{b}]"), expr, Sense::Eq, input.demand[b]);
        }

        BlockLayout {
            weight: w,
            demand: input.demand,
            pg,
            theta,
            shed,
            flow,
        }
    }

    /// Big-M coupling of each slot's flow to its build decision:
    /// `-M(1-inv) ≤ xpf - b_lin·Δθ ≤ M(1-inv)` and `-inv·limit ≤ xpf ≤ inv·limit`.
    fn add_disjunctive_constraints(
        &self,
        problem: &mut LinearProblem,
        inv: &InvestmentLayout,
        block: &BlockLayout,
    ) {
        for (k, slot) in self.network.slots.iter().enumerate() {
            let c = &slot.circuit;
            let (xpf, build) = (inv.flow[k], inv.build[k]);
            let deviation = LinearExpr::new()
                .term(xpf, 1.0)
                .term(block.theta[c.from.value()], -c.b_lin)
                .term(block.theta[c.to.value()], c.b_lin);

            let mut upper = deviation.clone();
            upper.add_term(build, c.big_m);
            problem.add_constraint(format!("disj_up[{k}]"), upper, Sense::Le, c.big_m);

            let mut lower = deviation;
            lower.add_term(build, -c.big_m);
            problem.add_constraint(format!("disj_lo[{k}]"), lower, Sense::Ge, -c.big_m);

            let cap_up = LinearExpr::new().term(xpf, 1.0).term(build, -c.flow_max);
            problem.add_constraint(format!("cap_up[{k}]"), cap_up, Sense::Le, 0.0);
            let cap_lo = LinearExpr::new().term(xpf, 1.0).term(build, c.flow_max);
            problem.add_constraint(format!("cap_lo[{k}]"), cap_lo, Sense::Ge, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{shortage_network, tep_network};
    use grex_solver_common::ProblemType;

    #[test]
    fn test_opf_layout_sizes() {
        let net = shortage_network();
        let f = ProblemFormulator::new(&net).formulate(Variant::Opf, None).unwrap();
        assert_eq!(f.blocks.len(), 1);
        let block = &f.blocks[0];
        assert_eq!(block.pg.len(), 1);
        assert_eq!(block.theta.len(), 3);
        assert_eq!(block.flow.len(), 2);
        // bus 1 has no demand
        assert!(block.shed[0].is_none());
        assert!(block.shed[1].is_some() && block.shed[2].is_some());
        assert!(f.investment.is_none());
        assert_eq!(f.problem.problem_type(), ProblemType::Lp);
        // 2 DC-law rows + 3 balance rows
        assert_eq!(f.problem.num_constraints(), 5);
    }

    #[test]
    fn test_reference_bus_angle_fixed() {
        let net = shortage_network();
        let f = ProblemFormulator::new(&net).formulate(Variant::Opf, None).unwrap();
        let reference = f.blocks[0].theta[net.reference_bus.value()];
        let def = f.problem.variable(reference).unwrap();
        assert_eq!((def.lower, def.upper), (0.0, 0.0));
    }

    #[test]
    fn test_shed_all_buses_option() {
        let net = shortage_network();
        let f = ProblemFormulator::new(&net)
            .shed_all_buses(true)
            .formulate(Variant::Opf, None)
            .unwrap();
        assert!(f.blocks[0].shed.iter().all(Option::is_some));
    }

    #[test]
    fn test_tep_adds_binaries_and_disjunction() {
        let net = tep_network();
        let f = ProblemFormulator::new(&net).formulate(Variant::Tep, None).unwrap();
        let inv = f.investment.as_ref().unwrap();
        assert_eq!(inv.build.len(), net.slots.len());
        assert_eq!(f.problem.num_binaries(), net.slots.len());
        assert_eq!(f.problem.problem_type(), ProblemType::Milp);
    }

    #[test]
    fn test_scenario_variant_requires_scenarios() {
        let net = shortage_network();
        let err = ProblemFormulator::new(&net)
            .formulate(Variant::ScenarioOpf, None)
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingData(_)));
    }

    #[test]
    fn test_scenario_area_out_of_range() {
        let net = shortage_network();
        // buses sit in area 1, matrix only has series 0
        let set = ScenarioSet::from_rows(vec![vec![1.0, 1.0]]).unwrap();
        let err = ProblemFormulator::new(&net)
            .formulate(Variant::ScenarioOpf, Some(&set))
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::IndexOutOfRange {
                set: "scenario series",
                index: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_out_of_range_circuit_rejected() {
        let mut net = shortage_network();
        net.circuits[0].to = grex_core::BusIdx::new(9);
        let err = ProblemFormulator::new(&net).formulate(Variant::Opf, None).unwrap_err();
        assert!(matches!(err, ModelError::IndexOutOfRange { set: "bus", index: 9, .. }));
    }
}
