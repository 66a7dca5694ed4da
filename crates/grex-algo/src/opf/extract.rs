//! Maps solved variable values back onto domain-indexed arrays.

use super::formulator::{Formulation, Variant};
use grex_core::Network;
use grex_solver_common::SolvedProblem;
use serde::{Deserialize, Serialize};

/// Dispatch of one operating block. All quantities in pu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockResults {
    pub weight: f64,
    /// Demand the block was solved against, per bus
    pub demand: Vec<f64>,
    pub pg: Vec<f64>,
    pub theta: Vec<f64>,
    /// Per bus; zero where the bus has no shedding variable
    pub shed: Vec<f64>,
    pub flow: Vec<f64>,
}

impl BlockResults {
    pub fn total_shed(&self) -> f64 {
        self.shed.iter().sum()
    }

    pub fn total_generation(&self) -> f64 {
        self.pg.iter().sum()
    }
}

/// Investment decisions, per slot and aggregated per candidate corridor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentResults {
    pub slot_flow: Vec<f64>,
    pub slot_built: Vec<bool>,
    /// Units built per candidate corridor
    pub built_units: Vec<usize>,
    /// Summed slot flow per candidate corridor
    pub candidate_flow: Vec<f64>,
    pub investment_cost: f64,
}

/// Everything read back from one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResults {
    pub variant: Variant,
    pub objective: f64,
    pub blocks: Vec<BlockResults>,
    pub investment: Option<InvestmentResults>,
}

impl DispatchResults {
    /// Per-bus conservation residual of each block:
    /// generation + shedding − demand − net flow leaving the bus.
    pub fn power_mismatch(&self, network: &Network) -> Vec<Vec<f64>> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(s, block)| {
                let mut residual: Vec<f64> = block
                    .shed
                    .iter()
                    .zip(&block.demand)
                    .map(|(sl, pd)| sl - pd)
                    .collect();
                for (g, gen) in network.generators.iter().enumerate() {
                    residual[gen.bus.value()] += block.pg[g];
                }
                for (k, c) in network.circuits.iter().enumerate() {
                    residual[c.from.value()] -= block.flow[k];
                    residual[c.to.value()] += block.flow[k];
                }
                if let (0, Some(inv)) = (s, &self.investment) {
                    for (k, slot) in network.slots.iter().enumerate() {
                        residual[slot.circuit.from.value()] -= inv.slot_flow[k];
                        residual[slot.circuit.to.value()] += inv.slot_flow[k];
                    }
                }
                residual
            })
            .collect()
    }

    /// Largest absolute conservation residual over all blocks and buses.
    pub fn max_power_mismatch(&self, network: &Network) -> f64 {
        self.power_mismatch(network)
            .iter()
            .flatten()
            .fold(0.0, |acc, r| acc.max(r.abs()))
    }

    /// Weighted shedding over all blocks.
    pub fn expected_shed(&self) -> f64 {
        self.blocks.iter().map(|b| b.weight * b.total_shed()).sum()
    }
}

/// Reads a [`SolvedProblem`] through the variable map of a [`Formulation`].
pub struct ResultsExtractor;

impl ResultsExtractor {
    pub fn extract(
        network: &Network,
        formulation: &Formulation,
        solved: &SolvedProblem,
    ) -> DispatchResults {
        let blocks = formulation
            .blocks
            .iter()
            .map(|layout| BlockResults {
                weight: layout.weight,
                demand: layout.demand.clone(),
                pg: solved.values_of(&layout.pg),
                theta: solved.values_of(&layout.theta),
                shed: layout
                    .shed
                    .iter()
                    .map(|v| v.map_or(0.0, |v| solved.value(v)))
                    .collect(),
                flow: solved.values_of(&layout.flow),
            })
            .collect();

        let investment = formulation.investment.as_ref().map(|layout| {
            let slot_flow = solved.values_of(&layout.flow);
            let slot_built: Vec<bool> = layout.build.iter().map(|&v| solved.value(v) > 0.5).collect();
            let mut built_units = vec![0usize; network.candidates.len()];
            let mut candidate_flow = vec![0.0; network.candidates.len()];
            let mut investment_cost = 0.0;
            for (k, slot) in network.slots.iter().enumerate() {
                let c = slot.candidate.value();
                candidate_flow[c] += slot_flow[k];
                if slot_built[k] {
                    built_units[c] += 1;
                    investment_cost += slot.unit_cost;
                }
            }
            InvestmentResults {
                slot_flow,
                slot_built,
                built_units,
                candidate_flow,
                investment_cost,
            }
        });

        DispatchResults {
            variant: formulation.variant,
            objective: solved.objective,
            blocks,
            investment,
        }
    }
}
