use crate::{BusIdx, Network};
use petgraph::unionfind::UnionFind;
use std::collections::BTreeMap;

/// Electrical islands of a network, labelled by union-find over its circuits.
///
/// Island repair clears buses by direct incidence, which does not prove the
/// whole network is one component; this report is the full-graph check.
#[derive(Debug, Clone, PartialEq)]
pub struct IslandReport {
    /// Buses of each island, largest island first
    pub islands: Vec<Vec<BusIdx>>,
}

impl IslandReport {
    pub fn count(&self) -> usize {
        self.islands.len()
    }

    pub fn is_connected(&self) -> bool {
        self.islands.len() <= 1
    }

    /// Buses outside the largest island.
    pub fn stranded_buses(&self) -> Vec<BusIdx> {
        self.islands.iter().skip(1).flatten().copied().collect()
    }
}

/// Group buses into islands connected by the network's circuits.
pub fn islands(network: &Network) -> IslandReport {
    let n = network.buses.len();
    let mut uf = UnionFind::<usize>::new(n);
    for circuit in &network.circuits {
        let (a, b) = (circuit.from.value(), circuit.to.value());
        if a < n && b < n {
            uf.union(a, b);
        }
    }

    let mut groups: BTreeMap<usize, Vec<BusIdx>> = BTreeMap::new();
    for bus in 0..n {
        groups.entry(uf.find(bus)).or_default().push(BusIdx::new(bus));
    }
    let mut islands: Vec<Vec<BusIdx>> = groups.into_values().collect();
    // Stable: ties keep the order of their smallest bus
    islands.sort_by(|a, b| b.len().cmp(&a.len()));
    IslandReport { islands }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bus, Circuit, PowerBase, SyntheticLine};

    fn network(bus_count: usize, edges: &[(usize, usize)]) -> Network {
        let line = SyntheticLine::from_min_limit(1.0, 1.0);
        Network {
            power_base: PowerBase::default(),
            max_angle_opening: 1.0,
            reference_bus: BusIdx::new(0),
            buses: (0..bus_count)
                .map(|i| Bus {
                    number: i + 1,
                    kind: 1,
                    pd: 0.0,
                    qd: 0.0,
                    area: 0,
                    isolated: false,
                    shed_cost: 0.0,
                })
                .collect(),
            circuits: edges
                .iter()
                .map(|&(a, b)| Circuit::synthetic(BusIdx::new(a), BusIdx::new(b), &line))
                .collect(),
            candidates: Vec::new(),
            slots: Vec::new(),
            generators: Vec::new(),
            synthetic_line: line,
        }
    }

    #[test]
    fn test_single_island() {
        let report = islands(&network(3, &[(0, 1), (1, 2)]));
        assert!(report.is_connected());
        assert_eq!(report.islands[0].len(), 3);
    }

    #[test]
    fn test_two_islands_largest_first() {
        let report = islands(&network(5, &[(0, 1), (2, 3), (3, 4)]));
        assert_eq!(report.count(), 2);
        assert_eq!(
            report.islands[0],
            vec![BusIdx::new(2), BusIdx::new(3), BusIdx::new(4)]
        );
        assert_eq!(report.stranded_buses(), vec![BusIdx::new(0), BusIdx::new(1)]);
    }

    #[test]
    fn test_parallel_edges_and_lone_buses() {
        let report = islands(&network(4, &[(0, 1), (1, 0), (1, 2)]));
        assert_eq!(report.count(), 2);
        assert_eq!(report.stranded_buses(), vec![BusIdx::new(3)]);
        assert_eq!(islands(&network(0, &[])).count(), 0);
    }
}
