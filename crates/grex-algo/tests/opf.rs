//! DC-OPF on the three-bus shortage network.

use grex_algo::opf::{OptimizationProblem, Opf};
use grex_algo::test_utils::{mesh_network, shortage_network};
use grex_algo::GoodLpGateway;
use grex_core::BusIdx;

const TOL: f64 = 1e-6;

#[test]
fn test_shortage_shed_only_where_supply_is_cut_off() {
    let net = shortage_network();
    let results = Opf.solve(&net, &GoodLpGateway::default()).unwrap();
    let block = &results.blocks[0];

    // bus 2 is fully served, bus 3 gets only what the 30 MW circuit carries
    assert!(block.shed[BusIdx::new(1).value()].abs() < TOL);
    assert!((block.shed[BusIdx::new(2).value()] - 0.5).abs() < TOL);
    assert_eq!(block.shed[0], 0.0);
    assert!((block.total_generation() - 0.8).abs() < TOL);
    assert!((block.flow[1] - 0.3).abs() < TOL);

    // 11/pu generation, 1100/pu shedding
    assert!((results.objective - 558.8).abs() < 1e-4);
}

#[test]
fn test_power_is_conserved_at_every_bus() {
    for net in [shortage_network(), mesh_network()] {
        let results = Opf.solve(&net, &GoodLpGateway::default()).unwrap();
        assert!(
            results.max_power_mismatch(&net) < TOL,
            "mismatch {:?}",
            results.power_mismatch(&net)
        );
    }
}

#[test]
fn test_flows_follow_angle_differences() {
    let net = mesh_network();
    let results = Opf.solve(&net, &GoodLpGateway::default()).unwrap();
    let block = &results.blocks[0];
    assert_eq!(block.theta[net.reference_bus.value()], 0.0);
    for (k, c) in net.circuits.iter().enumerate() {
        let expected = c.dc_flow(block.theta[c.from.value()], block.theta[c.to.value()]);
        assert!((block.flow[k] - expected).abs() < TOL);
    }
    assert!(block.total_shed() < TOL);
}
