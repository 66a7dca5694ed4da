//! Study configuration files and result artifacts on disk.

use grex_algo::opf::{OptimizationProblem, Tep};
use grex_algo::test_utils::{outage_network, tep_network};
use grex_algo::{
    GoodLpGateway, MonteCarloReliabilityEngine, ResultArtifact, StudyConfig, StudyError,
};
use std::io::Write;

#[test]
fn test_config_file_round_trip() {
    let mut config = StudyConfig::default();
    config.monte_carlo.seed = 42;
    config.losses.max_iterations = 8;
    config.topology.investment.units = 2;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(config.to_toml_string().unwrap().as_bytes())
        .unwrap();
    drop(file);

    let loaded = StudyConfig::from_path(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_config_file_names_the_path() {
    let err = StudyConfig::from_path("/nonexistent/grex/study.toml").unwrap_err();
    assert!(matches!(err, StudyError::Other(_)));
    assert!(err.to_string().contains("study.toml"));
}

#[test]
fn test_artifact_keeps_expansion_and_reliability_results() {
    let net = tep_network();
    let plan = Tep::default().solve(&net, &GoodLpGateway::default()).unwrap();

    let outage_net = outage_network(0.2, 0.1);
    let mut engine = MonteCarloReliabilityEngine::new(
        GoodLpGateway::default(),
        grex_algo::MonteCarloConfig {
            max_iterations: 100,
            progress_interval: 0,
            ..Default::default()
        },
    );
    let reliability = engine.run(&outage_net, None).unwrap();

    let artifact = ResultArtifact::from_dispatch(&plan).with_reliability(&reliability);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tep.json");
    artifact.save(&path).unwrap();

    let loaded = ResultArtifact::load(&path).unwrap();
    assert_eq!(loaded, artifact);
    let built: f64 = loaded.inv_t.as_ref().unwrap().iter().sum();
    assert_eq!(built, 2.0);
    assert_eq!(loaded.lolp, Some(reliability.lolp));

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    for key in ["pg", "th", "sl", "pf", "xpf", "invT", "objective", "LOLP", "EPNS", "LOLE", "EENS"] {
        assert!(raw.get(key).is_some(), "missing {key}");
    }
}
