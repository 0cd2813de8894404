use std::path::Path;

use tp_core::{Complex64, SystemKind};
use tp_network::Network;

fn demos() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

#[test]
fn demos_load_and_validate() {
    for name in ["dc_three_substations.yaml", "ac_duplex_branch.yaml"] {
        let path = demos().join(name);
        let topology =
            tp_topology::load(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", name, e));
        tp_topology::validate_topology(&topology)
            .unwrap_or_else(|e| panic!("Failed to validate {}: {}", name, e));
    }
}

#[test]
fn dc_demo_solves() {
    let topology = tp_topology::load(&demos().join("dc_three_substations.yaml")).unwrap();
    assert_eq!(topology.system, SystemKind::Dc);
    let mut network = Network::new(topology.to_description::<f64>().unwrap()).unwrap();
    assert_eq!(network.zone_names(), ["SS-West..SS1", "SS1..SS-East"]);

    let report = network.solve().unwrap();
    assert!(report.converged(), "{report}");
    assert!(network.solutions().iter().any(|s| s.label == "L2"));
    let compact = network.compact();
    assert_eq!(compact.substations.len(), 3);
    assert_eq!(compact.loads.len(), 2);
}

#[test]
fn ac_demo_solves() {
    let topology = tp_topology::load(&demos().join("ac_duplex_branch.yaml")).unwrap();
    let mut network = Network::new(topology.to_description::<Complex64>().unwrap()).unwrap();
    let report = network.solve().unwrap();
    assert!(report.converged(), "{report}");
    assert_eq!(report.zones.len(), 2);
    // The branch load is reachable by label although it sits in the container.
    assert!(network.state_record("L2").is_ok());
}
