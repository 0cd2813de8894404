use tp_core::{SystemKind, TrackId};
use tp_topology::schema::*;
use tp_topology::{TopologyError, load_json, load_yaml, parse_yaml, save_json, save_yaml};

fn substation(label: &str, x: f64) -> BlockDef {
    BlockDef {
        label: Some(label.to_string()),
        kind: BlockKindDef::Substation {
            coordinate_km: x,
            tracks: vec![1],
            emf: PhasorDef::Parts([27_500.0, 0.0]),
            internal: PhasorDef::Parts([0.05, 0.5]),
            feeder: PhasorDef::default(),
            kind: SubstationKindDef::Duplex,
            two_by_25: true,
            leading: None,
            booster: None,
        },
    }
}

fn topology() -> Topology {
    let main = TrackId::main(1);
    Topology {
        version: 1,
        name: "Two by 25".to_string(),
        system: SystemKind::Ac,
        line: LineDef {
            start_km: 0.0,
            end_km: 30.0,
        },
        solver: Some(SolverDef {
            max_iterations: Some(15),
            ..SolverDef::default()
        }),
        sentinels: None,
        sections: vec![SectionDef {
            until_km: 30.0,
            resistivity: vec![
                ResistivityDef {
                    a: main,
                    b: main,
                    value: PhasorDef::Parts([0.15, 0.45]),
                },
                ResistivityDef {
                    a: TrackId::supply(0, 1),
                    b: TrackId::supply(0, 1),
                    value: PhasorDef::Parts([0.15, 0.45]),
                },
                ResistivityDef {
                    a: main,
                    b: TrackId::supply(0, 1),
                    value: PhasorDef::Parts([0.05, 0.25]),
                },
            ],
        }],
        blocks: vec![
            substation("SS-A", 0.0),
            BlockDef {
                label: None,
                kind: BlockKindDef::SectioningPost {
                    coordinate_km: 15.0,
                    branch: 0,
                    tracks: vec![1],
                    feeder: PhasorDef::default(),
                    two_by_25: true,
                    autotransformer: Some(WindingsDef {
                        magnetizing: PhasorDef::Parts([0.0, 5000.0]),
                        leakage: PhasorDef::Parts([0.01, 0.1]),
                    }),
                },
            },
            BlockDef {
                label: None,
                kind: BlockKindDef::Load {
                    coordinate_km: 7.5,
                    track: main,
                    current: PhasorDef::Parts([400.0, 0.0]),
                    phase_offset_deg: 15.0,
                },
            },
            substation("SS-B", 30.0),
        ],
    }
}

#[test]
fn roundtrip_yaml() {
    let topology = topology();
    let path = std::env::temp_dir().join("tp_topology_roundtrip.yaml");
    save_yaml(&path, &topology).unwrap();
    let loaded = load_yaml(&path).unwrap();
    assert_eq!(topology, loaded);
}

#[test]
fn roundtrip_json() {
    let topology = topology();
    let path = std::env::temp_dir().join("tp_topology_roundtrip.json");
    save_json(&path, &topology).unwrap();
    let loaded = load_json(&path).unwrap();
    assert_eq!(topology, loaded);
}

#[test]
fn invalid_documents_are_not_saved() {
    let mut topology = topology();
    topology.system = SystemKind::Dc;
    let path = std::env::temp_dir().join("tp_topology_invalid.yaml");
    assert!(matches!(
        save_yaml(&path, &topology),
        Err(TopologyError::Validation(_))
    ));
}

#[test]
fn bad_track_ids_fail_to_parse() {
    let yaml = r#"
version: 1
name: broken
system: dc
line: { start_km: 0.0, end_km: 1.0 }
sections:
  - until_km: 1.0
    resistivity:
      - { a: "track one", b: "0.1c", value: 0.01 }
"#;
    assert!(matches!(parse_yaml(yaml), Err(TopologyError::Yaml(_))));
}
