//! End-to-end behaviour of whole lines.

use approx::assert_relative_eq;
use tp_blocks::{
    BlockParams, BlockSpec, Booster, BranchFeed, BranchParams, FeederState, Link, LoadParams,
    SectioningPostParams, Side, SplitterParams, StateRecord, SubstationParams, TopologyBlock,
};
use tp_core::{Complex64, TrackId, angle_delta, volts};
use tp_coupling::ResistanceSection;
use tp_network::{Network, NetworkDescription, NetworkError, SolverConfig};

const T1: TrackId = TrackId::main(1);

fn dc_ss(x: f64) -> BlockSpec<f64> {
    BlockSpec::new(BlockParams::Substation(SubstationParams::simple(
        x,
        vec![1],
        3600.0,
        0.0,
    )))
}

fn dc_line(blocks: Vec<BlockSpec<f64>>, end: f64) -> Network<f64> {
    let sections = vec![ResistanceSection::new(end).with(T1, T1, 0.01)];
    Network::new(NetworkDescription::new("dc", 0.0, sections, blocks)).unwrap()
}

fn ac_sections(end: f64) -> Vec<ResistanceSection<Complex64>> {
    vec![ResistanceSection::new(end).with(T1, T1, Complex64::new(0.15, 0.45))]
}

fn ac_ss(x: f64) -> SubstationParams<Complex64> {
    SubstationParams::simple(
        x,
        vec![1],
        Complex64::new(27_500.0, 0.0),
        Complex64::new(0.05, 0.5),
    )
}

fn totals(network: &Network<f64>, label: &str) -> (f64, f64) {
    let ss = network.block(label).unwrap().as_substation().unwrap();
    let total = |side| ss.shoulder(side).readings().map_or(0.0, |r| r.total);
    (total(Side::Left), total(Side::Right))
}

#[test]
fn scenario_a_symmetric_split() {
    let mut network = dc_line(
        vec![
            dc_ss(0.0),
            BlockSpec::new(BlockParams::SectioningPost(SectioningPostParams::new(5.0, vec![1]))),
            dc_ss(20.0),
        ],
        20.0,
    );
    network.add_load(LoadParams::new(10.0, T1, 100.0)).unwrap();
    let report = network.solve().unwrap();
    assert!(report.converged(), "{report}");

    assert_relative_eq!(totals(&network, "SS1").1, 50.0, epsilon = 1e-2);
    assert_relative_eq!(totals(&network, "SS2").0, 50.0, epsilon = 1e-2);
}

#[test]
fn scenario_b_load_follows_the_voltage_phase() {
    let config = SolverConfig {
        max_iterations: 1,
        ..SolverConfig::default()
    };
    let description = NetworkDescription::new(
        "ac",
        0.0,
        ac_sections(20.0),
        vec![
            BlockSpec::new(BlockParams::Substation(ac_ss(0.0))),
            BlockSpec::new(BlockParams::Substation(ac_ss(20.0))),
        ],
    )
    .with_config(config);
    let mut network = Network::new(description).unwrap();
    let label = network
        .add_load(LoadParams::new(10.0, T1, Complex64::new(300.0, 0.0)))
        .unwrap();
    network.solve().unwrap();

    // Knock the current 10° off the node voltage phase.
    let voltage = network.block(&label).unwrap().as_load().unwrap().voltage().unwrap();
    let skewed = Complex64::from_polar(300.0, voltage.arg() - 10f64.to_radians());
    network
        .update_state(
            &label,
            &StateRecord::Load {
                current: [skewed.re, skewed.im],
                phase_offset: 0.0,
            },
        )
        .unwrap();

    let report = network.solve().unwrap();
    assert_eq!(report.iterations, 1);
    let load = network.block(&label).unwrap().as_load().unwrap();
    let delta = angle_delta(load.voltage().unwrap().arg(), load.current().arg());
    assert!(delta.abs() < 1f64.to_radians(), "still {:.3}° off", delta.to_degrees());
    assert_relative_eq!(load.current().norm(), 300.0, epsilon = 1e-9);
}

#[test]
fn scenario_c_duplex_shoulders_exchange_rotated() {
    let duplex = SubstationParams::duplex(
        20.0,
        vec![1],
        Complex64::new(27_500.0, 0.0),
        Complex64::new(0.05, 0.5),
    );
    let description = NetworkDescription::new(
        "duplex",
        0.0,
        ac_sections(40.0),
        vec![
            BlockSpec::new(BlockParams::Substation(ac_ss(0.0))),
            BlockSpec::new(BlockParams::Substation(duplex)),
            BlockSpec::new(BlockParams::Substation(ac_ss(40.0))),
        ],
    );
    let mut network = Network::new(description).unwrap();
    for x in [10.0, 30.0] {
        network
            .add_load(LoadParams::new(x, T1, Complex64::new(200.0, 0.0)))
            .unwrap();
    }
    let report = network.solve().unwrap();
    assert!(report.converged(), "{report}");
    assert_eq!(network.zone_names(), ["SS1..SS2", "SS2..SS3"]);

    let ss = network.block("SS2").unwrap().as_substation().unwrap();
    let left = ss.shoulder(Side::Left).readings().unwrap();
    let right = ss.shoulder(Side::Right).readings().unwrap();
    let shift = 60f64.to_radians();
    let lead = right.total * Complex64::from_polar(1.0, shift);
    let lag = left.total * Complex64::from_polar(1.0, -shift);
    // Converged means the totals moved less than the AC tolerance since the
    // last exchange.
    assert!((left.through - lead).norm() < 1.0);
    assert!((right.through - lag).norm() < 1.0);
    assert!(left.total.norm() > 10.0 && right.total.norm() > 10.0);
}

#[test]
fn dc_exchange_levels_the_shared_busbar() {
    let ss = |x| {
        BlockSpec::new(BlockParams::Substation(SubstationParams::simple(
            x,
            vec![1],
            3600.0,
            0.05,
        )))
    };
    let mut network = dc_line(vec![ss(0.0), ss(10.0), ss(20.0)], 20.0);
    network.add_load(LoadParams::new(5.0, T1, 400.0)).unwrap();
    let report = network.solve().unwrap();
    assert!(report.converged(), "{report}");
    assert_eq!(report.zones.len(), 2);

    let mid = network.block("SS2").unwrap().as_substation().unwrap();
    let left = mid.shoulder(Side::Left).readings().unwrap();
    let right = mid.shoulder(Side::Right).readings().unwrap();
    // Both shoulders stand for one busbar once the exchange settled: each
    // side lags by at most one tolerance step through the 0.05 Ω source.
    assert!((left.bus - right.bus).abs() < 0.02, "{} vs {}", left.bus, right.bus);
    // The unloaded zone still helps through the shared busbar.
    assert!(right.total < 0.0);

    let (_, first) = totals(&network, "SS1");
    let (third, _) = totals(&network, "SS3");
    let fed: f64 = first + left.total + right.total + third;
    assert_relative_eq!(fed, 400.0, epsilon = 1e-4);
}

#[test]
fn booster_engages_above_threshold_and_resets() {
    let boosted = SubstationParams::simple(0.0, vec![1], 3300.0, 0.1).with_booster(Booster {
        emf: 3600.0,
        internal: 0.05,
        min_voltage: volts(3000.0),
    });
    let mut network = dc_line(
        vec![
            BlockSpec::new(BlockParams::Substation(boosted)),
            BlockSpec::new(BlockParams::Substation(SubstationParams::simple(
                20.0,
                vec![1],
                3300.0,
                0.1,
            ))),
        ],
        20.0,
    );
    // Threshold (3300 - 3000) / 0.1 = 3000 A; SS1 carries about 3600 A.
    network.add_load(LoadParams::new(1.0, T1, 5000.0)).unwrap();
    let report = network.solve().unwrap();
    assert_eq!(report.boosted, ["SS1"]);
    let ss1 = network.block("SS1").unwrap().as_substation().unwrap();
    assert!(ss1.is_boosted());
    let solution = network.block("SS1").unwrap().solutions().remove(0);
    assert_eq!(solution.attributes.get("boosted").map(String::as_str), Some("true"));

    network.clear_loads();
    network.add_load(LoadParams::new(1.0, T1, 100.0)).unwrap();
    let report = network.solve().unwrap();
    assert!(report.boosted.is_empty());
    assert!(!network.block("SS1").unwrap().as_substation().unwrap().is_boosted());
}

#[test]
fn load_stream_updates_the_zones() {
    let mut network = dc_line(vec![dc_ss(0.0), dc_ss(20.0)], 20.0);
    let a = network.add_load(LoadParams::new(5.0, T1, 100.0)).unwrap();
    let b = network.add_load(LoadParams::new(15.0, T1, 100.0)).unwrap();
    assert_eq!((a.as_str(), b.as_str()), ("L1", "L2"));
    network.solve().unwrap();
    let (_, ss1) = totals(&network, "SS1");
    let (ss2, _) = totals(&network, "SS2");
    assert_relative_eq!(ss1 + ss2, 200.0, epsilon = 1e-4);

    network.remove_load(&a).unwrap();
    network.solve().unwrap();
    let (_, ss1) = totals(&network, "SS1");
    assert_relative_eq!(ss1, 25.0, epsilon = 1e-2);

    assert!(matches!(
        network.remove_load("L9"),
        Err(NetworkError::UnknownLabel { .. })
    ));
    assert!(matches!(
        network.remove_load("SS1"),
        Err(NetworkError::NotALoad { .. })
    ));
    assert!(matches!(
        network.add_load(LoadParams::new(25.0, T1, 1.0)),
        Err(NetworkError::OutOfRange { .. })
    ));

    network.clear_loads();
    network.solve().unwrap();
    let (_, ss1) = totals(&network, "SS1");
    assert_relative_eq!(ss1, 0.0, epsilon = 1e-4);
    let labels: Vec<&str> = network.blocks().iter().map(|b| b.label()).collect();
    assert_eq!(labels, ["SS1", "SS2"]);
}

#[test]
fn opening_feeders_moves_the_load() {
    let mut network = dc_line(vec![dc_ss(0.0), dc_ss(20.0)], 20.0);
    network.add_load(LoadParams::new(10.0, T1, 100.0)).unwrap();
    let open = StateRecord::Substation {
        left: FeederState {
            contact: vec![true],
            supply: vec![],
        },
        right: FeederState {
            contact: vec![false],
            supply: vec![],
        },
    };
    network.update_state("SS1", &open).unwrap();
    assert_eq!(network.state_record("SS1").unwrap(), open);
    network.solve().unwrap();
    let (_, ss1) = totals(&network, "SS1");
    let (ss2, _) = totals(&network, "SS2");
    assert!(ss1.abs() < 1e-3);
    assert_relative_eq!(ss2, 100.0, epsilon = 1e-3);
}

#[test]
fn branch_loads_land_in_their_container() {
    let spur = TrackId::contact(1, 1);
    let sections =
        vec![ResistanceSection::new(20.0).with(T1, T1, 0.01).with(spur, spur, 0.02)];
    let blocks = vec![
        dc_ss(0.0),
        BlockSpec::new(BlockParams::Branch(BranchParams {
            index: 1,
            splitter: SplitterParams {
                coordinate: 8.0,
                branch_coordinate: 0.0,
                links: vec![Link::closed(T1, spur)],
                impedance: 0.0,
            },
            blocks: vec![],
            feed: None,
        })),
        dc_ss(20.0),
    ];
    let mut network = Network::new(NetworkDescription::new("spur", 0.0, sections, blocks)).unwrap();
    let label = network.add_load(LoadParams::new(3.0, spur, 100.0)).unwrap();
    assert_eq!(network.blocks().len(), 3);
    let branch = network.blocks()[1].as_branch().unwrap();
    assert_eq!(branch.blocks()[0].label(), label);

    network.solve().unwrap();
    let (_, ss1) = totals(&network, "SS1");
    let (ss2, _) = totals(&network, "SS2");
    assert_relative_eq!(ss1 + ss2, 100.0, epsilon = 1e-4);
    // The spur hangs off 8 km, so the nearer substation carries more.
    assert_relative_eq!(ss1, 60.0, epsilon = 1e-2);
    let record = network.state_record(&label).unwrap();
    assert!(matches!(record, StateRecord::Load { .. }));
    assert!(network.solutions().iter().any(|s| s.label == label));

    network.remove_load(&label).unwrap();
    assert!(network.blocks()[1].as_branch().unwrap().blocks().is_empty());
}

#[test]
fn branch_feeders_count_towards_the_shoulder_total() {
    let spur = TrackId::contact(1, 1);
    let sections =
        vec![ResistanceSection::new(20.0).with(T1, T1, 0.01).with(spur, spur, 0.02)];
    let blocks = vec![
        dc_ss(0.0),
        dc_ss(10.0),
        BlockSpec::new(BlockParams::Branch(BranchParams {
            index: 1,
            splitter: SplitterParams {
                coordinate: 15.0,
                branch_coordinate: 0.0,
                links: vec![Link {
                    a: T1,
                    b: spur,
                    closed: false,
                }],
                impedance: 0.0,
            },
            blocks: vec![],
            feed: Some(BranchFeed {
                substation: "SS2".into(),
                side: None,
                coordinate: 5.0,
                tracks: vec![1],
                feeder: 0.0,
            }),
        })),
        dc_ss(20.0),
    ];
    let mut network = Network::new(NetworkDescription::new("fed", 0.0, sections, blocks)).unwrap();
    network.add_load(LoadParams::new(3.0, spur, 400.0)).unwrap();
    let report = network.solve().unwrap();
    assert!(report.converged(), "{report}");

    let (_, ss1) = totals(&network, "SS1");
    let (ss2_left, ss2_right) = totals(&network, "SS2");
    let (ss3, _) = totals(&network, "SS3");
    // The spur only reaches the line through the SS2 feed.
    assert_relative_eq!(ss2_right, 400.0, epsilon = 1e-2);
    assert!(ss1.abs() < 1e-2 && ss2_left.abs() < 1e-2 && ss3.abs() < 1e-2);
    assert_relative_eq!(ss1 + ss2_left + ss2_right + ss3, 400.0, epsilon = 1e-2);
}
