//! Integration tests across the block kinds.

use tp_blocks::{
    Assembly, AutotransformerParams, Block, BlockKind, BlockParams, BlockSpec, BranchFeed,
    BranchParams, BuildContext, FeederState, JumperParams, Link, LoadParams, Placement,
    SectioningPostParams, ShortCircuitParams, Side, SplitterParams, StateRecord,
    SubstationParams, TopologyBlock, Windings,
};
use tp_core::{Complex64, Sentinels, TrackId};

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// One spec of every kind, AC so that every variant is allowed.
fn every_kind() -> Vec<BlockSpec<Complex64>> {
    let windings = Windings {
        magnetizing: c(0.0, 5_000.0),
        leakage: c(0.02, 0.3),
    };
    vec![
        BlockSpec::labelled(
            "SS1",
            BlockParams::Substation(
                SubstationParams::duplex(0.0, vec![1, 2], c(27_500.0, 0.0), c(0.1, 1.2))
                    .with_two_by_25(),
            ),
        ),
        BlockSpec::new(BlockParams::SectioningPost(
            SectioningPostParams::new(10.0, vec![1, 2]).with_autotransformer(windings),
        )),
        BlockSpec::new(BlockParams::Load(
            LoadParams::new(4.0, TrackId::main(1), c(300.0, -100.0))
                .with_phase_offset(tp_core::degrees(20.0)),
        )),
        BlockSpec::new(BlockParams::Jumper(JumperParams {
            coordinate: 6.0,
            links: vec![Link::closed(TrackId::main(1), TrackId::main(2))],
            impedance: c(0.0, 0.0),
        })),
        BlockSpec::new(BlockParams::Splitter(SplitterParams {
            coordinate: 7.0,
            branch_coordinate: 0.0,
            links: vec![Link::closed(TrackId::main(2), TrackId::contact(2, 1))],
            impedance: c(0.0, 0.0),
        })),
        BlockSpec::new(BlockParams::Branch(BranchParams {
            index: 1,
            splitter: SplitterParams {
                coordinate: 8.0,
                branch_coordinate: 0.0,
                links: vec![Link::closed(TrackId::main(1), TrackId::contact(1, 1))],
                impedance: c(0.0, 0.0),
            },
            blocks: vec![],
            feed: Some(BranchFeed {
                substation: "SS1".into(),
                side: None,
                coordinate: 0.0,
                tracks: vec![1],
                feeder: c(0.01, 0.02),
            }),
        })),
        BlockSpec::new(BlockParams::Autotransformer(AutotransformerParams {
            coordinate: 12.0,
            branch: 0,
            track: 1,
            windings,
        })),
        BlockSpec::new(BlockParams::ShortCircuit(ShortCircuitParams {
            coordinate: 9.0,
            track: TrackId::main(2),
            resistance: c(0.5, 0.0),
            active: true,
        })),
    ]
}

/// A record differing from the build defaults, per kind.
fn altered(kind: BlockKind) -> StateRecord {
    let side = |contact: Vec<bool>, supply: Vec<bool>| FeederState { contact, supply };
    match kind {
        BlockKind::Substation => StateRecord::Substation {
            left: side(vec![true, false], vec![false, true]),
            right: side(vec![false, false], vec![true, true]),
        },
        BlockKind::SectioningPost => StateRecord::SectioningPost {
            left: side(vec![false, true], vec![true, false]),
            right: side(vec![true, true], vec![false, false]),
            median: false,
        },
        BlockKind::Load => StateRecord::Load {
            current: [150.0, -40.0],
            phase_offset: 0.3,
        },
        BlockKind::Jumper => StateRecord::Jumper { links: vec![false] },
        BlockKind::Splitter => StateRecord::Splitter { links: vec![false] },
        BlockKind::Branch => StateRecord::Branch {
            splitter: vec![false],
            feeders: vec![false],
        },
        BlockKind::Autotransformer => StateRecord::Autotransformer {
            magnetizing: [0.0, 9_000.0],
            leakage: [0.04, 0.5],
        },
        BlockKind::ShortCircuit => StateRecord::ShortCircuit {
            active: false,
            resistance: [1.5, 0.0],
        },
    }
}

fn build_all() -> Vec<Block<Complex64>> {
    let mut ctx = BuildContext::default();
    every_kind()
        .into_iter()
        .map(|spec| Block::from_spec(spec, &mut ctx).unwrap())
        .collect()
}

#[test]
fn state_records_round_trip_through_json() {
    let mut first = build_all();
    let mut second = build_all();
    assert_eq!(first.len(), 8);
    for (a, b) in first.iter_mut().zip(second.iter_mut()) {
        a.update_state(&altered(a.kind())).unwrap();
        let json = serde_json::to_string(&a.state_record()).unwrap();
        let record: StateRecord = serde_json::from_str(&json).unwrap();
        b.update_state(&record).unwrap();
        assert_eq!(a.state_record(), b.state_record(), "{}", a.label());
        assert_eq!(b.state_record(), altered(b.kind()), "{}", b.label());
    }
}

#[test]
fn records_of_another_kind_are_rejected() {
    let mut blocks = build_all();
    for block in &mut blocks {
        let foreign = if block.kind() == BlockKind::Load {
            altered(BlockKind::Jumper)
        } else {
            altered(BlockKind::Load)
        };
        let err = block.update_state(&foreign).unwrap_err();
        assert!(
            matches!(err, tp_blocks::BlockError::StateKind { .. }),
            "{}: {err}",
            block.label()
        );
    }
}

#[test]
fn labels_are_generated_per_kind() {
    let labels: Vec<String> = build_all().iter().map(|b| b.label().to_string()).collect();
    assert_eq!(
        labels,
        ["SS1", "SP1", "L1", "J1", "SPL1", "BR1", "AT1", "SC1"]
    );
}

#[test]
fn only_substations_bound_a_zone() {
    let blocks = build_all();
    for block in &blocks {
        let mut asm = Assembly::new(Sentinels::default());
        let first = block.merge_into(&mut asm, Placement::First);
        assert_eq!(first.is_ok(), block.is_substation(), "{}", block.label());
    }
}

#[test]
fn branch_feeds_from_the_facing_shoulder() {
    let mut blocks = build_all();
    let ss = blocks[0].as_substation().unwrap().params().coordinate;
    let branch = blocks[5].as_branch_mut().unwrap();
    assert_eq!(branch.resolve_side(ss).unwrap(), Some(Side::Right));

    // The right shoulder faces a zone where the substation comes first.
    let mut asm = Assembly::new(Sentinels::default());
    blocks[0].merge_into(&mut asm, Placement::First).unwrap();
    let splice = blocks[5].merge_into(&mut asm, Placement::Interior).unwrap();
    let port = asm.port("SS1", Side::Right).unwrap();
    let feeder = asm.graph.edge(splice.edges[0]).unwrap();
    assert_eq!(feeder.source, port.bus);
}
