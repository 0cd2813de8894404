//! Integration tests for tp-graph.

use proptest::prelude::*;
use tp_core::{Complex64, EdgeId, TrackId};
use tp_graph::{EdgePayload, Graph, GraphError, Orientation};

/// Substation feeding two line nodes over a short section, with a load.
fn feeder_section() -> Graph<Complex64> {
    let mut g = Graph::new();
    let gnd = g.add_ground("rail");
    let bus = g.add_node(0.0, None, "bus", false);
    let a = g.add_node(0.0, Some(TrackId::main(1)), "a", true);
    let b = g.add_node(5.0, Some(TrackId::main(1)), "b", false);
    g.add_edge(
        gnd,
        bus,
        EdgePayload::new("emf", Complex64::new(0.1, 0.5)).with_emf(Complex64::new(27_500.0, 0.0)),
    )
    .unwrap();
    g.add_edge(bus, a, EdgePayload::new("feeder", Complex64::new(1e-6, 0.0)))
        .unwrap();
    g.add_edge(a, b, EdgePayload::new("wire", Complex64::new(0.5, 2.0)))
        .unwrap();
    g.add_edge(
        gnd,
        b,
        EdgePayload::new("load", Complex64::new(1e9, 0.0)).with_injected(Complex64::new(100.0, 0.0)),
    )
    .unwrap();
    g
}

#[test]
fn single_mesh_walks_whole_loop() {
    let g = feeder_section();
    let basis = g.cycle_basis().unwrap();
    assert_eq!(basis.len(), 1);
    let cycle = &basis.cycles()[0];
    assert_eq!(cycle.edges.len(), 4);
    let load = EdgeId::from_index(3);
    assert_eq!(cycle.chord, load);
    assert_eq!(cycle.edges[0], (load, Orientation::Forward));
}

#[test]
fn absorbed_blocks_share_ground_and_cycles_add_up() {
    let block = feeder_section();
    let mut zone: Graph<Complex64> = Graph::new();
    zone.add_ground("rail");
    let first = zone.absorb(&block).unwrap();
    let second = zone.absorb(&block).unwrap();
    // Tie the two line ends together.
    zone.add_edge(
        first.nodes[3],
        second.nodes[3],
        EdgePayload::new("tie", Complex64::new(0.2, 0.8)),
    )
    .unwrap();
    let basis = zone.cycle_basis().unwrap();
    // 9 edges, 7 nodes, 1 component
    assert_eq!(basis.len(), 3);
}

#[test]
fn removed_elements_block_analysis_until_renumbered() {
    let mut g = feeder_section();
    g.add_edge(
        tp_core::NodeId::from_index(0),
        tp_core::NodeId::from_index(2),
        EdgePayload::new("spare", Complex64::new(3.0, 0.0)),
    )
    .unwrap();
    g.remove_edge(EdgeId::from_index(4)).unwrap();
    assert_eq!(g.cycle_basis().unwrap_err(), GraphError::NotDense);
    g.renumber();
    assert_eq!(g.cycle_basis().unwrap().len(), 1);
}

proptest! {
    /// A ladder of `n` rungs has `n` independent meshes, each closed.
    #[test]
    fn ladder_rank(rungs in 1usize..12, seed in 0.01f64..10.0) {
        let mut g: Graph<f64> = Graph::new();
        let gnd = g.add_ground("rail");
        let mut prev = g.add_node(0.0, Some(TrackId::main(1)), "n0", false);
        g.add_edge(gnd, prev, EdgePayload::new("emf", 0.1).with_emf(3300.0)).unwrap();
        for i in 0..rungs {
            let next = g.add_node((i + 1) as f64, Some(TrackId::main(1)), format!("n{}", i + 1), false);
            g.add_edge(prev, next, EdgePayload::new(format!("w{i}"), seed * (i + 1) as f64)).unwrap();
            g.add_edge(next, gnd, EdgePayload::new(format!("r{i}"), 1e9).with_injected(seed)).unwrap();
            prev = next;
        }
        let basis = g.cycle_basis().unwrap();
        prop_assert_eq!(basis.len(), rungs);
        for cycle in basis.iter() {
            let mut balance = vec![0.0; g.node_count()];
            for &(e, o) in &cycle.edges {
                let edge = g.edge(e).unwrap();
                balance[edge.source.slot()] -= o.sign();
                balance[edge.target.slot()] += o.sign();
            }
            prop_assert!(balance.iter().all(|b| *b == 0.0));
        }
    }
}
