//! Fundamental cycle basis.
//!
//! A spanning forest is grown with `petgraph`'s union-find. Ordinary edges are offered in
//! ascending impedance magnitude, so the tree runs through low-impedance
//! branches and open switches end up as chords. Current-source edges come
//! last: each one closes its own fundamental cycle, whose mesh current is then
//! pinned by the source.

use std::collections::VecDeque;

use petgraph::unionfind::UnionFind;
use tp_core::{EdgeId, NodeId, Phasor, Real};

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::validate::validate_for_analysis;

/// Direction in which a cycle traverses an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Along the edge, source to target.
    Forward,
    /// Against the edge, target to source.
    Reverse,
}

impl Orientation {
    pub fn sign(self) -> Real {
        match self {
            Orientation::Forward => 1.0,
            Orientation::Reverse => -1.0,
        }
    }
}

/// One fundamental cycle: its defining chord plus the tree path closing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub chord: EdgeId,
    /// Ordered edge walk, starting with the chord traversed forward.
    pub edges: Vec<(EdgeId, Orientation)>,
}

/// Fundamental cycle basis of a graph, one cycle per chord.
#[derive(Debug, Clone, Default)]
pub struct CycleBasis {
    cycles: Vec<Cycle>,
    tree: Vec<bool>,
}

impl CycleBasis {
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cycle> {
        self.cycles.iter()
    }

    /// Whether an edge belongs to the spanning forest.
    pub fn is_tree_edge(&self, edge: EdgeId) -> bool {
        self.tree.get(edge.slot()).copied().unwrap_or(false)
    }
}

impl<T: Phasor> Graph<T> {
    /// Compute a fundamental cycle basis.
    ///
    /// Fails with [`GraphError::Open`] when the graph has no cycle and with
    /// [`GraphError::SourceBridge`] when a current source lies on the tree.
    pub fn cycle_basis(&self) -> GraphResult<CycleBasis> {
        validate_for_analysis(self)?;

        let n_nodes = self.nodes.len();
        let n_edges = self.edges.len();

        let mut order: Vec<EdgeId> = self.edges().filter(|e| !e.is_source()).map(|e| e.id).collect();
        order.sort_by(|a, b| {
            let za = self.edges[a.slot()].as_ref().map_or(0.0, |e| e.impedance.modulus());
            let zb = self.edges[b.slot()].as_ref().map_or(0.0, |e| e.impedance.modulus());
            za.total_cmp(&zb)
        });
        order.extend(self.edges().filter(|e| e.is_source()).map(|e| e.id));

        let mut sets = UnionFind::<usize>::new(n_nodes);
        let mut tree = vec![false; n_edges];
        for id in order {
            let e = self.edge(id).ok_or(GraphError::MissingEdge { edge: id })?;
            // `union` is false when both ends already share a tree.
            if sets.union(e.source.slot(), e.target.slot()) {
                tree[id.slot()] = true;
            }
        }

        if let Some(bridge) = self.edges().find(|e| e.is_source() && tree[e.id.slot()]) {
            return Err(GraphError::SourceBridge {
                edge: bridge.label.clone(),
            });
        }

        let (parent, depth) = self.root_forest(&tree);

        let mut cycles = Vec::new();
        for chord in self.edges().filter(|e| !tree[e.id.slot()]) {
            let mut walk = vec![(chord.id, Orientation::Forward)];
            let mut back = Vec::new();
            let (mut a, mut b) = (chord.target, chord.source);

            // Climb from the chord's target towards the source, meeting at the
            // lowest common ancestor.
            while a != b {
                if depth[a.slot()] >= depth[b.slot()] {
                    let (up, edge) = parent[a.slot()].ok_or(GraphError::Open)?;
                    walk.push((edge, self.traversal(edge, a)));
                    a = up;
                } else {
                    let (up, edge) = parent[b.slot()].ok_or(GraphError::Open)?;
                    back.push((edge, self.traversal(edge, up)));
                    b = up;
                }
            }
            walk.extend(back.into_iter().rev());
            cycles.push(Cycle {
                chord: chord.id,
                edges: walk,
            });
        }

        if cycles.is_empty() {
            return Err(GraphError::Open);
        }

        tracing::trace!(
            nodes = n_nodes,
            edges = n_edges,
            cycles = cycles.len(),
            "cycle basis"
        );
        Ok(CycleBasis { cycles, tree })
    }

    /// Orientation of `edge` when walked starting from `from`.
    fn traversal(&self, edge: EdgeId, from: NodeId) -> Orientation {
        match self.edge(edge) {
            Some(e) if e.source == from => Orientation::Forward,
            _ => Orientation::Reverse,
        }
    }

    /// BFS over tree edges, rooting each component (ground first).
    #[allow(clippy::type_complexity)]
    fn root_forest(&self, tree: &[bool]) -> (Vec<Option<(NodeId, EdgeId)>>, Vec<usize>) {
        let n = self.nodes.len();
        let mut adj: Vec<Vec<(NodeId, EdgeId)>> = vec![Vec::new(); n];
        for e in self.edges().filter(|e| tree[e.id.slot()]) {
            adj[e.source.slot()].push((e.target, e.id));
            adj[e.target.slot()].push((e.source, e.id));
        }

        let mut parent = vec![None; n];
        let mut depth = vec![0usize; n];
        let mut seen = vec![false; n];
        let roots = self
            .ground
            .into_iter()
            .chain(self.nodes().map(|node| node.id));

        for root in roots {
            if seen[root.slot()] {
                continue;
            }
            seen[root.slot()] = true;
            let mut queue = VecDeque::from([root]);
            while let Some(x) = queue.pop_front() {
                for &(y, edge) in &adj[x.slot()] {
                    if !seen[y.slot()] {
                        seen[y.slot()] = true;
                        parent[y.slot()] = Some((x, edge));
                        depth[y.slot()] = depth[x.slot()] + 1;
                        queue.push_back(y);
                    }
                }
            }
        }
        (parent, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgePayload;
    use tp_core::DISCONNECTED_OHMS;

    /// Net signed incidence of a cycle at every node must vanish.
    fn assert_closed(g: &Graph<f64>, cycle: &Cycle) {
        let mut balance = vec![0.0; g.node_count()];
        for &(e, o) in &cycle.edges {
            let edge = g.edge(e).unwrap();
            balance[edge.source.slot()] -= o.sign();
            balance[edge.target.slot()] += o.sign();
        }
        assert!(balance.iter().all(|b| *b == 0.0), "{balance:?}");
    }

    #[test]
    fn ladder_has_expected_rank() {
        // ground - a - b - c with rungs to ground: 3 loops
        let mut g: Graph<f64> = Graph::new();
        let gnd = g.add_ground("gnd");
        let a = g.add_node(0.0, None, "a", false);
        let b = g.add_node(1.0, None, "b", false);
        let c = g.add_node(2.0, None, "c", false);
        g.add_edge(gnd, a, EdgePayload::new("src", 0.1).with_emf(10.0)).unwrap();
        g.add_edge(a, b, EdgePayload::new("ab", 1.0)).unwrap();
        g.add_edge(b, c, EdgePayload::new("bc", 1.0)).unwrap();
        g.add_edge(b, gnd, EdgePayload::new("b0", 5.0)).unwrap();
        g.add_edge(c, gnd, EdgePayload::new("c0", 5.0)).unwrap();
        g.add_edge(gnd, c, EdgePayload::new("c1", 7.0)).unwrap();

        let basis = g.cycle_basis().unwrap();
        // E - N + components = 6 - 4 + 1
        assert_eq!(basis.len(), 3);
        for cycle in basis.iter() {
            assert_closed(&g, cycle);
            assert!(!basis.is_tree_edge(cycle.chord));
        }
    }

    #[test]
    fn tree_prefers_low_impedance() {
        let mut g: Graph<f64> = Graph::new();
        let gnd = g.add_ground("gnd");
        let a = g.add_node(0.0, None, "a", false);
        let low = g.add_edge(gnd, a, EdgePayload::new("low", 0.01)).unwrap();
        let open = g
            .add_edge(gnd, a, EdgePayload::new("open", DISCONNECTED_OHMS))
            .unwrap();
        let basis = g.cycle_basis().unwrap();
        assert!(basis.is_tree_edge(low));
        assert_eq!(basis.cycles()[0].chord, open);
        assert_eq!(
            basis.cycles()[0].edges,
            vec![(open, Orientation::Forward), (low, Orientation::Reverse)]
        );
    }

    #[test]
    fn sources_become_chords() {
        let mut g: Graph<f64> = Graph::new();
        let gnd = g.add_ground("gnd");
        let a = g.add_node(0.0, None, "a", false);
        let load = g
            .add_edge(
                gnd,
                a,
                EdgePayload::new("load", DISCONNECTED_OHMS).with_injected(100.0),
            )
            .unwrap();
        g.add_edge(gnd, a, EdgePayload::new("feed", 0.5).with_emf(600.0)).unwrap();
        let basis = g.cycle_basis().unwrap();
        assert!(!basis.is_tree_edge(load));
    }

    #[test]
    fn isolated_source_is_a_bridge() {
        let mut g: Graph<f64> = Graph::new();
        let gnd = g.add_ground("gnd");
        let a = g.add_node(0.0, None, "a", false);
        let b = g.add_node(0.0, None, "b", false);
        g.add_edge(gnd, a, EdgePayload::new("r1", 1.0)).unwrap();
        g.add_edge(a, gnd, EdgePayload::new("r2", 1.0)).unwrap();
        g.add_edge(gnd, b, EdgePayload::new("lonely", 1e9).with_injected(5.0))
            .unwrap();
        let err = g.cycle_basis().unwrap_err();
        assert_eq!(
            err,
            GraphError::SourceBridge {
                edge: "lonely".into()
            }
        );
    }

    #[test]
    fn tree_only_graph_is_open() {
        let mut g: Graph<f64> = Graph::new();
        let gnd = g.add_ground("gnd");
        let a = g.add_node(0.0, None, "a", false);
        g.add_edge(gnd, a, EdgePayload::new("only", 1.0)).unwrap();
        assert_eq!(g.cycle_basis().unwrap_err(), GraphError::Open);
    }

    #[test]
    fn self_loop_is_its_own_cycle() {
        let mut g: Graph<f64> = Graph::new();
        let gnd = g.add_ground("gnd");
        let e = g.add_edge(gnd, gnd, EdgePayload::new("loop", 1.0)).unwrap();
        let basis = g.cycle_basis().unwrap();
        assert_eq!(basis.cycles()[0].edges, vec![(e, Orientation::Forward)]);
    }
}
