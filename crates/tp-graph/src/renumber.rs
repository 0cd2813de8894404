//! Dense reindexing and splicing.
//!
//! Solvers address nodes and edges by contiguous indices (0..N). After
//! removals the arena has holes; `renumber` closes them and reports where
//! every surviving element went. `absorb` copies a whole graph into another
//! and reports the same kind of mapping.

use tp_core::{EdgeId, NodeId, Phasor};

use crate::error::{GraphError, GraphResult};
use crate::graph::{Coupling, Edge, EdgePayload, Graph, Node};

/// Old-slot to new-id mapping produced by [`Graph::renumber`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renumbering {
    /// Indexed by old node slot; `None` for removed nodes.
    pub nodes: Vec<Option<NodeId>>,
    /// Indexed by old edge slot; `None` for removed edges.
    pub edges: Vec<Option<EdgeId>>,
}

impl Renumbering {
    pub fn node(&self, old: NodeId) -> Option<NodeId> {
        self.nodes.get(old.slot()).copied().flatten()
    }

    pub fn edge(&self, old: EdgeId) -> Option<EdgeId> {
        self.edges.get(old.slot()).copied().flatten()
    }

    /// Whether any id moved.
    pub fn is_identity(&self) -> bool {
        self.nodes
            .iter()
            .enumerate()
            .all(|(i, n)| n.is_some_and(|n| n.slot() == i))
            && self
                .edges
                .iter()
                .enumerate()
                .all(|(i, e)| e.is_some_and(|e| e.slot() == i))
    }
}

/// Where the elements of a spliced subgraph landed in the host graph.
///
/// Indexed by the subgraph's own slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Splice {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    /// Splices of nested subgraphs, in the order their owner merged them.
    pub children: Vec<Splice>,
}

impl Splice {
    /// Host id of a local node.
    pub fn node(&self, local: NodeId) -> GraphResult<NodeId> {
        self.nodes.get(local.slot()).copied().ok_or_else(|| GraphError::MissingNode {
            edge: String::from("<splice>"),
            node: local,
        })
    }

    /// Host id of a local edge.
    pub fn edge(&self, local: EdgeId) -> GraphResult<EdgeId> {
        self.edges
            .get(local.slot())
            .copied()
            .ok_or(GraphError::MissingEdge { edge: local })
    }

    /// Apply a host renumbering to this splice (and its children).
    ///
    /// Elements the host dropped make the splice stale, which is reported as
    /// a missing element.
    pub fn remap(&mut self, map: &Renumbering) -> GraphResult<()> {
        for n in &mut self.nodes {
            *n = map.node(*n).ok_or_else(|| GraphError::MissingNode {
                edge: String::from("<splice>"),
                node: *n,
            })?;
        }
        for e in &mut self.edges {
            *e = map.edge(*e).ok_or(GraphError::MissingEdge { edge: *e })?;
        }
        for child in &mut self.children {
            child.remap(map)?;
        }
        Ok(())
    }
}

impl<T: Phasor> Graph<T> {
    /// Compact tombstones so ids are dense again.
    pub fn renumber(&mut self) -> Renumbering {
        let mut map = Renumbering {
            nodes: vec![None; self.nodes.len()],
            edges: vec![None; self.edges.len()],
        };

        let mut nodes: Vec<Option<Node<T>>> = Vec::with_capacity(self.nodes.len());
        for (old, slot) in self.nodes.drain(..).enumerate() {
            if let Some(mut node) = slot {
                let id = NodeId::from_usize(nodes.len());
                map.nodes[old] = Some(id);
                node.id = id;
                nodes.push(Some(node));
            }
        }
        self.nodes = nodes;

        let mut edges: Vec<Option<Edge<T>>> = Vec::with_capacity(self.edges.len());
        for (old, slot) in self.edges.drain(..).enumerate() {
            let Some(mut edge) = slot else { continue };
            // Edges whose endpoints vanished are dropped with them.
            let (Some(s), Some(t)) = (map.node(edge.source), map.node(edge.target)) else {
                continue;
            };
            let id = EdgeId::from_usize(edges.len());
            map.edges[old] = Some(id);
            edge.id = id;
            edge.source = s;
            edge.target = t;
            edges.push(Some(edge));
        }
        self.edges = edges;

        self.couplings = self
            .couplings
            .iter()
            .filter_map(|c| {
                Some(Coupling {
                    a: map.edge(c.a)?,
                    b: map.edge(c.b)?,
                    value: c.value,
                })
            })
            .collect();
        self.ground = self.ground.and_then(|g| map.node(g));
        map
    }

    /// Copy every live element of `other` into `self`.
    ///
    /// `other`'s ground node is identified with this graph's ground (created
    /// on demand), so every block shares a single rail reference.
    pub fn absorb(&mut self, other: &Graph<T>) -> GraphResult<Splice> {
        self.absorb_pinned(other, &[])
    }

    /// Like [`Graph::absorb`], but each `(local, host)` pin identifies a node
    /// of `other` with an existing node of `self` instead of copying it.
    pub fn absorb_pinned(
        &mut self,
        other: &Graph<T>,
        pins: &[(NodeId, NodeId)],
    ) -> GraphResult<Splice> {
        if !other.is_dense() {
            return Err(GraphError::NotDense);
        }
        for &(local, host) in pins {
            if other.node(local).is_none() || self.node(host).is_none() {
                return Err(GraphError::MissingNode {
                    edge: String::from("<pin>"),
                    node: local,
                });
            }
        }
        let mut splice = Splice {
            nodes: Vec::with_capacity(other.nodes.len()),
            edges: Vec::with_capacity(other.edges.len()),
            children: Vec::new(),
        };

        for node in other.nodes() {
            let pinned = pins.iter().find(|(local, _)| *local == node.id);
            let id = if let Some(&(_, host)) = pinned {
                host
            } else if other.ground == Some(node.id) {
                self.add_ground(node.label.clone())
            } else {
                self.add_node(node.coordinate, node.track, node.label.clone(), node.breaking)
            };
            splice.nodes.push(id);
        }

        for edge in other.edges() {
            let id = self.add_edge(
                splice.nodes[edge.source.slot()],
                splice.nodes[edge.target.slot()],
                EdgePayload {
                    label: edge.label.clone(),
                    impedance: edge.impedance,
                    injected: edge.injected,
                    emf: edge.emf,
                    kind: edge.kind,
                },
            )?;
            splice.edges.push(id);
        }

        for c in &other.couplings {
            self.add_coupling(splice.edges[c.a.slot()], splice.edges[c.b.slot()], c.value)?;
        }

        Ok(splice)
    }
}
