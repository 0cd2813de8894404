//! Core graph data structures.

use tp_core::{EdgeId, NodeId, Phasor, Real, TrackId};

use crate::error::{GraphError, GraphResult};

/// An electrical terminal.
///
/// Conductor attachment points carry a track identifier and a coordinate;
/// busbars and the rail reference carry no track.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub id: NodeId,
    pub label: String,
    /// Longitudinal position along the line (km).
    pub coordinate: Real,
    pub track: Option<TrackId>,
    /// Air gap / open point: the conductor does not continue into another
    /// breaking node next to it.
    pub breaking: bool,
    /// Potential against the rail, set by the last solve.
    pub potential: T,
}

/// How an edge participates in mesh analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Ordinary impedance, optionally with a series EMF.
    Passive,
    /// Prescribed-current branch; its impedance is the disconnect sentinel.
    CurrentSource,
}

/// A two-terminal branch.
///
/// Branch law: `u(source) - u(target) = Z·(J + I) - E` where `J` is the branch
/// current from source to target, `I` the injected current and `E` the EMF.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<T> {
    pub id: EdgeId,
    pub label: String,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    pub impedance: T,
    pub injected: T,
    pub emf: T,
    /// Branch current, set by the last solve.
    pub current: T,
}

impl<T: Phasor> Edge<T> {
    /// The endpoint opposite to `node`, if `node` is an endpoint.
    pub fn opposite(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    pub fn is_source(&self) -> bool {
        self.kind == EdgeKind::CurrentSource
    }
}

/// Parameters for a new edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePayload<T> {
    pub label: String,
    pub impedance: T,
    pub injected: T,
    pub emf: T,
    pub kind: EdgeKind,
}

impl<T: Phasor> EdgePayload<T> {
    /// A passive branch with the given impedance.
    pub fn new(label: impl Into<String>, impedance: T) -> Self {
        Self {
            label: label.into(),
            impedance,
            injected: T::nil(),
            emf: T::nil(),
            kind: EdgeKind::Passive,
        }
    }

    /// Add a series EMF.
    pub fn with_emf(mut self, emf: T) -> Self {
        self.emf = emf;
        self
    }

    /// Turn the branch into a prescribed-current source.
    pub fn with_injected(mut self, current: T) -> Self {
        self.injected = current;
        self.kind = EdgeKind::CurrentSource;
        self
    }
}

/// Symmetric mutual impedance between two edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coupling<T> {
    pub a: EdgeId,
    pub b: EdgeId,
    pub value: T,
}

/// Directed weighted multigraph stored as an arena.
///
/// Removal leaves tombstones; [`Graph::renumber`] compacts them so node and
/// edge ids become dense matrix keys again.
#[derive(Debug, Clone)]
pub struct Graph<T> {
    pub(crate) nodes: Vec<Option<Node<T>>>,
    pub(crate) edges: Vec<Option<Edge<T>>>,
    pub(crate) couplings: Vec<Coupling<T>>,
    pub(crate) ground: Option<NodeId>,
}

impl<T> Default for Graph<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            couplings: Vec::new(),
            ground: None,
        }
    }
}

impl<T: Phasor> Graph<T> {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or return) the rail reference node.
    pub fn add_ground(&mut self, label: impl Into<String>) -> NodeId {
        if let Some(g) = self.ground {
            return g;
        }
        let id = self.add_node(0.0, None, label, false);
        self.ground = Some(id);
        id
    }

    pub fn ground(&self) -> Option<NodeId> {
        self.ground
    }

    /// Add a node and return its ID.
    pub fn add_node(
        &mut self,
        coordinate: Real,
        track: Option<TrackId>,
        label: impl Into<String>,
        breaking: bool,
    ) -> NodeId {
        let id = NodeId::from_usize(self.nodes.len());
        self.nodes.push(Some(Node {
            id,
            label: label.into(),
            coordinate,
            track,
            breaking,
            potential: T::nil(),
        }));
        id
    }

    /// Add an edge between two existing nodes.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        payload: EdgePayload<T>,
    ) -> GraphResult<EdgeId> {
        for node in [source, target] {
            if self.node(node).is_none() {
                return Err(GraphError::MissingNode {
                    edge: payload.label,
                    node,
                });
            }
        }
        let id = EdgeId::from_usize(self.edges.len());
        self.edges.push(Some(Edge {
            id,
            label: payload.label,
            source,
            target,
            kind: payload.kind,
            impedance: payload.impedance,
            injected: payload.injected,
            emf: payload.emf,
            current: T::nil(),
        }));
        Ok(id)
    }

    /// Add a symmetric mutual impedance between two existing edges.
    pub fn add_coupling(&mut self, a: EdgeId, b: EdgeId, value: T) -> GraphResult<()> {
        for edge in [a, b] {
            if self.edge(edge).is_none() {
                return Err(GraphError::MissingEdge { edge });
            }
        }
        self.couplings.push(Coupling { a, b, value });
        Ok(())
    }

    /// Remove an edge (and every coupling that mentions it).
    pub fn remove_edge(&mut self, id: EdgeId) -> GraphResult<Edge<T>> {
        let edge = self
            .edges
            .get_mut(id.slot())
            .and_then(Option::take)
            .ok_or(GraphError::MissingEdge { edge: id })?;
        self.couplings.retain(|c| c.a != id && c.b != id);
        Ok(edge)
    }

    /// Remove a node together with its incident edges.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<Node<T>> {
        let node = self
            .nodes
            .get_mut(id.slot())
            .and_then(Option::take)
            .ok_or_else(|| GraphError::MissingNode {
                edge: String::new(),
                node: id,
            })?;
        let incident: Vec<EdgeId> = self
            .edges()
            .filter(|e| e.source == id || e.target == id)
            .map(|e| e.id)
            .collect();
        for e in incident {
            self.remove_edge(e)?;
        }
        if self.ground == Some(id) {
            self.ground = None;
        }
        Ok(node)
    }

    /// Get a live node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.slot()).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.nodes.get_mut(id.slot()).and_then(Option::as_mut)
    }

    /// Get a live edge by ID.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge<T>> {
        self.edges.get(id.slot()).and_then(Option::as_ref)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge<T>> {
        self.edges.get_mut(id.slot()).and_then(Option::as_mut)
    }

    /// Iterate over live nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<T>> {
        self.nodes.iter().flatten()
    }

    /// Iterate over live edges in id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge<T>> {
        self.edges.iter().flatten()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge<T>> {
        self.edges.iter_mut().flatten()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node<T>> {
        self.nodes.iter_mut().flatten()
    }

    pub fn couplings(&self) -> &[Coupling<T>] {
        &self.couplings
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Number of arena slots (live or dead) for edges.
    pub fn edge_slots(&self) -> usize {
        self.edges.len()
    }

    /// Whether every slot is live, i.e. ids are dense.
    pub fn is_dense(&self) -> bool {
        self.nodes.iter().all(Option::is_some) && self.edges.iter().all(Option::is_some)
    }

    /// Incident edges per node slot, as `(edge, is_outgoing)`.
    pub fn adjacency(&self) -> Vec<Vec<(EdgeId, bool)>> {
        let mut adj = vec![Vec::new(); self.nodes.len()];
        for e in self.edges() {
            adj[e.source.slot()].push((e.id, true));
            adj[e.target.slot()].push((e.id, false));
        }
        adj
    }

    /// Drop all computed potentials and currents.
    pub fn clear_solution(&mut self) {
        for n in self.nodes_mut() {
            n.potential = T::nil();
        }
        for e in self.edges_mut() {
            e.current = T::nil();
        }
    }
}
