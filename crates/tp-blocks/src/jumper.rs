//! Cross-bond links between tracks, and the wiring they share with splitters.

use std::collections::BTreeMap;

use tp_core::{EdgeId, NodeId, Phasor, Real, Sentinels, TrackId};
use tp_graph::{EdgePayload, Graph, GraphResult, Splice};

use crate::assembly::Assembly;
use crate::common::{check_finite, check_len, current_of, feeder_impedance, merge_interior};
use crate::error::{BlockError, BlockResult};
use crate::factory::BuildContext;
use crate::solution::BlockSolution;
use crate::state::StateRecord;
use crate::traits::{BlockKind, Placement, TopologyBlock};

/// A switchable connection between two conductor endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub a: TrackId,
    pub b: TrackId,
    pub closed: bool,
}

impl Link {
    pub fn closed(a: TrackId, b: TrackId) -> Self {
        Self { a, b, closed: true }
    }
}

/// Add one node per distinct endpoint and one edge per link.
///
/// `coordinate_of` places each endpoint along its own track axis.
pub(crate) fn add_links<T: Phasor>(
    graph: &mut Graph<T>,
    label: &str,
    links: &[Link],
    impedance: T,
    sentinels: &Sentinels,
    coordinate_of: impl Fn(TrackId) -> Real,
) -> GraphResult<Vec<EdgeId>> {
    let mut nodes: BTreeMap<TrackId, NodeId> = BTreeMap::new();
    let mut node_for = |graph: &mut Graph<T>, track: TrackId| {
        *nodes.entry(track).or_insert_with(|| {
            graph.add_node(coordinate_of(track), Some(track), format!("{label}:{track}"), false)
        })
    };
    let mut edges = Vec::with_capacity(links.len());
    for link in links {
        let a = node_for(&mut *graph, link.a);
        let b = node_for(&mut *graph, link.b);
        edges.push(graph.add_edge(
            a,
            b,
            EdgePayload::new(
                format!("{label}:{}-{}", link.a, link.b),
                feeder_impedance(link.closed, impedance, sentinels),
            ),
        )?);
    }
    Ok(edges)
}

#[derive(Debug, Clone, PartialEq)]
pub struct JumperParams<T> {
    pub coordinate: Real,
    pub links: Vec<Link>,
    /// Impedance of a closed link; zero means the short sentinel.
    pub impedance: T,
}

/// Cross-bond between tracks at one coordinate.
#[derive(Debug, Clone)]
pub struct Jumper<T> {
    label: String,
    params: JumperParams<T>,
    sentinels: Sentinels,
    graph: Graph<T>,
    edges: Vec<EdgeId>,
    currents: Vec<T>,
}

impl<T: Phasor> Jumper<T> {
    pub fn links(&self) -> &[Link] {
        &self.params.links
    }

    fn rebuild(&mut self) -> BlockResult<()> {
        check_finite(&self.label, "link impedance", self.params.impedance)?;
        if let Some(bad) = self.params.links.iter().find(|l| l.a == l.b) {
            return Err(BlockError::invalid(
                &self.label,
                format!("link joins track {} to itself", bad.a),
            ));
        }
        let mut graph = Graph::new();
        graph.add_ground("rail");
        let coordinate = self.params.coordinate;
        self.edges = add_links(
            &mut graph,
            &self.label,
            &self.params.links,
            self.params.impedance,
            &self.sentinels,
            |_| coordinate,
        )?;
        self.graph = graph;
        Ok(())
    }
}

impl<T: Phasor> TopologyBlock<T> for Jumper<T> {
    type Params = JumperParams<T>;

    fn build(label: String, params: JumperParams<T>, ctx: &mut BuildContext) -> BlockResult<Self> {
        let mut jumper = Self {
            label,
            params,
            sentinels: ctx.sentinels,
            graph: Graph::new(),
            edges: Vec::new(),
            currents: Vec::new(),
        };
        jumper.rebuild()?;
        Ok(jumper)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Jumper
    }

    fn coordinate(&self) -> Real {
        self.params.coordinate
    }

    fn merge_into(&self, assembly: &mut Assembly<T>, placement: Placement) -> BlockResult<Splice> {
        merge_interior(&self.label, &self.graph, assembly, placement)
    }

    fn update_state(&mut self, record: &StateRecord) -> BlockResult<()> {
        let StateRecord::Jumper { links } = record else {
            return Err(BlockError::StateKind {
                label: self.label.clone(),
                expected: BlockKind::Jumper,
                found: record.kind(),
            });
        };
        check_len(&self.label, "links", self.params.links.len(), links.len())?;
        for (link, closed) in self.params.links.iter_mut().zip(links) {
            link.closed = *closed;
        }
        self.rebuild()
    }

    fn state_record(&self) -> StateRecord {
        StateRecord::Jumper {
            links: self.params.links.iter().map(|l| l.closed).collect(),
        }
    }

    fn collect(&mut self, _placement: Placement, splice: &Splice, graph: &Graph<T>) -> BlockResult<()> {
        self.currents = self
            .edges
            .iter()
            .map(|e| current_of(graph, splice, *e))
            .collect::<BlockResult<_>>()?;
        Ok(())
    }

    fn solution(&self) -> BlockSolution {
        let mut s = BlockSolution::new::<T>(&self.label, BlockKind::Jumper, self.params.coordinate);
        for (link, i) in self.params.links.iter().zip(&self.currents) {
            s.current(format!("{}-{}", link.a, link.b), *i);
        }
        s
    }
}
