//! Short-circuit (fault) point.

use tp_core::{EdgeId, NodeId, Phasor, Real, Sentinels, TrackId};
use tp_graph::{EdgePayload, Graph, Splice};

use crate::assembly::Assembly;
use crate::common::{check_finite, current_of, merge_interior, potential_of};
use crate::error::{BlockError, BlockResult};
use crate::factory::BuildContext;
use crate::solution::BlockSolution;
use crate::state::{StateRecord, from_record, to_record};
use crate::traits::{BlockKind, Placement, TopologyBlock};

#[derive(Debug, Clone, PartialEq)]
pub struct ShortCircuitParams<T> {
    pub coordinate: Real,
    pub track: TrackId,
    /// Fault resistance while active.
    pub resistance: T,
    pub active: bool,
}

/// A line → rail edge: the fault resistance while active, open otherwise.
#[derive(Debug, Clone)]
pub struct ShortCircuit<T> {
    label: String,
    params: ShortCircuitParams<T>,
    sentinels: Sentinels,
    graph: Graph<T>,
    node: NodeId,
    edge: EdgeId,
    readings: Option<(T, T)>,
}

impl<T: Phasor> ShortCircuit<T> {
    pub fn is_active(&self) -> bool {
        self.params.active
    }

    pub fn track(&self) -> TrackId {
        self.params.track
    }

    fn rebuild(&mut self) -> BlockResult<()> {
        check_finite(&self.label, "fault resistance", self.params.resistance)?;
        let z = if self.params.active {
            self.sentinels.clamp_short(self.params.resistance)
        } else {
            T::ohms(self.sentinels.disconnected)
        };
        let mut graph = Graph::new();
        let ground = graph.add_ground("rail");
        let node = graph.add_node(
            self.params.coordinate,
            Some(self.params.track),
            format!("{}:line", self.label),
            false,
        );
        let edge = graph.add_edge(node, ground, EdgePayload::new(self.label.clone(), z))?;
        self.graph = graph;
        self.node = node;
        self.edge = edge;
        Ok(())
    }
}

impl<T: Phasor> TopologyBlock<T> for ShortCircuit<T> {
    type Params = ShortCircuitParams<T>;

    fn build(label: String, params: ShortCircuitParams<T>, ctx: &mut BuildContext) -> BlockResult<Self> {
        let mut sc = Self {
            label,
            params,
            sentinels: ctx.sentinels,
            graph: Graph::new(),
            node: NodeId::from_index(0),
            edge: EdgeId::from_index(0),
            readings: None,
        };
        sc.rebuild()?;
        Ok(sc)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> BlockKind {
        BlockKind::ShortCircuit
    }

    fn coordinate(&self) -> Real {
        self.params.coordinate
    }

    fn merge_into(&self, assembly: &mut Assembly<T>, placement: Placement) -> BlockResult<Splice> {
        merge_interior(&self.label, &self.graph, assembly, placement)
    }

    fn update_state(&mut self, record: &StateRecord) -> BlockResult<()> {
        let StateRecord::ShortCircuit { active, resistance } = record else {
            return Err(BlockError::StateKind {
                label: self.label.clone(),
                expected: BlockKind::ShortCircuit,
                found: record.kind(),
            });
        };
        self.params.active = *active;
        self.params.resistance = from_record(*resistance);
        self.rebuild()
    }

    fn state_record(&self) -> StateRecord {
        StateRecord::ShortCircuit {
            active: self.params.active,
            resistance: to_record(self.params.resistance),
        }
    }

    fn collect(&mut self, _placement: Placement, splice: &Splice, graph: &Graph<T>) -> BlockResult<()> {
        self.readings = Some((
            current_of(graph, splice, self.edge)?,
            potential_of(graph, splice, self.node)?,
        ));
        Ok(())
    }

    fn solution(&self) -> BlockSolution {
        let mut s = BlockSolution::new::<T>(&self.label, BlockKind::ShortCircuit, self.params.coordinate)
            .on_track(self.params.track);
        s.attribute("active", self.params.active);
        if let Some((i, u)) = self.readings {
            s.current("fault", i);
            s.voltage("line", u);
        }
        s
    }
}
