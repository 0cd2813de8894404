//! Autotransformer point of a 2×25 kV system.

use tp_core::{EdgeId, NodeId, Phasor, Real, Sentinels, SystemKind, TrackId};
use tp_graph::{EdgePayload, Graph, GraphResult, Splice};

use crate::assembly::Assembly;
use crate::common::{check_finite, current_of, merge_interior, potential_of};
use crate::error::{BlockError, BlockResult};
use crate::factory::BuildContext;
use crate::solution::{BlockSolution, CompactEntry};
use crate::state::{StateRecord, from_record, to_record};
use crate::traits::{BlockKind, Placement, TopologyBlock};

/// Winding impedances of an autotransformer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Windings<T> {
    pub magnetizing: T,
    pub leakage: T,
}

/// Edge ids of a winding pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindingEdges {
    /// Contact bus → rail.
    pub upper: EdgeId,
    /// Rail → supply bus.
    pub lower: EdgeId,
}

/// Add a coupled winding pair between a contact node, the rail and a supply node.
///
/// Each winding has self impedance `Zmag + Zleak` and the two share the
/// mutual impedance `Zmag`, so a large magnetizing impedance forces equal
/// half voltages.
pub fn add_windings<T: Phasor>(
    graph: &mut Graph<T>,
    contact: NodeId,
    supply: NodeId,
    label: &str,
    windings: Windings<T>,
    sentinels: &Sentinels,
) -> GraphResult<WindingEdges> {
    let ground = graph.add_ground("rail");
    let z_self = sentinels.clamp_short(windings.magnetizing + windings.leakage);
    let upper = graph.add_edge(
        contact,
        ground,
        EdgePayload::new(format!("{label}:upper"), z_self),
    )?;
    let lower = graph.add_edge(
        ground,
        supply,
        EdgePayload::new(format!("{label}:lower"), z_self),
    )?;
    graph.add_coupling(upper, lower, windings.magnetizing)?;
    Ok(WindingEdges { upper, lower })
}

/// Solved winding currents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindingReadings<T> {
    pub upper: T,
    pub lower: T,
}

impl<T: Phasor> WindingReadings<T> {
    pub fn read(graph: &Graph<T>, splice: &Splice, edges: WindingEdges) -> BlockResult<Self> {
        Ok(Self {
            upper: current_of(graph, splice, edges.upper)?,
            lower: current_of(graph, splice, edges.lower)?,
        })
    }

    /// Current returned into the rail at the neutral point.
    pub fn rail(&self) -> T {
        self.upper - self.lower
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutotransformerParams<T> {
    pub coordinate: Real,
    pub branch: u16,
    pub track: u16,
    pub windings: Windings<T>,
}

/// Stand-alone autotransformer point between a track's contact and supply wires.
#[derive(Debug, Clone)]
pub struct Autotransformer<T> {
    label: String,
    params: AutotransformerParams<T>,
    sentinels: Sentinels,
    graph: Graph<T>,
    contact: NodeId,
    supply: NodeId,
    edges: WindingEdges,
    readings: Option<(WindingReadings<T>, T, T)>,
}

impl<T: Phasor> Autotransformer<T> {
    fn contact_track(&self) -> TrackId {
        TrackId::contact(self.params.branch, self.params.track)
    }

    pub fn branch(&self) -> u16 {
        self.params.branch
    }

    pub fn windings(&self) -> Windings<T> {
        self.params.windings
    }

    fn rebuild(&mut self) -> BlockResult<()> {
        check_finite(&self.label, "magnetizing impedance", self.params.windings.magnetizing)?;
        check_finite(&self.label, "leakage impedance", self.params.windings.leakage)?;
        let track = self.contact_track();
        let mut graph = Graph::new();
        let contact = graph.add_node(
            self.params.coordinate,
            Some(track),
            format!("{}:contact", self.label),
            false,
        );
        let supply = graph.add_node(
            self.params.coordinate,
            Some(TrackId::supply(self.params.branch, self.params.track)),
            format!("{}:supply", self.label),
            false,
        );
        let edges = add_windings(
            &mut graph,
            contact,
            supply,
            &self.label,
            self.params.windings,
            &self.sentinels,
        )?;
        self.graph = graph;
        self.contact = contact;
        self.supply = supply;
        self.edges = edges;
        Ok(())
    }
}

impl<T: Phasor> TopologyBlock<T> for Autotransformer<T> {
    type Params = AutotransformerParams<T>;

    fn build(
        label: String,
        params: AutotransformerParams<T>,
        ctx: &mut BuildContext,
    ) -> BlockResult<Self> {
        if T::KIND == SystemKind::Dc {
            return Err(BlockError::invalid(&label, "autotransformers exist only in AC systems"));
        }
        let mut at = Self {
            label,
            params,
            sentinels: ctx.sentinels,
            graph: Graph::new(),
            contact: NodeId::from_index(0),
            supply: NodeId::from_index(0),
            edges: WindingEdges {
                upper: EdgeId::from_index(0),
                lower: EdgeId::from_index(0),
            },
            readings: None,
        };
        at.rebuild()?;
        Ok(at)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Autotransformer
    }

    fn coordinate(&self) -> Real {
        self.params.coordinate
    }

    fn merge_into(&self, assembly: &mut Assembly<T>, placement: Placement) -> BlockResult<Splice> {
        merge_interior(&self.label, &self.graph, assembly, placement)
    }

    fn update_state(&mut self, record: &StateRecord) -> BlockResult<()> {
        let StateRecord::Autotransformer {
            magnetizing,
            leakage,
        } = record
        else {
            return Err(BlockError::StateKind {
                label: self.label.clone(),
                expected: BlockKind::Autotransformer,
                found: record.kind(),
            });
        };
        self.params.windings = Windings {
            magnetizing: from_record(*magnetizing),
            leakage: from_record(*leakage),
        };
        self.rebuild()
    }

    fn state_record(&self) -> StateRecord {
        StateRecord::Autotransformer {
            magnetizing: to_record(self.params.windings.magnetizing),
            leakage: to_record(self.params.windings.leakage),
        }
    }

    fn collect(&mut self, _placement: Placement, splice: &Splice, graph: &Graph<T>) -> BlockResult<()> {
        let windings = WindingReadings::read(graph, splice, self.edges)?;
        let uc = potential_of(graph, splice, self.contact)?;
        let us = potential_of(graph, splice, self.supply)?;
        self.readings = Some((windings, uc, us));
        Ok(())
    }

    fn solution(&self) -> BlockSolution {
        let mut s = BlockSolution::new::<T>(&self.label, BlockKind::Autotransformer, self.params.coordinate)
            .on_track(self.contact_track());
        if let Some((w, uc, us)) = self.readings {
            s.current("upper winding", w.upper);
            s.current("lower winding", w.lower);
            s.current("rail", w.rail());
            s.voltage("contact", uc);
            s.voltage("supply", us);
        }
        s
    }

    fn compact_solution(&self) -> BlockResult<CompactEntry> {
        let (w, _, _) = self.readings.unwrap_or((
            WindingReadings {
                upper: T::nil(),
                lower: T::nil(),
            },
            T::nil(),
            T::nil(),
        ));
        let mut values = vec![self.params.coordinate];
        for v in [w.upper, w.lower, w.rail()] {
            let (re, im) = v.parts();
            values.extend([re, im]);
        }
        Ok(CompactEntry::Autotransformer(values))
    }
}
