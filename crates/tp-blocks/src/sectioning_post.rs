//! Sectioning posts between two feeding sections.

use tp_core::{EdgeId, NodeId, Phasor, Real, Sentinels, SystemKind, TrackId};
use tp_graph::{EdgePayload, Graph, Splice};

use crate::assembly::Assembly;
use crate::autotransformer::{WindingEdges, WindingReadings, Windings, add_windings};
use crate::common::{
    check_finite, check_len, current_of, feeder_impedance, merge_interior, potential_of,
};
use crate::error::{BlockError, BlockResult};
use crate::factory::BuildContext;
use crate::solution::BlockSolution;
use crate::state::{FeederState, StateRecord};
use crate::traits::{BlockKind, Placement, Side, TopologyBlock};

#[derive(Debug, Clone, PartialEq)]
pub struct SectioningPostParams<T> {
    pub coordinate: Real,
    /// Branch the post stands on; `0` for the main line.
    pub branch: u16,
    pub tracks: Vec<u16>,
    /// Series impedance of a closed feeder.
    pub feeder: T,
    pub two_by_25: bool,
    /// Autotransformer windings on both busbar pairs. Needs `two_by_25`.
    pub autotransformer: Option<Windings<T>>,
}

impl<T: Phasor> SectioningPostParams<T> {
    pub fn new(coordinate: Real, tracks: Vec<u16>) -> Self {
        Self {
            coordinate,
            branch: 0,
            tracks,
            feeder: T::nil(),
            two_by_25: false,
            autotransformer: None,
        }
    }

    pub fn on_branch(mut self, branch: u16) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_autotransformer(mut self, windings: Windings<T>) -> Self {
        self.two_by_25 = true;
        self.autotransformer = Some(windings);
        self
    }
}

/// Switch positions of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PostState {
    left: FeederState,
    right: FeederState,
    median: bool,
}

impl PostState {
    fn closed(tracks: usize, two_by_25: bool) -> Self {
        let side = FeederState {
            contact: vec![true; tracks],
            supply: if two_by_25 { vec![true; tracks] } else { Vec::new() },
        };
        Self {
            left: side.clone(),
            right: side,
            median: true,
        }
    }

    /// Whether the air gap of one wire is bridged: median closed, every
    /// feeder on that wire open.
    fn bridged(&self, supply: bool) -> bool {
        let open = |s: &FeederState| {
            let wire = if supply { &s.supply } else { &s.contact };
            wire.iter().all(|c| !c)
        };
        self.median && open(&self.left) && open(&self.right)
    }
}

/// Local ids of one wire (contact or supply) of the post.
#[derive(Debug, Clone, Default)]
struct Wiring {
    buses: Option<(NodeId, NodeId)>,
    left_feeders: Vec<EdgeId>,
    right_feeders: Vec<EdgeId>,
    median: Option<EdgeId>,
    through: Vec<EdgeId>,
}

/// Solved quantities of one wire.
#[derive(Debug, Clone, PartialEq)]
struct WireReadings<T> {
    left_bus: T,
    right_bus: T,
    left: Vec<T>,
    right: Vec<T>,
    median: T,
    through: Vec<T>,
}

impl<T: Phasor> WireReadings<T> {
    fn read(w: &Wiring, graph: &Graph<T>, splice: &Splice) -> BlockResult<Option<Self>> {
        let (Some((lbus, rbus)), Some(median)) = (w.buses, w.median) else {
            return Ok(None);
        };
        let currents = |edges: &[EdgeId]| {
            edges
                .iter()
                .map(|e| current_of(graph, splice, *e))
                .collect::<BlockResult<Vec<_>>>()
        };
        Ok(Some(Self {
            left_bus: potential_of(graph, splice, lbus)?,
            right_bus: potential_of(graph, splice, rbus)?,
            left: currents(&w.left_feeders)?,
            right: currents(&w.right_feeders)?,
            median: current_of(graph, splice, median)?,
            through: currents(&w.through)?,
        }))
    }
}

/// Sectioning post: two busbars across an air gap, joined by a median switch.
#[derive(Debug, Clone)]
pub struct SectioningPost<T> {
    label: String,
    params: SectioningPostParams<T>,
    sentinels: Sentinels,
    state: PostState,
    graph: Graph<T>,
    contact: Wiring,
    supply: Wiring,
    windings: Option<[WindingEdges; 2]>,
    readings: Option<(WireReadings<T>, Option<WireReadings<T>>)>,
    at_readings: Option<[WindingReadings<T>; 2]>,
}

impl<T: Phasor> SectioningPost<T> {
    pub fn params(&self) -> &SectioningPostParams<T> {
        &self.params
    }

    pub fn median(&self) -> bool {
        self.state.median
    }

    fn track_id(&self, track: u16, supply: bool) -> TrackId {
        if supply {
            TrackId::supply(self.params.branch, track)
        } else {
            TrackId::contact(self.params.branch, track)
        }
    }

    fn wire(
        &self,
        graph: &mut Graph<T>,
        supply: bool,
        left: &[bool],
        right: &[bool],
    ) -> BlockResult<Wiring> {
        let x = self.params.coordinate;
        let suffix = if supply { "supply " } else { "" };
        let name = &self.label;
        let lbus = graph.add_node(x, None, format!("{name}:left {suffix}bus"), false);
        let rbus = graph.add_node(x, None, format!("{name}:right {suffix}bus"), false);
        let gap = self.sentinels.switch(self.state.bridged(supply));

        let mut w = Wiring {
            buses: Some((lbus, rbus)),
            ..Wiring::default()
        };
        for ((&track, &l), &r) in self.params.tracks.iter().zip(left).zip(right) {
            let t = self.track_id(track, supply);
            // Left node first: equal coordinates keep insertion order.
            let lnode = graph.add_node(x, Some(t), format!("{name}:left {t}"), true);
            let rnode = graph.add_node(x, Some(t), format!("{name}:right {t}"), true);
            w.left_feeders.push(graph.add_edge(
                lbus,
                lnode,
                EdgePayload::new(
                    format!("{name}:left feeder {t}"),
                    feeder_impedance(l, self.params.feeder, &self.sentinels),
                ),
            )?);
            w.right_feeders.push(graph.add_edge(
                rbus,
                rnode,
                EdgePayload::new(
                    format!("{name}:right feeder {t}"),
                    feeder_impedance(r, self.params.feeder, &self.sentinels),
                ),
            )?);
            w.through.push(graph.add_edge(
                lnode,
                rnode,
                EdgePayload::new(format!("{name}:through {t}"), gap),
            )?);
        }
        w.median = Some(graph.add_edge(
            lbus,
            rbus,
            EdgePayload::new(
                format!("{name}:{suffix}median"),
                self.sentinels.switch(self.state.median),
            ),
        )?);
        Ok(w)
    }

    fn rebuild(&mut self) -> BlockResult<()> {
        let mut graph = Graph::new();
        graph.add_ground("rail");
        let state = self.state.clone();
        let contact = self.wire(&mut graph, false, &state.left.contact, &state.right.contact)?;
        let supply = if self.params.two_by_25 {
            self.wire(&mut graph, true, &state.left.supply, &state.right.supply)?
        } else {
            Wiring::default()
        };

        let mut windings = None;
        if let (Some(w), Some((cl, cr)), Some((sl, sr))) =
            (self.params.autotransformer, contact.buses, supply.buses)
        {
            let left = add_windings(&mut graph, cl, sl, &format!("{}:left at", self.label), w, &self.sentinels)?;
            let right = add_windings(&mut graph, cr, sr, &format!("{}:right at", self.label), w, &self.sentinels)?;
            windings = Some([left, right]);
        }

        self.graph = graph;
        self.contact = contact;
        self.supply = supply;
        self.windings = windings;
        Ok(())
    }

    fn check_side(&self, what: &'static str, side: &FeederState) -> BlockResult<()> {
        let n = self.params.tracks.len();
        check_len(&self.label, what, n, side.contact.len())?;
        let supply = if self.params.two_by_25 { n } else { 0 };
        check_len(&self.label, "supply feeders", supply, side.supply.len())
    }

    fn report_wire(&self, s: &mut BlockSolution, r: &WireReadings<T>, supply: bool) {
        let suffix = if supply { "supply " } else { "" };
        s.voltage(format!("left {suffix}bus"), r.left_bus);
        s.voltage(format!("right {suffix}bus"), r.right_bus);
        s.current(format!("{suffix}median"), r.median);
        let bridged = self.state.bridged(supply);
        for (k, &track) in self.params.tracks.iter().enumerate() {
            let t = self.track_id(track, supply);
            if bridged {
                if let Some(i) = r.through.get(k) {
                    s.current(format!("through {t}"), *i);
                }
                continue;
            }
            for (side, values) in [(Side::Left, &r.left), (Side::Right, &r.right)] {
                if let Some(i) = values.get(k) {
                    s.current(format!("{side} feeder {t}"), *i);
                }
            }
        }
    }
}

impl<T: Phasor> TopologyBlock<T> for SectioningPost<T> {
    type Params = SectioningPostParams<T>;

    fn build(
        label: String,
        params: SectioningPostParams<T>,
        ctx: &mut BuildContext,
    ) -> BlockResult<Self> {
        if params.tracks.is_empty() {
            return Err(BlockError::invalid(&label, "sectioning post spans no track"));
        }
        if T::KIND == SystemKind::Dc && params.two_by_25 {
            return Err(BlockError::invalid(&label, "2x25 kV posts exist only in AC systems"));
        }
        if params.autotransformer.is_some() && !params.two_by_25 {
            return Err(BlockError::invalid(&label, "an autotransformer post needs supply wires"));
        }
        check_finite(&label, "feeder impedance", params.feeder)?;
        if let Some(w) = &params.autotransformer {
            check_finite(&label, "magnetizing impedance", w.magnetizing)?;
            check_finite(&label, "leakage impedance", w.leakage)?;
        }

        let state = PostState::closed(params.tracks.len(), params.two_by_25);
        let mut post = Self {
            label,
            params,
            sentinels: ctx.sentinels,
            state,
            graph: Graph::new(),
            contact: Wiring::default(),
            supply: Wiring::default(),
            windings: None,
            readings: None,
            at_readings: None,
        };
        post.rebuild()?;
        Ok(post)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> BlockKind {
        BlockKind::SectioningPost
    }

    fn coordinate(&self) -> Real {
        self.params.coordinate
    }

    fn merge_into(&self, assembly: &mut Assembly<T>, placement: Placement) -> BlockResult<Splice> {
        merge_interior(&self.label, &self.graph, assembly, placement)
    }

    fn update_state(&mut self, record: &StateRecord) -> BlockResult<()> {
        let StateRecord::SectioningPost {
            left,
            right,
            median,
        } = record
        else {
            return Err(BlockError::StateKind {
                label: self.label.clone(),
                expected: BlockKind::SectioningPost,
                found: record.kind(),
            });
        };
        self.check_side("left feeders", left)?;
        self.check_side("right feeders", right)?;
        self.state = PostState {
            left: left.clone(),
            right: right.clone(),
            median: *median,
        };
        self.rebuild()
    }

    fn state_record(&self) -> StateRecord {
        StateRecord::SectioningPost {
            left: self.state.left.clone(),
            right: self.state.right.clone(),
            median: self.state.median,
        }
    }

    fn collect(&mut self, _placement: Placement, splice: &Splice, graph: &Graph<T>) -> BlockResult<()> {
        let contact = WireReadings::read(&self.contact, graph, splice)?;
        let supply = WireReadings::read(&self.supply, graph, splice)?;
        self.readings = contact.map(|c| (c, supply));
        self.at_readings = match self.windings {
            Some([l, r]) => Some([
                WindingReadings::read(graph, splice, l)?,
                WindingReadings::read(graph, splice, r)?,
            ]),
            None => None,
        };
        Ok(())
    }

    fn solution(&self) -> BlockSolution {
        let description = if self.params.autotransformer.is_some() {
            "sectioning post with autotransformer"
        } else {
            "sectioning post"
        };
        let mut s = BlockSolution::new::<T>(&self.label, BlockKind::SectioningPost, self.params.coordinate)
            .describe(description);
        s.attribute("median", if self.state.median { "closed" } else { "open" });
        if let Some((contact, supply)) = &self.readings {
            self.report_wire(&mut s, contact, false);
            if let Some(supply) = supply {
                self.report_wire(&mut s, supply, true);
            }
        }
        if let Some(at) = &self.at_readings {
            for (side, w) in [(Side::Left, at[0]), (Side::Right, at[1])] {
                s.current(format!("{side} upper winding"), w.upper);
                s.current(format!("{side} lower winding"), w.lower);
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_core::Complex64;

    fn post() -> SectioningPost<f64> {
        SectioningPost::build(
            "SP1".into(),
            SectioningPostParams::new(5.0, vec![1, 2]),
            &mut BuildContext::default(),
        )
        .unwrap()
    }

    fn record(left: Vec<bool>, right: Vec<bool>, median: bool) -> StateRecord {
        StateRecord::SectioningPost {
            left: FeederState {
                contact: left,
                supply: vec![],
            },
            right: FeederState {
                contact: right,
                supply: vec![],
            },
            median,
        }
    }

    fn gap_impedance(p: &SectioningPost<f64>) -> f64 {
        p.graph.edge(p.contact.through[0]).unwrap().impedance
    }

    #[test]
    fn line_nodes_break_across_the_gap() {
        let p = post();
        let track_nodes: Vec<_> = p.graph.nodes().filter(|n| n.track.is_some()).collect();
        assert_eq!(track_nodes.len(), 4);
        assert!(track_nodes.iter().all(|n| n.breaking && n.coordinate == 5.0));
        // two feeders and a through edge per track, one median
        assert_eq!(p.graph.edge_count(), 7);
    }

    #[test]
    fn gap_bridged_only_with_all_feeders_open() {
        let mut p = post();
        let s = Sentinels::default();
        assert_eq!(gap_impedance(&p), s.disconnected);
        p.update_state(&record(vec![false, false], vec![false, false], true))
            .unwrap();
        assert_eq!(gap_impedance(&p), s.short);
        p.update_state(&record(vec![false, false], vec![false, false], false))
            .unwrap();
        assert_eq!(gap_impedance(&p), s.disconnected);
    }

    #[test]
    fn state_round_trip_and_size_check() {
        let mut a = post();
        a.update_state(&record(vec![true, false], vec![false, true], false))
            .unwrap();
        let mut b = post();
        b.update_state(&a.state_record()).unwrap();
        assert_eq!(a.state_record(), b.state_record());
        assert!(!b.median());
        assert!(matches!(
            b.update_state(&record(vec![true], vec![true, true], true)),
            Err(BlockError::StateSize { .. })
        ));
    }

    #[test]
    fn autotransformer_post_couples_both_sides() {
        let p = SectioningPost::build(
            "SP1".into(),
            SectioningPostParams::new(5.0, vec![1]).with_autotransformer(Windings {
                magnetizing: Complex64::new(0.0, 5_000.0),
                leakage: Complex64::new(0.02, 0.3),
            }),
            &mut BuildContext::default(),
        )
        .unwrap();
        assert_eq!(p.graph.couplings().len(), 2);
        assert!(p.windings.is_some());
        assert!(p
            .graph
            .nodes()
            .any(|n| n.track == Some(TrackId::supply(0, 1))));
    }

    #[test]
    fn autotransformer_requires_supply_wires() {
        let mut params = SectioningPostParams::new(5.0, vec![1]);
        params.autotransformer = Some(Windings {
            magnetizing: Complex64::new(0.0, 5_000.0),
            leakage: Complex64::new(0.02, 0.3),
        });
        let err = SectioningPost::build("SP1".into(), params, &mut BuildContext::default())
            .unwrap_err();
        assert!(matches!(err, BlockError::InvalidParameter { .. }));
    }

    #[test]
    fn compact_is_not_supported() {
        assert!(matches!(
            post().compact_solution(),
            Err(BlockError::NotSupported { .. })
        ));
    }
}
