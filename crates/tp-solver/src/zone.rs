//! One assembled zone: the circuit between two neighbouring substations.
//!
//! A zone moves through `Merged → Wired → Built → Solved`. Merging splices
//! every member block into one assembly, wiring adds the conductors between
//! them, building factorizes the mesh matrix and solving may then be repeated
//! as often as the sources change.

use std::fmt;

use tp_blocks::{Assembly, Block, Placement, TopologyBlock};
use tp_core::{EdgeId, Phasor, Sentinels};
use tp_coupling::NetworkResistanceRange;
use tp_graph::{Graph, GraphError, Splice};

use crate::error::{SolverError, SolverResult};
use crate::mesh::{MeshSystem, apply_solution};
use crate::wiring::connect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Merged,
    Wired,
    Built,
    Solved,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Merged => "merged",
            Stage::Wired => "wired",
            Stage::Built => "built",
            Stage::Solved => "solved",
        };
        f.write_str(name)
    }
}

/// A block spliced into the zone.
#[derive(Debug, Clone)]
struct Member {
    /// Position relative to the zone's first block.
    offset: usize,
    placement: Placement,
    splice: Splice,
}

/// Assembled circuit of one inter-substation segment.
///
/// Members are addressed by their index in the caller's ordered block list;
/// the zone covers the contiguous range `first..=first + span`.
#[derive(Debug, Clone)]
pub struct Zone<T: Phasor> {
    name: String,
    first: usize,
    span: usize,
    assembly: Assembly<T>,
    members: Vec<Member>,
    conductors: Vec<EdgeId>,
    mesh: Option<MeshSystem<T>>,
    stage: Stage,
}

impl<T: Phasor> Zone<T> {
    /// Splice `blocks[first..=last]` into a fresh assembly.
    ///
    /// Both ends must be substations and no substation may sit in between.
    /// The boundary substations merge first so their shoulder ports exist
    /// before any branch feeder looks for them.
    pub fn merge(
        blocks: &[Block<T>],
        first: usize,
        last: usize,
        sentinels: Sentinels,
    ) -> SolverResult<Self> {
        if last <= first || last >= blocks.len() {
            return Err(SolverError::Topology {
                what: format!(
                    "a zone needs two boundary substations, got blocks {first}..={last} of {}",
                    blocks.len()
                ),
            });
        }
        let (left, right) = (&blocks[first], &blocks[last]);
        for end in [left, right] {
            if !end.is_substation() {
                return Err(SolverError::Topology {
                    what: format!("zone boundary '{}' is not a substation", end.label()),
                });
            }
        }
        if let Some(inner) = blocks[first + 1..last].iter().find(|b| b.is_substation()) {
            return Err(SolverError::Topology {
                what: format!(
                    "substation '{}' lies inside zone {}..{}",
                    inner.label(),
                    left.label(),
                    right.label()
                ),
            });
        }

        let name = format!("{}..{}", left.label(), right.label());
        let mut assembly = Assembly::new(sentinels);
        let mut members = Vec::with_capacity(last - first + 1);
        let order = [(first, Placement::First), (last, Placement::Last)]
            .into_iter()
            .chain((first + 1..last).map(|i| (i, Placement::Interior)));
        for (index, placement) in order {
            let splice = blocks[index].merge_into(&mut assembly, placement)?;
            members.push(Member {
                offset: index - first,
                placement,
                splice,
            });
        }
        tracing::debug!(
            zone = %name,
            blocks = members.len(),
            nodes = assembly.graph.node_count(),
            edges = assembly.graph.edge_count(),
            "zone merged"
        );

        Ok(Self {
            name,
            first,
            span: last - first,
            assembly,
            members,
            conductors: Vec::new(),
            mesh: None,
            stage: Stage::Merged,
        })
    }

    /// Merge, wire and build in one go.
    pub fn assemble(
        blocks: &[Block<T>],
        first: usize,
        last: usize,
        range: &NetworkResistanceRange<T>,
        sentinels: Sentinels,
    ) -> SolverResult<Self> {
        let mut zone = Self::merge(blocks, first, last, sentinels)?;
        zone.wire(range)?;
        zone.build()?;
        Ok(zone)
    }

    /// (Re)connect the conductors between member nodes.
    ///
    /// Previously wired conductors and their couplings are dropped first, so
    /// wiring twice yields the same graph.
    pub fn wire(&mut self, range: &NetworkResistanceRange<T>) -> SolverResult<()> {
        for edge in self.conductors.drain(..) {
            self.assembly.graph.remove_edge(edge)?;
        }
        let map = self.assembly.graph.renumber();
        if !map.is_identity() {
            for member in &mut self.members {
                member.splice.remap(&map)?;
            }
            self.assembly.remap_ports(&map)?;
        }
        let sentinels = self.assembly.sentinels;
        self.conductors = connect(&mut self.assembly.graph, range, &sentinels)?;
        self.mesh = None;
        self.stage = Stage::Wired;
        Ok(())
    }

    /// Compute the cycle basis and factorize the mesh matrix.
    pub fn build(&mut self) -> SolverResult<()> {
        self.require(Stage::Wired, "wire before building")?;
        let basis = self.assembly.graph.cycle_basis().map_err(|e| match e {
            GraphError::Open => SolverError::Open {
                zone: self.name.clone(),
            },
            GraphError::Empty => SolverError::Empty {
                zone: self.name.clone(),
            },
            other => other.into(),
        })?;
        let mesh = MeshSystem::new(&self.assembly.graph, &basis, &self.name)?;
        tracing::debug!(
            zone = %self.name,
            edges = mesh.edges(),
            cycles = mesh.cycles(),
            "zone built"
        );
        self.mesh = Some(mesh);
        self.stage = Stage::Built;
        Ok(())
    }

    /// Pull the members' current sources into the assembled graph.
    ///
    /// Only injected currents and EMFs change, so the factorization stays.
    pub fn refresh(&mut self, blocks: &[Block<T>]) -> SolverResult<()> {
        self.require(Stage::Built, "build before refreshing sources")?;
        for member in &self.members {
            let block = self.block(blocks, member)?;
            block.refresh_sources(member.placement, &member.splice, &mut self.assembly.graph)?;
        }
        if let Some(mesh) = self.mesh.as_mut() {
            mesh.load_sources(&self.assembly.graph);
        }
        if self.stage == Stage::Solved {
            self.stage = Stage::Built;
        }
        Ok(())
    }

    /// Solve for edge currents and node potentials.
    pub fn solve(&mut self) -> SolverResult<()> {
        self.require(Stage::Built, "build before solving")?;
        let Some(mesh) = self.mesh.as_ref() else {
            return Err(SolverError::Stage {
                zone: self.name.clone(),
                what: "mesh matrix missing",
            });
        };
        let solution = mesh.solve(&self.name)?;
        let sentinels = self.assembly.sentinels;
        apply_solution(&mut self.assembly.graph, &solution, &sentinels)?;
        self.stage = Stage::Solved;
        Ok(())
    }

    /// Hand the solved values to the member blocks.
    pub fn collect_into(&self, blocks: &mut [Block<T>]) -> SolverResult<()> {
        self.require(Stage::Solved, "solve before collecting")?;
        for member in &self.members {
            let index = self.first + member.offset;
            let block = blocks.get_mut(index).ok_or_else(|| SolverError::Topology {
                what: format!("zone {} lost its block #{index}", self.name),
            })?;
            block.collect(member.placement, &member.splice, &self.assembly.graph)?;
        }
        Ok(())
    }

    /// Move the zone after the caller's block list shifted.
    pub fn relocate(&mut self, first: usize) {
        self.first = first;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn last(&self) -> usize {
        self.first + self.span
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.first..=self.last()).contains(&index)
    }

    pub fn graph(&self) -> &Graph<T> {
        &self.assembly.graph
    }

    pub fn conductors(&self) -> &[EdgeId] {
        &self.conductors
    }

    pub fn mesh(&self) -> Option<&MeshSystem<T>> {
        self.mesh.as_ref()
    }

    fn block<'b>(&self, blocks: &'b [Block<T>], member: &Member) -> SolverResult<&'b Block<T>> {
        let index = self.first + member.offset;
        blocks.get(index).ok_or_else(|| SolverError::Topology {
            what: format!("zone {} lost its block #{index}", self.name),
        })
    }

    fn require(&self, stage: Stage, what: &'static str) -> SolverResult<()> {
        if self.stage < stage {
            return Err(SolverError::Stage {
                zone: self.name.clone(),
                what,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_blocks::{BlockParams, BlockSpec, BuildContext, LoadParams, SubstationParams};
    use tp_core::TrackId;
    use tp_coupling::ResistanceSection;

    fn blocks(specs: Vec<BlockSpec<f64>>) -> Vec<Block<f64>> {
        let mut ctx = BuildContext::default();
        specs
            .into_iter()
            .map(|s| Block::from_spec(s, &mut ctx).unwrap())
            .collect()
    }

    fn ss(x: f64) -> BlockSpec<f64> {
        BlockSpec::new(BlockParams::Substation(SubstationParams::simple(
            x,
            vec![1],
            3600.0,
            0.05,
        )))
    }

    fn load(x: f64) -> BlockSpec<f64> {
        BlockSpec::new(BlockParams::Load(LoadParams::new(x, TrackId::main(1), 500.0)))
    }

    fn range() -> NetworkResistanceRange<f64> {
        let t = TrackId::main(1);
        NetworkResistanceRange::new(0.0, vec![ResistanceSection::new(20.0).with(t, t, 0.01)])
            .unwrap()
    }

    #[test]
    fn boundaries_must_be_substations() {
        let list = blocks(vec![ss(0.0), load(5.0), ss(10.0), load(15.0)]);
        let err = Zone::merge(&list, 1, 2, Sentinels::default()).unwrap_err();
        assert!(matches!(err, SolverError::Topology { .. }), "{err}");
        let err = Zone::merge(&list, 0, 0, Sentinels::default()).unwrap_err();
        assert!(matches!(err, SolverError::Topology { .. }), "{err}");
        assert!(Zone::merge(&list, 0, 2, Sentinels::default()).is_ok());
    }

    #[test]
    fn inner_substation_rejected() {
        let list = blocks(vec![ss(0.0), ss(5.0), ss(10.0)]);
        assert!(Zone::merge(&list, 0, 2, Sentinels::default()).is_err());
    }

    #[test]
    fn stages_are_enforced() {
        let list = blocks(vec![ss(0.0), load(5.0), ss(10.0)]);
        let mut zone = Zone::merge(&list, 0, 2, Sentinels::default()).unwrap();
        assert_eq!(zone.name(), "SS1..SS2");
        assert!(matches!(zone.solve(), Err(SolverError::Stage { .. })));
        assert!(matches!(zone.build(), Err(SolverError::Stage { .. })));
        zone.wire(&range()).unwrap();
        zone.build().unwrap();
        zone.solve().unwrap();
        assert_eq!(zone.stage(), Stage::Solved);
    }

    #[test]
    fn rewiring_is_idempotent() {
        let list = blocks(vec![ss(0.0), load(5.0), ss(10.0)]);
        let mut zone = Zone::merge(&list, 0, 2, Sentinels::default()).unwrap();
        zone.wire(&range()).unwrap();
        let (nodes, edges) = (zone.graph().node_count(), zone.graph().edge_count());
        zone.wire(&range()).unwrap();
        assert_eq!(zone.graph().node_count(), nodes);
        assert_eq!(zone.graph().edge_count(), edges);
        assert_eq!(zone.stage(), Stage::Wired);
    }

    #[test]
    fn relocation_moves_the_range() {
        let list = blocks(vec![ss(0.0), load(5.0), ss(10.0)]);
        let mut zone = Zone::merge(&list, 0, 2, Sentinels::default()).unwrap();
        zone.relocate(3);
        assert_eq!((zone.first(), zone.last()), (3, 5));
        assert!(zone.contains(4) && !zone.contains(2));
    }
}
