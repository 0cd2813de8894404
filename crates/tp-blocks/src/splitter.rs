//! Branch junction: the wiring map between a parent line and a branch.

use tp_core::{EdgeId, Phasor, Real, Sentinels};
use tp_graph::{Graph, Splice};

use crate::assembly::Assembly;
use crate::common::{check_finite, check_len, current_of, merge_interior};
use crate::error::{BlockError, BlockResult};
use crate::factory::BuildContext;
use crate::jumper::{Link, add_links};
use crate::solution::BlockSolution;
use crate::state::StateRecord;
use crate::traits::{BlockKind, Placement, TopologyBlock};

#[derive(Debug, Clone, PartialEq)]
pub struct SplitterParams<T> {
    /// Attachment point on the parent line (km).
    pub coordinate: Real,
    /// Origin of the branch on its own axis (km).
    pub branch_coordinate: Real,
    /// `a` lies on the parent line, `b` on the branch.
    pub links: Vec<Link>,
    pub impedance: T,
}

/// Explicit connection map across a branch boundary.
#[derive(Debug, Clone)]
pub struct Splitter<T> {
    label: String,
    params: SplitterParams<T>,
    sentinels: Sentinels,
    graph: Graph<T>,
    edges: Vec<EdgeId>,
    currents: Vec<T>,
}

impl<T: Phasor> Splitter<T> {
    /// Branch index served by this splitter.
    pub fn branch(&self) -> Option<u16> {
        self.params.links.first().map(|l| l.b.branch)
    }

    /// Branch index of the line the splitter hangs off.
    pub fn parent(&self) -> Option<u16> {
        self.params.links.first().map(|l| l.a.branch)
    }

    pub fn links(&self) -> &[Link] {
        &self.params.links
    }

    pub fn branch_coordinate(&self) -> Real {
        self.params.branch_coordinate
    }

    pub(crate) fn set_links(&mut self, closed: &[bool]) -> BlockResult<()> {
        check_len(&self.label, "splitter links", self.params.links.len(), closed.len())?;
        for (link, c) in self.params.links.iter_mut().zip(closed) {
            link.closed = *c;
        }
        self.rebuild()
    }

    fn rebuild(&mut self) -> BlockResult<()> {
        check_finite(&self.label, "link impedance", self.params.impedance)?;
        let Some(first) = self.params.links.first() else {
            return Err(BlockError::invalid(&self.label, "splitter without links"));
        };
        let (parent, branch) = (first.a.branch, first.b.branch);
        if parent == branch {
            return Err(BlockError::invalid(&self.label, "links must cross a branch boundary"));
        }
        if self
            .params
            .links
            .iter()
            .any(|l| l.a.branch != parent || l.b.branch != branch)
        {
            return Err(BlockError::invalid(&self.label, "all links must join the same two branches"));
        }

        let mut graph = Graph::new();
        graph.add_ground("rail");
        let (main_km, branch_km) = (self.params.coordinate, self.params.branch_coordinate);
        self.edges = add_links(
            &mut graph,
            &self.label,
            &self.params.links,
            self.params.impedance,
            &self.sentinels,
            |track| if track.branch == branch { branch_km } else { main_km },
        )?;
        self.graph = graph;
        Ok(())
    }
}

impl<T: Phasor> TopologyBlock<T> for Splitter<T> {
    type Params = SplitterParams<T>;

    fn build(label: String, params: SplitterParams<T>, ctx: &mut BuildContext) -> BlockResult<Self> {
        let mut splitter = Self {
            label,
            params,
            sentinels: ctx.sentinels,
            graph: Graph::new(),
            edges: Vec::new(),
            currents: Vec::new(),
        };
        splitter.rebuild()?;
        Ok(splitter)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Splitter
    }

    fn coordinate(&self) -> Real {
        self.params.coordinate
    }

    fn merge_into(&self, assembly: &mut Assembly<T>, placement: Placement) -> BlockResult<Splice> {
        merge_interior(&self.label, &self.graph, assembly, placement)
    }

    fn update_state(&mut self, record: &StateRecord) -> BlockResult<()> {
        let StateRecord::Splitter { links } = record else {
            return Err(BlockError::StateKind {
                label: self.label.clone(),
                expected: BlockKind::Splitter,
                found: record.kind(),
            });
        };
        self.set_links(links)
    }

    fn state_record(&self) -> StateRecord {
        StateRecord::Splitter {
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
        let mut s = BlockSolution::new::<T>(&self.label, BlockKind::Splitter, self.params.coordinate);
        for (link, i) in self.params.links.iter().zip(&self.currents) {
            s.current(format!("{}-{}", link.a, link.b), *i);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_core::TrackId;

    fn params() -> SplitterParams<f64> {
        SplitterParams {
            coordinate: 8.0,
            branch_coordinate: 0.0,
            links: vec![
                Link::closed(TrackId::main(1), TrackId::contact(1, 1)),
                Link::closed(TrackId::main(2), TrackId::contact(1, 1)),
            ],
            impedance: 0.0,
        }
    }

    #[test]
    fn nodes_sit_on_their_own_axis() {
        let s = Splitter::build("SPL1".into(), params(), &mut BuildContext::default()).unwrap();
        assert_eq!(s.branch(), Some(1));
        let branch_node = s
            .graph
            .nodes()
            .find(|n| n.track == Some(TrackId::contact(1, 1)))
            .unwrap();
        assert_eq!(branch_node.coordinate, 0.0);
        assert_eq!(s.graph.edge_count(), 2);
    }

    #[test]
    fn rejects_same_branch_links() {
        let mut p = params();
        p.links.push(Link::closed(TrackId::main(1), TrackId::main(2)));
        assert!(Splitter::build("SPL1".into(), p, &mut BuildContext::default()).is_err());
    }

    #[test]
    fn state_round_trip() {
        let mut a = Splitter::build("SPL1".into(), params(), &mut BuildContext::default()).unwrap();
        a.update_state(&StateRecord::Splitter {
            links: vec![true, false],
        })
        .unwrap();
        let mut b = Splitter::build("SPL1".into(), params(), &mut BuildContext::default()).unwrap();
        b.update_state(&a.state_record()).unwrap();
        assert_eq!(a.state_record(), b.state_record());
    }
}
