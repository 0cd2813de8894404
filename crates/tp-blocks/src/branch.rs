//! Branch containers: spur lines with their own block list.
//!
//! A branch hangs off the main line through exactly one [`Splitter`] and may
//! be fed from one main-line substation. Its feeders are spliced onto the
//! busbar of the substation shoulder that faces the attachment point, so the
//! branch lands in the same zone as that shoulder.

use tp_core::{EdgeId, NodeId, Phasor, Real, Sentinels, TrackId};
use tp_graph::{EdgePayload, Graph, Splice};

use crate::assembly::Assembly;
use crate::block::{Block, BlockSpec};
use crate::common::{check_finite, check_len, current_of, feeder_impedance};
use crate::error::{BlockError, BlockResult};
use crate::factory::BuildContext;
use crate::solution::BlockSolution;
use crate::splitter::{Splitter, SplitterParams};
use crate::state::StateRecord;
use crate::traits::{BlockKind, Placement, Side, TopologyBlock};

/// Feeding arrangement of a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchFeed<T> {
    /// Label of the feeding main-line substation.
    pub substation: String,
    /// Shoulder to use when the attachment point coincides with the
    /// substation axis. Checked against the derived side otherwise.
    pub side: Option<Side>,
    /// Feeding point on the branch axis (km).
    pub coordinate: Real,
    pub tracks: Vec<u16>,
    pub feeder: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BranchParams<T> {
    /// Branch index, at least 1.
    pub index: u16,
    pub splitter: SplitterParams<T>,
    pub blocks: Vec<BlockSpec<T>>,
    pub feed: Option<BranchFeed<T>>,
}

#[derive(Debug, Clone)]
pub struct Branch<T> {
    label: String,
    index: u16,
    sentinels: Sentinels,
    splitter: Splitter<T>,
    blocks: Vec<Block<T>>,
    feed: Option<BranchFeed<T>>,
    side: Option<Side>,
    feeders_closed: Vec<bool>,
    graph: Graph<T>,
    feed_bus: Option<NodeId>,
    feeder_edges: Vec<EdgeId>,
    feeder_currents: Vec<T>,
}

impl<T: Phasor> Branch<T> {
    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn splitter(&self) -> &Splitter<T> {
        &self.splitter
    }

    pub fn blocks(&self) -> &[Block<T>] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut [Block<T>] {
        &mut self.blocks
    }

    /// Label of the feeding substation, if any.
    pub fn feeding_substation(&self) -> Option<&str> {
        self.feed.as_ref().map(|f| f.substation.as_str())
    }

    /// Resolved feeding shoulder.
    pub fn feed_side(&self) -> Option<Side> {
        self.side
    }

    /// Derive the feeding shoulder from the feeding substation's coordinate.
    ///
    /// An attachment left of the substation axis is fed from the left
    /// shoulder, right of it from the right one. On the axis itself the
    /// declared side decides.
    pub fn resolve_side(&mut self, substation_coordinate: Real) -> BlockResult<Option<Side>> {
        let Some(feed) = &self.feed else {
            return Ok(None);
        };
        let attach = self.splitter.coordinate();
        let derived = if attach < substation_coordinate {
            Some(Side::Left)
        } else if attach > substation_coordinate {
            Some(Side::Right)
        } else {
            None
        };
        let side = match (derived, feed.side) {
            (Some(d), Some(declared)) if d != declared => {
                return Err(BlockError::WrongSide {
                    label: self.label.clone(),
                    what: format!(
                        "attached at {attach} km, which is {d} of '{}', but declared {declared}",
                        feed.substation
                    ),
                });
            }
            (Some(d), _) => d,
            (None, Some(declared)) => declared,
            (None, None) => {
                return Err(BlockError::WrongSide {
                    label: self.label.clone(),
                    what: format!(
                        "attached on the axis of '{}'; declare the feeding side",
                        feed.substation
                    ),
                });
            }
        };
        self.side = Some(side);
        Ok(Some(side))
    }

    /// Add a block to the branch. It must stand on this branch.
    pub fn insert(&mut self, block: Block<T>) -> BlockResult<()> {
        self.check_member(&block)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Remove a directly contained block by label.
    pub fn remove(&mut self, label: &str) -> Option<Block<T>> {
        let at = self.blocks.iter().position(|b| b.label() == label)?;
        Some(self.blocks.remove(at))
    }

    fn check_member(&self, block: &Block<T>) -> BlockResult<()> {
        if block.is_substation() {
            return Err(BlockError::Placement {
                label: block.label().to_string(),
                what: format!("substations cannot stand on branch {}", self.index),
            });
        }
        if block.line() != Some(self.index) {
            return Err(BlockError::Placement {
                label: block.label().to_string(),
                what: format!("block is not on branch {}", self.index),
            });
        }
        Ok(())
    }

    fn rebuild(&mut self) -> BlockResult<()> {
        let mut graph = Graph::new();
        graph.add_ground("rail");
        let mut edges = Vec::new();
        let mut feed_bus = None;
        if let Some(feed) = &self.feed {
            check_finite(&self.label, "feeder impedance", feed.feeder)?;
            // Coordinate of the port bus is irrelevant: the node is pinned.
            let bus = graph.add_node(feed.coordinate, None, format!("{}:feed bus", self.label), false);
            for (&track, &closed) in feed.tracks.iter().zip(&self.feeders_closed) {
                let t = TrackId::contact(self.index, track);
                let node = graph.add_node(feed.coordinate, Some(t), format!("{}:{t}", self.label), true);
                edges.push(graph.add_edge(
                    bus,
                    node,
                    EdgePayload::new(
                        format!("{}:feeder {t}", self.label),
                        feeder_impedance(closed, feed.feeder, &self.sentinels),
                    ),
                )?);
            }
            feed_bus = Some(bus);
        }
        self.graph = graph;
        self.feed_bus = feed_bus;
        self.feeder_edges = edges;
        Ok(())
    }

    fn children<'a>(&self, splice: &'a Splice) -> BlockResult<&'a [Splice]> {
        if splice.children.len() != self.blocks.len() + 1 {
            return Err(BlockError::Placement {
                label: self.label.clone(),
                what: "branch splice does not match its block list".into(),
            });
        }
        Ok(&splice.children)
    }
}

impl<T: Phasor> TopologyBlock<T> for Branch<T> {
    type Params = BranchParams<T>;

    fn build(label: String, params: BranchParams<T>, ctx: &mut BuildContext) -> BlockResult<Self> {
        if params.index == 0 {
            return Err(BlockError::invalid(&label, "branch index 0 is the main line"));
        }
        let splitter_label = ctx.label(BlockKind::Splitter, None);
        let splitter = Splitter::build(splitter_label, params.splitter, ctx)?;
        if splitter.branch() != Some(params.index) {
            return Err(BlockError::invalid(
                &label,
                format!("splitter does not lead onto branch {}", params.index),
            ));
        }
        if splitter.parent().is_some_and(|p| p >= params.index) {
            return Err(BlockError::invalid(&label, "a branch must hang off a lower-indexed line"));
        }

        let feeders_closed = params
            .feed
            .as_ref()
            .map_or_else(Vec::new, |f| vec![true; f.tracks.len()]);
        let mut branch = Self {
            label,
            index: params.index,
            sentinels: ctx.sentinels,
            splitter,
            blocks: Vec::with_capacity(params.blocks.len()),
            feed: params.feed,
            side: None,
            feeders_closed,
            graph: Graph::new(),
            feed_bus: None,
            feeder_edges: Vec::new(),
            feeder_currents: Vec::new(),
        };
        for spec in params.blocks {
            let block = Block::from_spec(spec, ctx)?;
            branch.insert(block)?;
        }
        branch.rebuild()?;
        Ok(branch)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Branch
    }

    fn coordinate(&self) -> Real {
        self.splitter.coordinate()
    }

    fn merge_into(&self, assembly: &mut Assembly<T>, placement: Placement) -> BlockResult<Splice> {
        if placement != Placement::Interior {
            return Err(BlockError::Placement {
                label: self.label.clone(),
                what: "a branch cannot bound a zone".into(),
            });
        }
        let mut splice = match (&self.feed, self.feed_bus) {
            (Some(feed), Some(bus)) => {
                let side = self.side.ok_or_else(|| BlockError::Placement {
                    label: self.label.clone(),
                    what: "feeding side has not been resolved".into(),
                })?;
                let port = assembly
                    .port(&feed.substation, side)
                    .ok_or_else(|| BlockError::MissingPort {
                        label: self.label.clone(),
                        substation: feed.substation.clone(),
                        side,
                    })?;
                assembly.graph.absorb_pinned(&self.graph, &[(bus, port.bus)])?
            }
            _ => assembly.graph.absorb(&self.graph)?,
        };
        splice
            .children
            .push(self.splitter.merge_into(assembly, Placement::Interior)?);
        for block in &self.blocks {
            splice
                .children
                .push(block.merge_into(assembly, Placement::Interior)?);
        }
        Ok(splice)
    }

    fn update_state(&mut self, record: &StateRecord) -> BlockResult<()> {
        let StateRecord::Branch { splitter, feeders } = record else {
            return Err(BlockError::StateKind {
                label: self.label.clone(),
                expected: BlockKind::Branch,
                found: record.kind(),
            });
        };
        check_len(&self.label, "branch feeders", self.feeders_closed.len(), feeders.len())?;
        self.splitter.set_links(splitter)?;
        self.feeders_closed.clone_from(feeders);
        self.rebuild()
    }

    fn state_record(&self) -> StateRecord {
        StateRecord::Branch {
            splitter: self.splitter.links().iter().map(|l| l.closed).collect(),
            feeders: self.feeders_closed.clone(),
        }
    }

    fn refresh_sources(
        &self,
        _placement: Placement,
        splice: &Splice,
        graph: &mut Graph<T>,
    ) -> BlockResult<()> {
        let children = self.children(splice)?;
        for (block, child) in self.blocks.iter().zip(&children[1..]) {
            block.refresh_sources(Placement::Interior, child, graph)?;
        }
        Ok(())
    }

    fn collect(&mut self, _placement: Placement, splice: &Splice, graph: &Graph<T>) -> BlockResult<()> {
        let children = self.children(splice)?;
        self.splitter.collect(Placement::Interior, &children[0], graph)?;
        for (block, child) in self.blocks.iter_mut().zip(&children[1..]) {
            block.collect(Placement::Interior, child, graph)?;
        }
        self.feeder_currents = self
            .feeder_edges
            .iter()
            .map(|e| current_of(graph, splice, *e))
            .collect::<BlockResult<_>>()?;
        Ok(())
    }

    fn solution(&self) -> BlockSolution {
        let mut s = BlockSolution::new::<T>(&self.label, BlockKind::Branch, self.coordinate())
            .describe(format!("branch {}", self.index));
        s.attribute("blocks", self.blocks.len());
        if let (Some(feed), Some(side)) = (&self.feed, self.side) {
            s.attribute("fed from", format!("{} ({side})", feed.substation));
            for (track, i) in feed.tracks.iter().zip(&self.feeder_currents) {
                s.current(format!("feeder {}", TrackId::contact(self.index, *track)), *i);
            }
        }
        s
    }
}
