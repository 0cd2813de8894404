//! The closed set of blocks and their construction specs.

use tp_core::{Phasor, Real};
use tp_graph::{Graph, Splice};

use crate::assembly::Assembly;
use crate::autotransformer::{Autotransformer, AutotransformerParams};
use crate::branch::{Branch, BranchParams};
use crate::error::BlockResult;
use crate::factory::BuildContext;
use crate::jumper::{Jumper, JumperParams};
use crate::load::{Load, LoadParams};
use crate::sectioning_post::{SectioningPost, SectioningPostParams};
use crate::short_circuit::{ShortCircuit, ShortCircuitParams};
use crate::solution::{BlockSolution, CompactEntry, CompactSummary};
use crate::splitter::{Splitter, SplitterParams};
use crate::state::StateRecord;
use crate::substation::{Substation, SubstationParams};
use crate::traits::{BlockKind, Placement, TopologyBlock};

/// Construction parameters of any block kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockParams<T> {
    Substation(SubstationParams<T>),
    SectioningPost(SectioningPostParams<T>),
    Load(LoadParams<T>),
    Jumper(JumperParams<T>),
    Splitter(SplitterParams<T>),
    Branch(BranchParams<T>),
    Autotransformer(AutotransformerParams<T>),
    ShortCircuit(ShortCircuitParams<T>),
}

impl<T> BlockParams<T> {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockParams::Substation(_) => BlockKind::Substation,
            BlockParams::SectioningPost(_) => BlockKind::SectioningPost,
            BlockParams::Load(_) => BlockKind::Load,
            BlockParams::Jumper(_) => BlockKind::Jumper,
            BlockParams::Splitter(_) => BlockKind::Splitter,
            BlockParams::Branch(_) => BlockKind::Branch,
            BlockParams::Autotransformer(_) => BlockKind::Autotransformer,
            BlockParams::ShortCircuit(_) => BlockKind::ShortCircuit,
        }
    }
}

/// A block to build, with an optional explicit label.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpec<T> {
    pub label: Option<String>,
    pub params: BlockParams<T>,
}

impl<T> BlockSpec<T> {
    pub fn new(params: BlockParams<T>) -> Self {
        Self {
            label: None,
            params,
        }
    }

    pub fn labelled(label: impl Into<String>, params: BlockParams<T>) -> Self {
        Self {
            label: Some(label.into()),
            params,
        }
    }
}

/// Any topology block.
#[derive(Debug, Clone)]
pub enum Block<T> {
    Substation(Substation<T>),
    SectioningPost(SectioningPost<T>),
    Load(Load<T>),
    Jumper(Jumper<T>),
    Splitter(Splitter<T>),
    Branch(Branch<T>),
    Autotransformer(Autotransformer<T>),
    ShortCircuit(ShortCircuit<T>),
}

macro_rules! dispatch {
    ($block:expr, $b:ident => $body:expr) => {
        match $block {
            Block::Substation($b) => $body,
            Block::SectioningPost($b) => $body,
            Block::Load($b) => $body,
            Block::Jumper($b) => $body,
            Block::Splitter($b) => $body,
            Block::Branch($b) => $body,
            Block::Autotransformer($b) => $body,
            Block::ShortCircuit($b) => $body,
        }
    };
}

impl<T: Phasor> Block<T> {
    /// Build a block from its spec, drawing a label from the context if needed.
    pub fn from_spec(spec: BlockSpec<T>, ctx: &mut BuildContext) -> BlockResult<Self> {
        let label = ctx.label(spec.params.kind(), spec.label);
        Self::build(label, spec.params, ctx)
    }

    pub fn as_substation(&self) -> Option<&Substation<T>> {
        match self {
            Block::Substation(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_substation_mut(&mut self) -> Option<&mut Substation<T>> {
        match self {
            Block::Substation(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_load(&self) -> Option<&Load<T>> {
        match self {
            Block::Load(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_load_mut(&mut self) -> Option<&mut Load<T>> {
        match self {
            Block::Load(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_branch(&self) -> Option<&Branch<T>> {
        match self {
            Block::Branch(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_branch_mut(&mut self) -> Option<&mut Branch<T>> {
        match self {
            Block::Branch(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_substation(&self) -> bool {
        matches!(self, Block::Substation(_))
    }

    /// Branch index of the line the block stands on.
    pub fn line(&self) -> Option<u16> {
        match self {
            Block::Substation(_) => Some(0),
            Block::SectioningPost(p) => Some(p.params().branch),
            Block::Load(l) => Some(l.track().branch),
            Block::Jumper(j) => j.links().first().map(|l| l.a.branch),
            Block::Splitter(s) => s.parent(),
            Block::Branch(b) => b.splitter().parent(),
            Block::Autotransformer(a) => Some(a.branch()),
            Block::ShortCircuit(s) => Some(s.track().branch),
        }
    }

    /// Find a block by label, looking into branch containers.
    pub fn find(&self, label: &str) -> Option<&Block<T>> {
        if self.label() == label {
            return Some(self);
        }
        self.as_branch()?.blocks().iter().find_map(|b| b.find(label))
    }

    pub fn find_mut(&mut self, label: &str) -> Option<&mut Block<T>> {
        if self.label() == label {
            return Some(self);
        }
        self.as_branch_mut()?
            .blocks_mut()
            .iter_mut()
            .find_map(|b| b.find_mut(label))
    }

    /// Apply `f` to every load, nested ones included.
    pub fn for_each_load_mut(&mut self, f: &mut impl FnMut(&mut Load<T>)) {
        match self {
            Block::Load(l) => f(l),
            Block::Branch(b) => {
                for inner in b.blocks_mut() {
                    inner.for_each_load_mut(f);
                }
            }
            _ => {}
        }
    }

    /// Reporting records of this block and everything nested in it.
    pub fn solutions(&self) -> Vec<BlockSolution> {
        let mut out = vec![self.solution()];
        if let Block::Branch(b) = self {
            out.push(b.splitter().solution());
            for inner in b.blocks() {
                out.extend(inner.solutions());
            }
        }
        out
    }

    /// Add the compact entries of this block and its nested blocks.
    pub fn compact_into(&self, summary: &mut CompactSummary) {
        if let Ok(entry) = self.compact_solution() {
            summary.push(entry);
        }
        if let Block::Branch(b) = self {
            for inner in b.blocks() {
                inner.compact_into(summary);
            }
        }
    }
}

impl<T: Phasor> TopologyBlock<T> for Block<T> {
    type Params = BlockParams<T>;

    fn build(label: String, params: BlockParams<T>, ctx: &mut BuildContext) -> BlockResult<Self> {
        Ok(match params {
            BlockParams::Substation(p) => Block::Substation(Substation::build(label, p, ctx)?),
            BlockParams::SectioningPost(p) => {
                Block::SectioningPost(SectioningPost::build(label, p, ctx)?)
            }
            BlockParams::Load(p) => Block::Load(Load::build(label, p, ctx)?),
            BlockParams::Jumper(p) => Block::Jumper(Jumper::build(label, p, ctx)?),
            BlockParams::Splitter(p) => Block::Splitter(Splitter::build(label, p, ctx)?),
            BlockParams::Branch(p) => Block::Branch(Branch::build(label, p, ctx)?),
            BlockParams::Autotransformer(p) => {
                Block::Autotransformer(Autotransformer::build(label, p, ctx)?)
            }
            BlockParams::ShortCircuit(p) => Block::ShortCircuit(ShortCircuit::build(label, p, ctx)?),
        })
    }

    fn label(&self) -> &str {
        dispatch!(self, b => b.label())
    }

    fn kind(&self) -> BlockKind {
        dispatch!(self, b => b.kind())
    }

    fn coordinate(&self) -> Real {
        dispatch!(self, b => b.coordinate())
    }

    fn merge_into(&self, assembly: &mut Assembly<T>, placement: Placement) -> BlockResult<Splice> {
        dispatch!(self, b => b.merge_into(assembly, placement))
    }

    fn update_state(&mut self, record: &StateRecord) -> BlockResult<()> {
        dispatch!(self, b => b.update_state(record))
    }

    fn state_record(&self) -> StateRecord {
        dispatch!(self, b => b.state_record())
    }

    fn refresh_sources(
        &self,
        placement: Placement,
        splice: &Splice,
        graph: &mut Graph<T>,
    ) -> BlockResult<()> {
        dispatch!(self, b => b.refresh_sources(placement, splice, graph))
    }

    fn collect(&mut self, placement: Placement, splice: &Splice, graph: &Graph<T>) -> BlockResult<()> {
        dispatch!(self, b => b.collect(placement, splice, graph))
    }

    fn solution(&self) -> BlockSolution {
        dispatch!(self, b => b.solution())
    }

    fn compact_solution(&self) -> BlockResult<CompactEntry> {
        dispatch!(self, b => b.compact_solution())
    }
}
