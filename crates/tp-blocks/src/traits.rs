//! The contract every topology block implements.

use core::fmt;

use serde::{Deserialize, Serialize};
use tp_core::{Phasor, Real};
use tp_graph::{Graph, Splice};

use crate::assembly::Assembly;
use crate::error::{BlockError, BlockResult};
use crate::factory::BuildContext;
use crate::solution::{BlockSolution, CompactEntry};
use crate::state::StateRecord;

/// Closed set of block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Substation,
    SectioningPost,
    Load,
    Jumper,
    Splitter,
    Branch,
    Autotransformer,
    ShortCircuit,
}

impl BlockKind {
    /// Label prefix handed out by the label factory.
    pub fn prefix(self) -> &'static str {
        match self {
            BlockKind::Substation => "SS",
            BlockKind::SectioningPost => "SP",
            BlockKind::Load => "L",
            BlockKind::Jumper => "J",
            BlockKind::Splitter => "SPL",
            BlockKind::Branch => "BR",
            BlockKind::Autotransformer => "AT",
            BlockKind::ShortCircuit => "SC",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Substation => "substation",
            BlockKind::SectioningPost => "sectioning post",
            BlockKind::Load => "load",
            BlockKind::Jumper => "jumper",
            BlockKind::Splitter => "splitter",
            BlockKind::Branch => "branch",
            BlockKind::Autotransformer => "autotransformer",
            BlockKind::ShortCircuit => "short circuit",
        };
        f.write_str(name)
    }
}

/// Side of a substation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Where a block sits inside its zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Left boundary substation.
    First,
    Interior,
    /// Right boundary substation.
    Last,
}

impl Placement {
    /// The substation shoulder that faces into the zone.
    pub fn facing_side(self) -> Option<Side> {
        match self {
            Placement::First => Some(Side::Right),
            Placement::Last => Some(Side::Left),
            Placement::Interior => None,
        }
    }
}

/// Behaviour shared by all topology blocks.
///
/// A block owns a private subgraph in local ids. Merging splices it into the
/// zone graph and returns the [`Splice`] the zone keeps for later calls.
/// Between solves the zone asks the block to refresh its sources, and after
/// a solve to collect the results it reports on.
pub trait TopologyBlock<T: Phasor>: Send + Sync + Sized {
    /// Typed construction parameters.
    type Params;

    /// Construct the block and its local subgraph.
    fn build(label: String, params: Self::Params, ctx: &mut BuildContext) -> BlockResult<Self>;

    fn label(&self) -> &str;

    fn kind(&self) -> BlockKind;

    /// Longitudinal position (km) used for ordering.
    fn coordinate(&self) -> Real;

    /// Splice the local subgraph into a zone assembly.
    fn merge_into(&self, assembly: &mut Assembly<T>, placement: Placement) -> BlockResult<Splice>;

    /// Apply an external state change and rebuild the local subgraph.
    fn update_state(&mut self, record: &StateRecord) -> BlockResult<()>;

    /// Current switch and parameter state.
    fn state_record(&self) -> StateRecord;

    /// Rewrite injected currents and EMFs in an assembled zone graph.
    ///
    /// Only values change, never the topology or any impedance.
    fn refresh_sources(
        &self,
        _placement: Placement,
        _splice: &Splice,
        _graph: &mut Graph<T>,
    ) -> BlockResult<()> {
        Ok(())
    }

    /// Read solved currents and potentials back from the zone graph.
    fn collect(&mut self, placement: Placement, splice: &Splice, graph: &Graph<T>)
    -> BlockResult<()>;

    /// Reporting record built from the last collected results.
    fn solution(&self) -> BlockSolution;

    /// Dense numeric summary for bulk reporting.
    fn compact_solution(&self) -> BlockResult<CompactEntry> {
        Err(BlockError::NotSupported {
            what: "compact solution for this block kind",
        })
    }
}
