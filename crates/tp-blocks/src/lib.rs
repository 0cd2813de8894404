//! tp-blocks: topology block library for traction power-supply networks.
//!
//! Provides the building blocks of a line:
//! - Substations with two shoulders (simple, duplex, 2×25 kV, boosted DC)
//! - Sectioning posts, optionally with autotransformers
//! - Loads, jumpers, splitters, branch containers
//! - Autotransformer and short-circuit points
//!
//! Every block implements [`TopologyBlock`]: it owns a small subgraph in local
//! ids, splices it into a zone [`Assembly`], and later reads its results back
//! from the solved zone graph.
//!
//! # Example
//!
//! ```
//! use tp_blocks::{Assembly, BuildContext, Load, LoadParams, Placement, TopologyBlock};
//! use tp_core::{Sentinels, TrackId};
//!
//! let mut ctx = BuildContext::default();
//! let label = ctx.label(tp_blocks::BlockKind::Load, None);
//! let load: Load<f64> =
//!     Load::build(label, LoadParams::new(12.0, TrackId::main(1), 400.0), &mut ctx).unwrap();
//!
//! let mut zone = Assembly::new(Sentinels::default());
//! let splice = load.merge_into(&mut zone, Placement::Interior).unwrap();
//! assert_eq!(splice.edges.len(), 1);
//! assert_eq!(load.label(), "L1");
//! ```

pub mod assembly;
pub mod autotransformer;
pub mod block;
pub mod branch;
pub mod common;
pub mod error;
pub mod factory;
pub mod jumper;
pub mod load;
pub mod sectioning_post;
pub mod short_circuit;
pub mod solution;
pub mod splitter;
pub mod state;
pub mod substation;
pub mod traits;

// Re-exports
pub use assembly::{Assembly, ShoulderPort};
pub use autotransformer::{Autotransformer, AutotransformerParams, WindingReadings, Windings};
pub use block::{Block, BlockParams, BlockSpec};
pub use branch::{Branch, BranchFeed, BranchParams};
pub use error::{BlockError, BlockResult};
pub use factory::{BuildContext, LabelFactory};
pub use jumper::{Jumper, JumperParams, Link};
pub use load::{Load, LoadParams};
pub use sectioning_post::{SectioningPost, SectioningPostParams};
pub use short_circuit::{ShortCircuit, ShortCircuitParams};
pub use solution::{BlockSolution, CompactEntry, CompactSummary, Reading};
pub use splitter::{Splitter, SplitterParams};
pub use state::{FeederState, PhasorRecord, StateRecord};
pub use substation::{
    Booster, Shoulder, ShoulderReadings, Substation, SubstationKind, SubstationParams,
};
pub use traits::{BlockKind, Placement, Side, TopologyBlock};
