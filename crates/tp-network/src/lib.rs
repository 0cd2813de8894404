//! Network controller for traction power-supply lines.
//!
//! Provides:
//! - Ordering of the line's blocks and partitioning into zones
//! - Lazy zone (re)assembly after topology changes
//! - AC outer iteration (load phase alignment + shoulder exchange)
//! - DC outer iteration (boundary exchange + boosters)
//! - A load stream API for moving trains
//!
//! # Example
//!
//! ```
//! use tp_blocks::{BlockParams, BlockSpec, LoadParams, SubstationParams};
//! use tp_core::TrackId;
//! use tp_coupling::ResistanceSection;
//! use tp_network::{Network, NetworkDescription};
//!
//! let t1 = TrackId::main(1);
//! let ss = |x| BlockSpec::new(BlockParams::Substation(
//!     SubstationParams::simple(x, vec![1], 3600.0, 0.0),
//! ));
//! let description = NetworkDescription::new(
//!     "demo",
//!     0.0,
//!     vec![ResistanceSection::new(20.0).with(t1, t1, 0.01)],
//!     vec![ss(0.0), ss(20.0)],
//! );
//! let mut network: Network<f64> = Network::new(description).unwrap();
//! network.add_load(LoadParams::new(10.0, t1, 100.0)).unwrap();
//! let report = network.solve().unwrap();
//! assert!(report.converged());
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod ordering;
pub mod report;

pub use config::SolverConfig;
pub use error::{NetworkError, NetworkResult};
pub use network::{Network, NetworkDescription};
pub use ordering::{Tie, boundaries, order};
pub use report::{Convergence, SolveReport, ZoneReport};
