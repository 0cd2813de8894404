//! tp-graph: graph layer for traction circuits.
//!
//! Provides:
//! - Arena graph of electrical terminals (nodes) and two-terminal branches (edges)
//! - Symmetric mutual couplings between edges
//! - Tombstone removal plus dense renumbering for matrix keys
//! - Splicing one graph into another with ground unification
//! - Fundamental cycle basis for mesh analysis
//!
//! # Example
//!
//! ```
//! use tp_core::TrackId;
//! use tp_graph::{EdgePayload, Graph};
//!
//! let mut g: Graph<f64> = Graph::new();
//! let ground = g.add_ground("rail");
//! let bus = g.add_node(0.0, None, "bus", false);
//! let line = g.add_node(0.0, Some(TrackId::main(1)), "line", false);
//! g.add_edge(ground, bus, EdgePayload::new("emf", 0.01).with_emf(3300.0)).unwrap();
//! g.add_edge(bus, line, EdgePayload::new("feeder", 0.001)).unwrap();
//! g.add_edge(line, ground, EdgePayload::new("fault", 0.5)).unwrap();
//!
//! let basis = g.cycle_basis().unwrap();
//! assert_eq!(basis.len(), 1);
//! ```

pub mod cycles;
pub mod error;
pub mod graph;
pub mod renumber;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use cycles::{Cycle, CycleBasis, Orientation};
pub use error::{GraphError, GraphResult};
pub use graph::{Coupling, Edge, EdgeKind, EdgePayload, Graph, Node};
pub use renumber::{Renumbering, Splice};
