//! Zone assembler and mesh solver for traction power-supply circuits.
//!
//! A zone is the circuit between two neighbouring substations. This crate
//! merges the zone's block subgraphs, wires the longitudinal conductors with
//! their mutual couplings and solves the mesh-current system
//! `K·Z·Kᵗ · x = K·(E - Z·I)` for edge currents and node potentials.

pub mod error;
pub mod mesh;
pub mod wiring;
pub mod zone;

pub use error::{SolverError, SolverResult};
pub use mesh::{MeshSolution, MeshSystem, apply_solution};
pub use tp_coupling::COINCIDENT_KM;
pub use wiring::{connect, track_order};
pub use zone::{Stage, Zone};
