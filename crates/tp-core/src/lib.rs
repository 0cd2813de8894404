//! tp-core: stable foundation for the traction power-supply engine.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real + tolerances + sentinels)
//! - phasor (the value abstraction shared by AC and DC systems)
//! - ids (stable compact IDs for graph/model objects)
//! - track (conductor identifiers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod phasor;
pub mod track;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{TpError, TpResult};
pub use ids::*;
pub use numeric::*;
pub use phasor::{Complex64, Phasor, SystemKind, angle_delta};
pub use track::{BRANCH_STRIDE, TrackId, Wire};
pub use units::*;
