//! tp-coupling: mutual-impedance model for parallel conductors.
//!
//! Conductors that run side by side within one branch couple through their
//! magnetic fields. This crate holds the per-section resistivity tables and
//! turns wired conductor spans into self impedances and pairwise mutual
//! couplings.
//!
//! # Example
//!
//! ```
//! use tp_core::{EdgeId, TrackId};
//! use tp_coupling::{mutual_couplings, ConductorSpan, NetworkResistanceRange, ResistanceSection};
//!
//! let (t1, t2) = (TrackId::main(1), TrackId::main(2));
//! let table = NetworkResistanceRange::new(
//!     0.0,
//!     vec![ResistanceSection::new(10.0).with(t1, t2, 0.02)],
//! )
//! .unwrap();
//! let spans = [
//!     ConductorSpan::new(EdgeId::from_index(0), t1, 0.0, 10.0),
//!     ConductorSpan::new(EdgeId::from_index(1), t2, 5.0, 10.0),
//! ];
//! let couplings = mutual_couplings(&table, &spans).unwrap();
//! assert!((couplings[0].value - 0.1_f64).abs() < 1e-12);
//! ```

pub mod error;
pub mod resistivity;
pub mod spans;

pub use error::{CouplingError, CouplingResult};
pub use resistivity::{NetworkResistanceRange, PairResistivity, ResistanceSection, pair_key};
pub use spans::{
    COINCIDENT_KM, ConductorSpan, InductivelyCoupledSpan, LOCALITY_THRESHOLD, is_local, mutual_couplings,
    overlaps, self_impedance,
};
