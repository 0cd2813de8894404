//! Error types for the mutual-impedance model.

use tp_core::{Real, TpError, TrackId};
use thiserror::Error;

/// Errors raised while building or querying resistivity tables.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CouplingError {
    #[error("Coordinate range [{from}, {to}] km is not covered by any resistivity section")]
    Uncovered { from: Real, to: Real },

    #[error("No resistivity entry for track pair ({a}, {b}) at {at} km")]
    UnresolvedPair { a: TrackId, b: TrackId, at: Real },

    #[error("Invalid resistivity section: {what}")]
    BadSection { what: String },
}

pub type CouplingResult<T> = Result<T, CouplingError>;

impl From<CouplingError> for TpError {
    fn from(e: CouplingError) -> Self {
        TpError::Invariant {
            what: e.to_string(),
        }
    }
}
