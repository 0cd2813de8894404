//! Error types for network control.

use thiserror::Error;
use tp_blocks::BlockError;
use tp_core::TpError;
use tp_coupling::CouplingError;
use tp_solver::SolverError;

/// Errors raised while ordering, zoning or solving a network.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Invalid block order: {what}")]
    Ordering { what: String },

    #[error("No block labelled '{label}'")]
    UnknownLabel { label: String },

    #[error("Block '{label}' is not a load")]
    NotALoad { label: String },

    #[error("Duplicate block label '{label}'")]
    DuplicateLabel { label: String },

    #[error("Coordinate {coordinate} km lies outside the fed line {start}..{end} km")]
    OutOfRange {
        coordinate: f64,
        start: f64,
        end: f64,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Block error: {0}")]
    Block(#[from] BlockError),

    #[error("Coupling error: {0}")]
    Coupling(#[from] CouplingError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl From<NetworkError> for TpError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::InvalidArg { what } => TpError::InvalidArg { what },
            NetworkError::Solver(s) => s.into(),
            NetworkError::Block(b) => b.into(),
            NetworkError::Coupling(c) => c.into(),
            other => TpError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
