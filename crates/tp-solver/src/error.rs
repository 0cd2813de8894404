//! Error types for zone assembly and mesh solving.

use thiserror::Error;
use tp_blocks::BlockError;
use tp_core::TpError;
use tp_coupling::CouplingError;
use tp_graph::GraphError;

/// Errors that can occur while assembling or solving a zone.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Zone topology error: {what}")]
    Topology { what: String },

    #[error("Zone {zone} contains no independent cycle")]
    Open { zone: String },

    #[error("Mesh impedance matrix of zone {zone} is singular")]
    Singular { zone: String },

    #[error("Zone {zone} has no edges")]
    Empty { zone: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Zone {zone} is not ready: {what}")]
    Stage { zone: String, what: &'static str },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Block error: {0}")]
    Block(#[from] BlockError),

    #[error("Coupling error: {0}")]
    Coupling(#[from] CouplingError),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for TpError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::Graph(g) => g.into(),
            SolverError::Block(b) => b.into(),
            SolverError::Coupling(c) => c.into(),
            other => TpError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
