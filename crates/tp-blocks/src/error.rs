//! Error types for block operations.

use thiserror::Error;
use tp_core::TpError;
use tp_graph::GraphError;

use crate::traits::{BlockKind, Side};

/// Errors raised while building, merging or updating blocks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Block '{label}' is a {expected} but received a {found} state record")]
    StateKind {
        label: String,
        expected: BlockKind,
        found: BlockKind,
    },

    #[error("Block '{label}': {what} has {expected} elements, record has {found}")]
    StateSize {
        label: String,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Block '{label}' attaches on the wrong side: {what}")]
    WrongSide { label: String, what: String },

    #[error("Block '{label}' cannot be placed: {what}")]
    Placement { label: String, what: String },

    #[error("Block '{label}' needs the {side} shoulder of '{substation}', which is not in this zone")]
    MissingPort {
        label: String,
        substation: String,
        side: Side,
    },

    #[error("Invalid parameter for '{label}': {what}")]
    InvalidParameter { label: String, what: String },

    #[error("Not supported: {what}")]
    NotSupported { what: &'static str },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

pub type BlockResult<T> = Result<T, BlockError>;

impl BlockError {
    pub(crate) fn invalid(label: &str, what: impl Into<String>) -> Self {
        BlockError::InvalidParameter {
            label: label.to_string(),
            what: what.into(),
        }
    }
}

impl From<BlockError> for TpError {
    fn from(e: BlockError) -> Self {
        match e {
            BlockError::NotSupported { what } => TpError::InvalidArg { what },
            other => TpError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
