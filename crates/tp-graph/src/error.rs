//! Graph-specific error types.

use thiserror::Error;
use tp_core::{EdgeId, NodeId, TpError};

/// Graph construction and analysis errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An edge refers to a node that doesn't exist (or was removed).
    #[error("Edge '{edge}' refers to non-existent node {node}")]
    MissingNode { edge: String, node: NodeId },

    /// An operation refers to an edge that doesn't exist (or was removed).
    #[error("Edge {edge} does not exist")]
    MissingEdge { edge: EdgeId },

    /// Matrix keys requested while tombstones are still present.
    #[error("Graph has removed elements; renumber before indexing")]
    NotDense,

    /// The graph has no independent cycle, so no current can circulate.
    #[error("Graph contains no independent cycle (open circuit)")]
    Open,

    /// A current-source edge is a bridge and cannot carry its prescribed current.
    #[error("Current source '{edge}' is a bridge; its current has no return path")]
    SourceBridge { edge: String },

    /// No edges at all.
    #[error("Graph has no edges")]
    Empty,
}

pub type GraphResult<T> = Result<T, GraphError>;

impl From<GraphError> for TpError {
    fn from(err: GraphError) -> Self {
        TpError::Invariant {
            what: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_into_core_errors() {
        let err = GraphError::SourceBridge {
            edge: "SS1:source".into(),
        };
        assert_eq!(
            err.to_string(),
            "Current source 'SS1:source' is a bridge; its current has no return path"
        );
        let core: TpError = err.into();
        assert!(matches!(core, TpError::Invariant { ref what } if what.contains("SS1:source")));
        assert_eq!(GraphError::Open.to_string(), "Graph contains no independent cycle (open circuit)");
    }
}
