//! Structural checks run before matrix construction.

use tp_core::Phasor;

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;

/// The graph must be dense, non-empty and every edge must join live nodes.
pub(crate) fn validate_for_analysis<T: Phasor>(graph: &Graph<T>) -> GraphResult<()> {
    if !graph.is_dense() {
        return Err(GraphError::NotDense);
    }
    if graph.edges.is_empty() {
        return Err(GraphError::Empty);
    }
    for edge in graph.edges() {
        for node in [edge.source, edge.target] {
            if graph.node(node).is_none() {
                return Err(GraphError::MissingNode {
                    edge: edge.label.clone(),
                    node,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgePayload;

    #[test]
    fn empty_graph_rejected() {
        let mut g: Graph<f64> = Graph::new();
        g.add_ground("gnd");
        assert_eq!(validate_for_analysis(&g), Err(GraphError::Empty));
    }

    #[test]
    fn holes_rejected() {
        let mut g: Graph<f64> = Graph::new();
        let a = g.add_ground("gnd");
        let b = g.add_node(0.0, None, "b", false);
        let e = g.add_edge(a, b, EdgePayload::new("e", 1.0)).unwrap();
        g.add_edge(b, a, EdgePayload::new("f", 1.0)).unwrap();
        g.remove_edge(e).unwrap();
        assert_eq!(validate_for_analysis(&g), Err(GraphError::NotDense));
        g.renumber();
        assert!(validate_for_analysis(&g).is_ok());
    }
}
