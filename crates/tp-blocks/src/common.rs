//! Helpers shared by the block implementations.

use tp_core::{EdgeId, NodeId, Phasor, Sentinels, ensure_finite};
use tp_graph::{Graph, Splice};

use crate::assembly::Assembly;
use crate::error::{BlockError, BlockResult};
use crate::traits::Placement;

/// Impedance of a switched feeder with its own series impedance.
pub fn feeder_impedance<T: Phasor>(closed: bool, z: T, sentinels: &Sentinels) -> T {
    if closed {
        sentinels.clamp_short(z)
    } else {
        T::ohms(sentinels.disconnected)
    }
}

/// Check a state record vector against the block's element count.
pub fn check_len(label: &str, what: &'static str, expected: usize, found: usize) -> BlockResult<()> {
    if expected != found {
        return Err(BlockError::StateSize {
            label: label.to_string(),
            what,
            expected,
            found,
        });
    }
    Ok(())
}

/// Reject non-finite parameters.
pub fn check_finite<T: Phasor>(label: &str, what: &'static str, value: T) -> BlockResult<()> {
    let (re, im) = value.parts();
    ensure_finite(re, what)
        .and_then(|_| ensure_finite(im, what))
        .map(drop)
        .map_err(|e| BlockError::invalid(label, e.to_string()))
}

/// Splice a plain block (one local graph, no boundary role) into a zone.
pub fn merge_interior<T: Phasor>(
    label: &str,
    graph: &Graph<T>,
    assembly: &mut Assembly<T>,
    placement: Placement,
) -> BlockResult<Splice> {
    if placement != Placement::Interior {
        return Err(BlockError::Placement {
            label: label.to_string(),
            what: "only substations may bound a zone".into(),
        });
    }
    Ok(assembly.graph.absorb(graph)?)
}

/// Solved current of a local edge.
pub fn current_of<T: Phasor>(graph: &Graph<T>, splice: &Splice, local: EdgeId) -> BlockResult<T> {
    let id = splice.edge(local)?;
    graph
        .edge(id)
        .map(|e| e.current)
        .ok_or(tp_graph::GraphError::MissingEdge { edge: id }.into())
}

/// Solved potential of a local node.
pub fn potential_of<T: Phasor>(graph: &Graph<T>, splice: &Splice, local: NodeId) -> BlockResult<T> {
    let id = splice.node(local)?;
    graph.node(id).map(|n| n.potential).ok_or_else(|| {
        tp_graph::GraphError::MissingNode {
            edge: String::new(),
            node: id,
        }
        .into()
    })
}

/// Overwrite the injected current of a local source edge.
pub fn set_injected<T: Phasor>(
    graph: &mut Graph<T>,
    splice: &Splice,
    local: EdgeId,
    value: T,
) -> BlockResult<()> {
    let id = splice.edge(local)?;
    let edge = graph
        .edge_mut(id)
        .ok_or(tp_graph::GraphError::MissingEdge { edge: id })?;
    edge.injected = value;
    Ok(())
}

/// Overwrite the EMF of a local edge.
pub fn set_emf<T: Phasor>(graph: &mut Graph<T>, splice: &Splice, local: EdgeId, value: T) -> BlockResult<()> {
    let id = splice.edge(local)?;
    let edge = graph
        .edge_mut(id)
        .ok_or(tp_graph::GraphError::MissingEdge { edge: id })?;
    edge.emf = value;
    Ok(())
}
