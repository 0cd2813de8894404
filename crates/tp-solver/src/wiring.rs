//! Longitudinal conductor wiring of a merged zone.
//!
//! Blocks only place nodes on tracks. Wiring joins consecutive nodes of each
//! track with conductor edges, gives every edge its integrated self
//! impedance and couples parallel edges of neighbouring tracks.

use std::collections::BTreeMap;

use tp_core::{EdgeId, NodeId, Phasor, Real, Sentinels, TrackId};
use tp_coupling::{
    COINCIDENT_KM, ConductorSpan, NetworkResistanceRange, mutual_couplings, self_impedance,
};
use tp_graph::{EdgePayload, Graph};

use crate::error::SolverResult;

/// Nodes of each track in longitudinal order.
pub fn track_order<T: Phasor>(graph: &Graph<T>) -> BTreeMap<TrackId, Vec<NodeId>> {
    let mut by_track: BTreeMap<TrackId, Vec<(Real, NodeId)>> = BTreeMap::new();
    for node in graph.nodes() {
        if let Some(track) = node.track {
            by_track.entry(track).or_default().push((node.coordinate, node.id));
        }
    }
    by_track
        .into_iter()
        .map(|(track, mut nodes)| {
            nodes.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            (track, nodes.into_iter().map(|(_, id)| id).collect())
        })
        .collect()
}

/// Whether two neighbouring nodes stand on either side of an air gap.
fn is_gap<T: Phasor>(graph: &Graph<T>, a: NodeId, b: NodeId) -> bool {
    match (graph.node(a), graph.node(b)) {
        (Some(a), Some(b)) => {
            a.breaking && b.breaking && (a.coordinate - b.coordinate).abs() <= COINCIDENT_KM
        }
        _ => false,
    }
}

/// Add conductor edges and their mutual couplings.
///
/// Returns the ids of the added conductor edges.
pub fn connect<T: Phasor>(
    graph: &mut Graph<T>,
    range: &NetworkResistanceRange<T>,
    sentinels: &Sentinels,
) -> SolverResult<Vec<EdgeId>> {
    let mut spans = Vec::new();
    for (track, nodes) in track_order(graph) {
        for pair in nodes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if is_gap(graph, a, b) {
                continue;
            }
            let (xa, xb) = match (graph.node(a), graph.node(b)) {
                (Some(na), Some(nb)) => (na.coordinate, nb.coordinate),
                _ => continue,
            };
            let probe = ConductorSpan::new(EdgeId::from_index(0), track, xa, xb);
            let z = self_impedance(range, &probe, sentinels)?;
            let edge = graph.add_edge(
                a,
                b,
                EdgePayload::new(format!("{track} {xa:.3}-{xb:.3}"), z),
            )?;
            spans.push(ConductorSpan { edge, ..probe });
        }
    }

    let couplings = mutual_couplings(range, &spans)?;
    for c in &couplings {
        graph.add_coupling(c.a, c.b, c.value)?;
    }
    tracing::debug!(
        conductors = spans.len(),
        couplings = couplings.len(),
        "zone wired"
    );
    Ok(spans.into_iter().map(|s| s.edge).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_coupling::ResistanceSection;

    fn table() -> NetworkResistanceRange<f64> {
        let (t1, t2) = (TrackId::main(1), TrackId::main(2));
        NetworkResistanceRange::new(
            0.0,
            vec![ResistanceSection::new(20.0)
                .with(t1, t1, 0.01)
                .with(t2, t2, 0.01)
                .with(t1, t2, 0.002)],
        )
        .unwrap()
    }

    #[test]
    fn gap_pairs_stay_open() {
        let mut g: Graph<f64> = Graph::new();
        g.add_ground("rail");
        let t1 = TrackId::main(1);
        g.add_node(0.0, Some(t1), "a", false);
        g.add_node(5.0, Some(t1), "gap left", true);
        g.add_node(5.0, Some(t1), "gap right", true);
        g.add_node(9.0, Some(t1), "b", false);
        let wired = connect(&mut g, &table(), &Sentinels::default()).unwrap();
        assert_eq!(wired.len(), 2);
        let first = g.edge(wired[0]).unwrap();
        assert!((first.impedance - 0.05).abs() < 1e-12);
    }

    #[test]
    fn coincident_plain_nodes_are_shorted() {
        let mut g: Graph<f64> = Graph::new();
        let t1 = TrackId::main(1);
        g.add_node(3.0, Some(t1), "jumper", false);
        g.add_node(3.0, Some(t1), "load", false);
        let wired = connect(&mut g, &table(), &Sentinels::default()).unwrap();
        assert_eq!(wired.len(), 1);
        assert_eq!(g.edge(wired[0]).unwrap().impedance, Sentinels::default().short);
    }

    #[test]
    fn parallel_tracks_are_coupled() {
        let mut g: Graph<f64> = Graph::new();
        for t in [TrackId::main(1), TrackId::main(2)] {
            g.add_node(0.0, Some(t), "w", false);
            g.add_node(10.0, Some(t), "e", false);
        }
        connect(&mut g, &table(), &Sentinels::default()).unwrap();
        assert_eq!(g.couplings().len(), 1);
        assert!((g.couplings()[0].value - 0.02).abs() < 1e-12);
    }

    #[test]
    fn order_breaks_ties_by_id() {
        let mut g: Graph<f64> = Graph::new();
        let t1 = TrackId::main(1);
        let late = g.add_node(4.0, Some(t1), "x", false);
        let early = g.add_node(2.0, Some(t1), "y", false);
        let twin = g.add_node(4.0, Some(t1), "z", false);
        assert_eq!(track_order(&g)[&t1], vec![early, late, twin]);
    }
}
