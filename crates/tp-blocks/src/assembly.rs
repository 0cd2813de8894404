//! Zone-level merge target.

use std::collections::BTreeMap;

use tp_core::{NodeId, Phasor, Sentinels};
use tp_graph::{Graph, GraphResult, Renumbering};

use crate::traits::Side;

/// Busbars of a merged substation shoulder, in zone ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShoulderPort {
    pub bus: NodeId,
    pub supply_bus: Option<NodeId>,
}

/// Union graph of a zone under construction.
///
/// Besides the graph it records where every merged shoulder's busbars ended
/// up, so branch feeders can be spliced onto them.
#[derive(Debug, Clone)]
pub struct Assembly<T> {
    pub graph: Graph<T>,
    pub sentinels: Sentinels,
    ports: BTreeMap<(String, Side), ShoulderPort>,
}

impl<T: Phasor> Assembly<T> {
    pub fn new(sentinels: Sentinels) -> Self {
        let mut graph = Graph::new();
        graph.add_ground("rail");
        Self {
            graph,
            sentinels,
            ports: BTreeMap::new(),
        }
    }

    pub fn register_port(&mut self, substation: &str, side: Side, port: ShoulderPort) {
        self.ports.insert((substation.to_string(), side), port);
    }

    pub fn port(&self, substation: &str, side: Side) -> Option<ShoulderPort> {
        self.ports.get(&(substation.to_string(), side)).copied()
    }

    /// Follow a renumbering of the zone graph.
    pub fn remap_ports(&mut self, map: &Renumbering) -> GraphResult<()> {
        for port in self.ports.values_mut() {
            port.bus = map.node(port.bus).ok_or(tp_graph::GraphError::MissingNode {
                edge: String::from("<port>"),
                node: port.bus,
            })?;
            if let Some(sbus) = port.supply_bus {
                port.supply_bus = map.node(sbus);
            }
        }
        Ok(())
    }
}
