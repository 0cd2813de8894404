//! Schema migration framework.

use crate::TopologyError;
use crate::schema::Topology;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut topology: Topology) -> Result<Topology, TopologyError> {
    while topology.version < LATEST_VERSION {
        topology = migrate_one_version(topology)?;
    }
    Ok(topology)
}

fn migrate_one_version(topology: Topology) -> Result<Topology, TopologyError> {
    match topology.version {
        0 => migrate_v0_to_v1(topology),
        v => Err(TopologyError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 drafts are structurally identical to version 1.
fn migrate_v0_to_v1(mut topology: Topology) -> Result<Topology, TopologyError> {
    topology.version = 1;
    Ok(topology)
}
