//! tp-topology: versioned topology file format, validation and conversion
//! into network descriptions.

pub mod convert;
pub mod migrate;
pub mod schema;
pub mod validate;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_topology};

use tp_core::SystemKind;

pub type TopologyResult<T> = Result<T, TopologyError>;

#[derive(thiserror::Error, Debug)]
pub enum TopologyError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Topology describes a {document:?} system, {requested:?} values requested")]
    SystemMismatch {
        document: SystemKind,
        requested: SystemKind,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn finish(topology: Topology) -> TopologyResult<Topology> {
    let topology = migrate_to_latest(topology)?;
    validate_topology(&topology)?;
    Ok(topology)
}

pub fn parse_yaml(content: &str) -> TopologyResult<Topology> {
    finish(serde_yaml::from_str(content)?)
}

pub fn parse_json(content: &str) -> TopologyResult<Topology> {
    finish(serde_json::from_str(content)?)
}

pub fn load_yaml(path: &std::path::Path) -> TopologyResult<Topology> {
    let content = std::fs::read_to_string(path)?;
    parse_yaml(&content)
}

pub fn save_yaml(path: &std::path::Path, topology: &Topology) -> TopologyResult<()> {
    validate_topology(topology)?;
    let content = serde_yaml::to_string(topology)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> TopologyResult<Topology> {
    let content = std::fs::read_to_string(path)?;
    parse_json(&content)
}

pub fn save_json(path: &std::path::Path, topology: &Topology) -> TopologyResult<()> {
    validate_topology(topology)?;
    let content = serde_json::to_string_pretty(topology)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a YAML or JSON file, chosen by extension (YAML unless `.json`).
pub fn load(path: &std::path::Path) -> TopologyResult<Topology> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        _ => load_yaml(path),
    }
}
