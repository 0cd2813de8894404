//! Topology schema definitions.

use serde::{Deserialize, Serialize};
use tp_blocks::Side;
use tp_core::{SystemKind, TrackId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topology {
    pub version: u32,
    pub name: String,
    pub system: SystemKind,
    pub line: LineDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentinels: Option<SentinelsDef>,
    pub sections: Vec<SectionDef>,
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LineDef {
    pub start_km: f64,
    pub end_km: f64,
}

/// Overrides of the outer-iteration settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SolverDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_tolerance_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ac_current_tolerance_a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dc_current_tolerance_a: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SentinelsDef {
    pub disconnected_ohm: f64,
    pub short_ohm: f64,
}

/// A real number, or `[re, im]`.
///
/// DC topologies may write plain numbers; AC topologies write pairs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PhasorDef {
    Real(f64),
    Parts([f64; 2]),
}

impl Default for PhasorDef {
    fn default() -> Self {
        PhasorDef::Real(0.0)
    }
}

impl PhasorDef {
    pub fn parts(self) -> (f64, f64) {
        match self {
            PhasorDef::Real(re) => (re, 0.0),
            PhasorDef::Parts([re, im]) => (re, im),
        }
    }

    pub fn is_finite(self) -> bool {
        let (re, im) = self.parts();
        re.is_finite() && im.is_finite()
    }

    pub fn is_real(self) -> bool {
        self.parts().1 == 0.0
    }
}

/// Resistivity table of one line section, up to `until_km`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionDef {
    pub until_km: f64,
    #[serde(default)]
    pub resistivity: Vec<ResistivityDef>,
}

/// Per-kilometre self (`a == b`) or mutual impedance of a track pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResistivityDef {
    pub a: TrackId,
    pub b: TrackId,
    pub value: PhasorDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockDef {
    /// Generated from the block kind when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub kind: BlockKindDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKindDef {
    Substation {
        coordinate_km: f64,
        tracks: Vec<u16>,
        emf: PhasorDef,
        internal: PhasorDef,
        #[serde(default)]
        feeder: PhasorDef,
        #[serde(default)]
        kind: SubstationKindDef,
        #[serde(default)]
        two_by_25: bool,
        /// Phase-leading shoulder of a duplex substation.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        leading: Option<Side>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        booster: Option<BoosterDef>,
    },
    SectioningPost {
        coordinate_km: f64,
        #[serde(default)]
        branch: u16,
        tracks: Vec<u16>,
        #[serde(default)]
        feeder: PhasorDef,
        #[serde(default)]
        two_by_25: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        autotransformer: Option<WindingsDef>,
    },
    Load {
        coordinate_km: f64,
        track: TrackId,
        current: PhasorDef,
        #[serde(default)]
        phase_offset_deg: f64,
    },
    Jumper {
        coordinate_km: f64,
        links: Vec<LinkDef>,
        #[serde(default)]
        impedance: PhasorDef,
    },
    Branch {
        index: u16,
        splitter: SplitterDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feed: Option<FeedDef>,
        #[serde(default)]
        blocks: Vec<BlockDef>,
    },
    Autotransformer {
        coordinate_km: f64,
        #[serde(default)]
        branch: u16,
        track: u16,
        windings: WindingsDef,
    },
    ShortCircuit {
        coordinate_km: f64,
        track: TrackId,
        resistance: PhasorDef,
        #[serde(default = "default_active")]
        active: bool,
    },
}

fn default_active() -> bool {
    true
}

fn default_closed() -> bool {
    true
}

impl BlockKindDef {
    /// Main-line (or branch-axis) coordinate of the block.
    pub fn coordinate(&self) -> f64 {
        match self {
            BlockKindDef::Substation { coordinate_km, .. }
            | BlockKindDef::SectioningPost { coordinate_km, .. }
            | BlockKindDef::Load { coordinate_km, .. }
            | BlockKindDef::Jumper { coordinate_km, .. }
            | BlockKindDef::Autotransformer { coordinate_km, .. }
            | BlockKindDef::ShortCircuit { coordinate_km, .. } => *coordinate_km,
            BlockKindDef::Branch { splitter, .. } => splitter.coordinate_km,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            BlockKindDef::Substation { .. } => "substation",
            BlockKindDef::SectioningPost { .. } => "sectioning_post",
            BlockKindDef::Load { .. } => "load",
            BlockKindDef::Jumper { .. } => "jumper",
            BlockKindDef::Branch { .. } => "branch",
            BlockKindDef::Autotransformer { .. } => "autotransformer",
            BlockKindDef::ShortCircuit { .. } => "short_circuit",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubstationKindDef {
    #[default]
    Simple,
    Duplex,
}

/// Boosted operating point of a DC substation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoosterDef {
    pub emf: PhasorDef,
    pub internal: PhasorDef,
    pub min_voltage_v: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WindingsDef {
    pub magnetizing: PhasorDef,
    pub leakage: PhasorDef,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LinkDef {
    pub a: TrackId,
    pub b: TrackId,
    #[serde(default = "default_closed")]
    pub closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitterDef {
    /// Attachment point on the main line.
    pub coordinate_km: f64,
    /// Origin of the branch on its own axis.
    #[serde(default)]
    pub branch_coordinate_km: f64,
    pub links: Vec<LinkDef>,
    #[serde(default)]
    pub impedance: PhasorDef,
}

/// Feeding of a branch from a main-line substation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedDef {
    pub substation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    pub coordinate_km: f64,
    pub tracks: Vec<u16>,
    #[serde(default)]
    pub feeder: PhasorDef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phasors_accept_numbers_and_pairs() {
        let real: PhasorDef = serde_yaml::from_str("3600.0").unwrap();
        assert_eq!(real.parts(), (3600.0, 0.0));
        let pair: PhasorDef = serde_yaml::from_str("[0.15, 0.45]").unwrap();
        assert_eq!(pair.parts(), (0.15, 0.45));
        assert!(!pair.is_real());
    }

    #[test]
    fn blocks_are_tagged_by_type() {
        let yaml = r#"
label: SS-North
type: substation
coordinate_km: 0.0
tracks: [1, 2]
emf: 3600.0
internal: 0.05
"#;
        let block: BlockDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(block.label.as_deref(), Some("SS-North"));
        match block.kind {
            BlockKindDef::Substation {
                tracks, kind, two_by_25, ..
            } => {
                assert_eq!(tracks, vec![1, 2]);
                assert_eq!(kind, SubstationKindDef::Simple);
                assert!(!two_by_25);
            }
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[test]
    fn links_default_to_closed() {
        let link: LinkDef = serde_yaml::from_str("{ a: 0.1c, b: 1.1c }").unwrap();
        assert!(link.closed);
        assert_eq!(link.b, TrackId::contact(1, 1));
    }
}
