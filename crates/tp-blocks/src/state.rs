//! Serializable block state records.
//!
//! Records capture the externally controlled state of a block (switch
//! positions and resistance overrides). Applying a block's own record to a
//! freshly built identical block reproduces its configuration.

use serde::{Deserialize, Serialize};
use tp_core::{Phasor, Real};

use crate::traits::BlockKind;

/// A phasor as `[re, im]`. DC values keep `im = 0`.
pub type PhasorRecord = [Real; 2];

pub fn to_record<T: Phasor>(value: T) -> PhasorRecord {
    let (re, im) = value.parts();
    [re, im]
}

pub fn from_record<T: Phasor>(record: PhasorRecord) -> T {
    T::from_parts(record[0], record[1])
}

/// Feeder switch positions of one side, `true` meaning closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeederState {
    pub contact: Vec<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supply: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateRecord {
    Substation {
        left: FeederState,
        right: FeederState,
    },
    SectioningPost {
        left: FeederState,
        right: FeederState,
        median: bool,
    },
    Load {
        current: PhasorRecord,
        /// Power-factor angle (rad) the current lags the voltage by.
        phase_offset: Real,
    },
    Jumper {
        links: Vec<bool>,
    },
    Splitter {
        links: Vec<bool>,
    },
    Branch {
        splitter: Vec<bool>,
        feeders: Vec<bool>,
    },
    Autotransformer {
        magnetizing: PhasorRecord,
        leakage: PhasorRecord,
    },
    ShortCircuit {
        active: bool,
        resistance: PhasorRecord,
    },
}

impl StateRecord {
    pub fn kind(&self) -> BlockKind {
        match self {
            StateRecord::Substation { .. } => BlockKind::Substation,
            StateRecord::SectioningPost { .. } => BlockKind::SectioningPost,
            StateRecord::Load { .. } => BlockKind::Load,
            StateRecord::Jumper { .. } => BlockKind::Jumper,
            StateRecord::Splitter { .. } => BlockKind::Splitter,
            StateRecord::Branch { .. } => BlockKind::Branch,
            StateRecord::Autotransformer { .. } => BlockKind::Autotransformer,
            StateRecord::ShortCircuit { .. } => BlockKind::ShortCircuit,
        }
    }
}
