//! Conductor identifiers.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{TpError, TpResult};

/// Code distance between consecutive branches.
///
/// Tracks whose codes differ by less than this are considered close enough
/// to couple electromagnetically.
pub const BRANCH_STRIDE: u32 = 100;

/// Role of a conductor in the overhead system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wire {
    /// Contact wire (catenary) the pantograph runs on.
    Contact,
    /// Supply (negative feeder) wire of a 2×25 kV system.
    Supply,
}

/// Physical conductor: branch index, track number and wire role.
///
/// Branch `0` is the main line. Written as `branch.track` followed by `c`
/// (contact) or `s` (supply), e.g. `0.1c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackId {
    pub branch: u16,
    pub track: u16,
    pub wire: Wire,
}

impl TrackId {
    pub const fn new(branch: u16, track: u16, wire: Wire) -> Self {
        Self {
            branch,
            track,
            wire,
        }
    }

    /// Contact wire of a main-line track.
    pub const fn main(track: u16) -> Self {
        Self::new(0, track, Wire::Contact)
    }

    /// Contact wire of a branch track.
    pub const fn contact(branch: u16, track: u16) -> Self {
        Self::new(branch, track, Wire::Contact)
    }

    /// Supply wire of a branch track.
    pub const fn supply(branch: u16, track: u16) -> Self {
        Self::new(branch, track, Wire::Supply)
    }

    /// The same track with another wire role.
    pub const fn with_wire(self, wire: Wire) -> Self {
        Self::new(self.branch, self.track, wire)
    }

    /// Dense numeric code used for locality decisions.
    pub fn code(self) -> u32 {
        let wire = match self.wire {
            Wire::Contact => 0,
            Wire::Supply => 1,
        };
        self.branch as u32 * BRANCH_STRIDE + self.track as u32 * 2 + wire
    }

    pub fn is_supply(self) -> bool {
        self.wire == Wire::Supply
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wire = match self.wire {
            Wire::Contact => 'c',
            Wire::Supply => 's',
        };
        write!(f, "{}.{}{}", self.branch, self.track, wire)
    }
}

impl FromStr for TrackId {
    type Err = TpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TpError::InvalidArg {
            what: "track id must look like `0.1c` or `2.1s`",
        };
        let s = s.trim();
        let (body, wire) = match s.chars().last() {
            Some('c') => (&s[..s.len() - 1], Wire::Contact),
            Some('s') => (&s[..s.len() - 1], Wire::Supply),
            Some(_) => (s, Wire::Contact),
            None => return Err(bad()),
        };
        let (branch, track) = body.split_once('.').ok_or_else(bad)?;
        let branch = branch.parse::<u16>().map_err(|_| bad())?;
        let track = track.parse::<u16>().map_err(|_| bad())?;
        if track as u32 * 2 + 1 >= BRANCH_STRIDE {
            return Err(TpError::InvalidArg {
                what: "track number exceeds the per-branch range",
            });
        }
        Ok(Self::new(branch, track, wire))
    }
}

impl TryFrom<String> for TrackId {
    type Error = TpError;

    fn try_from(value: String) -> TpResult<Self> {
        value.parse()
    }
}

impl From<TrackId> for String {
    fn from(value: TrackId) -> Self {
        value.to_string()
    }
}
