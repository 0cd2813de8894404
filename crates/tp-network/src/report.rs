//! Outcome of one network solve.

use core::fmt;

use serde::{Deserialize, Serialize};
use tp_core::{Real, SystemKind};

/// Whether a zone's outer iteration settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Convergence {
    Converged,
    NotConverged { reason: String },
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneReport {
    /// `SSa..SSb`
    pub name: String,
    pub convergence: Convergence,
    /// Largest boundary current change of the last iteration (A).
    pub max_delta: Real,
    /// Loads re-phased in the last iteration.
    pub rephased: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub system: SystemKind,
    /// Outer iterations run, the initial solve not counted.
    pub iterations: usize,
    pub zones: Vec<ZoneReport>,
    /// Substations switched to their boosted operating point.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boosted: Vec<String>,
}

impl SolveReport {
    pub fn converged(&self) -> bool {
        self.zones.iter().all(|z| z.convergence.is_converged())
    }
}

impl fmt::Display for SolveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let system = match self.system {
            SystemKind::Ac => "AC",
            SystemKind::Dc => "DC",
        };
        writeln!(
            f,
            "{system} network: {} zone(s), {} outer iteration(s)",
            self.zones.len(),
            self.iterations
        )?;
        for zone in &self.zones {
            write!(f, "  {:<16} ", zone.name)?;
            match &zone.convergence {
                Convergence::Converged => write!(f, "converged")?,
                Convergence::NotConverged { reason } => write!(f, "NOT converged ({reason})")?,
            }
            writeln!(f, ", max delta {:.4} A", zone.max_delta)?;
        }
        if !self.boosted.is_empty() {
            writeln!(f, "  boosted: {}", self.boosted.join(", "))?;
        }
        Ok(())
    }
}
