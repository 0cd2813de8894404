//! Outer-iteration settings.

use tp_core::raw::{amps_of, radians_of};
use tp_core::{Angle, Current, Real, amps, degrees};

use crate::error::{NetworkError, NetworkResult};

/// Convergence settings of the AC and DC outer loops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Cap on outer iterations per solve.
    pub max_iterations: usize,
    /// Loads are re-phased when their current strays further from the node
    /// voltage phase than this.
    pub phase_tolerance: Angle,
    /// Largest shoulder total change still counted as converged (AC).
    pub ac_current_tolerance: Current,
    /// Largest boundary current change still counted as converged (DC).
    pub dc_current_tolerance: Current,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            phase_tolerance: degrees(1.0),
            ac_current_tolerance: amps(1.0),
            dc_current_tolerance: amps(0.1),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> NetworkResult<()> {
        if self.max_iterations == 0 {
            return Err(NetworkError::InvalidArg {
                what: "max_iterations must be positive",
            });
        }
        let tolerances = [
            self.phase_tolerance_rad(),
            amps_of(self.ac_current_tolerance),
            amps_of(self.dc_current_tolerance),
        ];
        if tolerances.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(NetworkError::InvalidArg {
                what: "tolerances must be finite and non-negative",
            });
        }
        Ok(())
    }

    pub(crate) fn phase_tolerance_rad(&self) -> Real {
        radians_of(self.phase_tolerance)
    }
}
