use crate::{Phasor, TpError, TpResult};

/// Floating point type used throughout system
pub type Real = f64;

/// Pass a finite value through, or name what went wrong.
pub fn ensure_finite(v: Real, what: &'static str) -> TpResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TpError::NonFinite { what, value: v })
    }
}

/// Impedance magnitude (Ω) standing in for an open switch or an absent branch.
///
/// Kept finite so the mesh matrix stays factorizable.
pub const DISCONNECTED_OHMS: Real = 1e9;

/// Impedance magnitude (Ω) standing in for a closed switch or a bolted joint.
///
/// Kept non-zero so no mesh row degenerates.
pub const SHORT_OHMS: Real = 1e-6;

/// Numerical stand-ins for ideal switch states.
///
/// Raising `disconnected` or lowering `short` moves the model closer to ideal
/// switches at the cost of conditioning of the mesh matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Sentinels {
    pub disconnected: Real,
    pub short: Real,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            disconnected: DISCONNECTED_OHMS,
            short: SHORT_OHMS,
        }
    }
}

impl Sentinels {
    /// Whether an impedance magnitude denotes an open branch.
    ///
    /// Anything within a decade of the sentinel counts, so sums of sentinel
    /// impedances along a path still classify as open.
    pub fn is_disconnected(&self, magnitude: Real) -> bool {
        magnitude >= self.disconnected * 0.1
    }

    /// Replace a (near) zero impedance with the short sentinel.
    pub fn clamp_short<T: Phasor>(&self, z: T) -> T {
        if z.modulus() < self.short {
            T::ohms(self.short)
        } else {
            z
        }
    }

    /// Impedance of a switch: short when closed, disconnected when open.
    pub fn switch<T: Phasor>(&self, closed: bool) -> T {
        if closed {
            T::ohms(self.short)
        } else {
            T::ohms(self.disconnected)
        }
    }
}
