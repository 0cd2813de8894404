//! Electrical quantities shared by AC and DC systems.
//!
//! DC networks solve over `f64`, AC networks over [`Complex64`]. Everything
//! above this crate is generic over [`Phasor`], so the assembly and mesh
//! solver are written once.

use nalgebra::ComplexField;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use num_complex::Complex64;

use crate::numeric::Real;

/// Which traction system a value type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemKind {
    Ac,
    Dc,
}

/// Scalar type of a traction network: voltages, currents and impedances.
pub trait Phasor:
    ComplexField<RealField = Real> + Copy + Default + Serialize + DeserializeOwned
{
    /// The system this scalar models.
    const KIND: SystemKind;

    /// Build a value from rectangular parts. Real-valued systems drop `im`.
    fn from_parts(re: Real, im: Real) -> Self;

    /// Build a value from magnitude and angle (radians).
    ///
    /// Real-valued systems have no phase, so the angle is ignored.
    fn from_polar(magnitude: Real, angle: Real) -> Self;

    /// Rotate by `angle` radians. Identity for real-valued systems.
    fn rotated(self, angle: Real) -> Self;

    /// Rectangular parts `(re, im)`.
    fn parts(self) -> (Real, Real);

    /// Phase angle in radians.
    fn phase(self) -> Real {
        self.argument()
    }

    /// Additive identity.
    fn nil() -> Self {
        Self::from_parts(0.0, 0.0)
    }

    /// A purely resistive value.
    fn ohms(value: Real) -> Self {
        Self::from_parts(value, 0.0)
    }

    /// Whether both parts are finite.
    fn is_finite_value(self) -> bool {
        let (re, im) = self.parts();
        re.is_finite() && im.is_finite()
    }
}

impl Phasor for Real {
    const KIND: SystemKind = SystemKind::Dc;

    fn from_parts(re: Real, _im: Real) -> Self {
        re
    }

    fn from_polar(magnitude: Real, _angle: Real) -> Self {
        magnitude
    }

    fn rotated(self, _angle: Real) -> Self {
        self
    }

    fn parts(self) -> (Real, Real) {
        (self, 0.0)
    }
}

impl Phasor for Complex64 {
    const KIND: SystemKind = SystemKind::Ac;

    fn from_parts(re: Real, im: Real) -> Self {
        Complex64::new(re, im)
    }

    fn from_polar(magnitude: Real, angle: Real) -> Self {
        Complex64::from_polar(magnitude, angle)
    }

    fn rotated(self, angle: Real) -> Self {
        self * Complex64::from_polar(1.0, angle)
    }

    fn parts(self) -> (Real, Real) {
        (self.re, self.im)
    }
}

/// Smallest signed difference `a - b` between two angles, in `(-π, π]`.
pub fn angle_delta(a: Real, b: Real) -> Real {
    let mut d = (a - b) % std::f64::consts::TAU;
    if d > std::f64::consts::PI {
        d -= std::f64::consts::TAU;
    } else if d <= -std::f64::consts::PI {
        d += std::f64::consts::TAU;
    }
    d
}
