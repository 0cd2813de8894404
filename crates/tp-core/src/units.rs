// tp-core/src/units.rs

use uom::si::f64::{
    Angle as UomAngle, ElectricCurrent as UomElectricCurrent,
    ElectricPotential as UomElectricPotential,
};

// Public canonical unit types (SI, f64)
pub type Angle = UomAngle;
pub type Current = UomElectricCurrent;
pub type Voltage = UomElectricPotential;

#[inline]
pub fn amps(v: f64) -> Current {
    use uom::si::electric_current::ampere;
    Current::new::<ampere>(v)
}

#[inline]
pub fn volts(v: f64) -> Voltage {
    use uom::si::electric_potential::volt;
    Voltage::new::<volt>(v)
}

#[inline]
pub fn degrees(v: f64) -> Angle {
    use uom::si::angle::degree;
    Angle::new::<degree>(v)
}

#[inline]
pub fn radians(v: f64) -> Angle {
    use uom::si::angle::radian;
    Angle::new::<radian>(v)
}

/// Plain `f64` readouts in the units the engine works in.
pub mod raw {
    use super::*;

    #[inline]
    pub fn amps_of(i: Current) -> f64 {
        i.get::<uom::si::electric_current::ampere>()
    }

    #[inline]
    pub fn volts_of(u: Voltage) -> f64 {
        u.get::<uom::si::electric_potential::volt>()
    }

    #[inline]
    pub fn radians_of(a: Angle) -> f64 {
        a.get::<uom::si::angle::radian>()
    }
}

pub mod constants {
    use super::*;

    /// Phase displacement between the shoulders of a two-phase substation.
    pub const SHOULDER_SHIFT_DEG: f64 = 60.0;

    #[inline]
    pub fn shoulder_shift() -> Angle {
        degrees(SHOULDER_SHIFT_DEG)
    }
}
