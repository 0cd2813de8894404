//! Per-block reporting records.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tp_core::{Phasor, Real, SystemKind, TrackId};

use crate::traits::BlockKind;

/// A named current or voltage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    pub re: Real,
    pub im: Real,
}

impl Reading {
    pub fn new<T: Phasor>(name: impl Into<String>, value: T) -> Self {
        let (re, im) = value.parts();
        Self {
            name: name.into(),
            re,
            im,
        }
    }

    pub fn magnitude(&self) -> Real {
        self.re.hypot(self.im)
    }

    /// Phase angle in degrees.
    pub fn angle_deg(&self) -> Real {
        self.im.atan2(self.re).to_degrees()
    }

    fn write_value(&self, f: &mut fmt::Formatter<'_>, system: SystemKind) -> fmt::Result {
        match system {
            SystemKind::Dc => write!(f, "{:.3}", self.re),
            SystemKind::Ac => write!(f, "{:.3} ∠ {:.2}°", self.magnitude(), self.angle_deg()),
        }
    }
}

/// Solution record of one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSolution {
    pub label: String,
    pub kind: BlockKind,
    pub system: SystemKind,
    /// km
    pub coordinate: Real,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackId>,
    pub currents: Vec<Reading>,
    pub voltages: Vec<Reading>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl BlockSolution {
    pub fn new<T: Phasor>(label: &str, kind: BlockKind, coordinate: Real) -> Self {
        Self {
            label: label.to_string(),
            kind,
            system: T::KIND,
            coordinate,
            description: kind.to_string(),
            track: None,
            currents: Vec::new(),
            voltages: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn on_track(mut self, track: TrackId) -> Self {
        self.track = Some(track);
        self
    }

    pub fn current<T: Phasor>(&mut self, name: impl Into<String>, value: T) {
        self.currents.push(Reading::new(name, value));
    }

    pub fn voltage<T: Phasor>(&mut self, name: impl Into<String>, value: T) {
        self.voltages.push(Reading::new(name, value));
    }

    pub fn attribute(&mut self, key: &str, value: impl ToString) {
        self.attributes.insert(key.to_string(), value.to_string());
    }

    /// Look up a current by name.
    pub fn current_named(&self, name: &str) -> Option<&Reading> {
        self.currents.iter().find(|r| r.name == name)
    }

    pub fn voltage_named(&self, name: &str) -> Option<&Reading> {
        self.voltages.iter().find(|r| r.name == name)
    }
}

impl fmt::Display for BlockSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:.3} km: {}", self.label, self.coordinate, self.description)?;
        if let Some(track) = self.track {
            write!(f, " (track {track})")?;
        }
        writeln!(f)?;
        for (key, value) in &self.attributes {
            writeln!(f, "    {key} = {value}")?;
        }
        for r in &self.voltages {
            write!(f, "    U {:<24} ", r.name)?;
            r.write_value(f, self.system)?;
            writeln!(f, " V")?;
        }
        for r in &self.currents {
            write!(f, "    I {:<24} ", r.name)?;
            r.write_value(f, self.system)?;
            writeln!(f, " A")?;
        }
        Ok(())
    }
}

/// Flat numeric summary of one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum CompactEntry {
    /// `[km, left re, left im, right re, right im, left bus re, left bus im, right bus re, right bus im]`
    Substation(Vec<Real>),
    /// `[km, track code, current re, current im, voltage re, voltage im]`
    Load(Vec<Real>),
    /// `[km, contact winding re, im, supply winding re, im, rail re, im]`
    Autotransformer(Vec<Real>),
}

/// Compact summary of a whole network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompactSummary {
    pub substations: Vec<Vec<Real>>,
    pub loads: Vec<Vec<Real>>,
    pub autotransformers: Vec<Vec<Real>>,
}

impl CompactSummary {
    pub fn push(&mut self, entry: CompactEntry) {
        match entry {
            CompactEntry::Substation(v) => self.substations.push(v),
            CompactEntry::Load(v) => self.loads.push(v),
            CompactEntry::Autotransformer(v) => self.autotransformers.push(v),
        }
    }
}
