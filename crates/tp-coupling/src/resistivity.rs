//! Per-section resistivity tables.
//!
//! A line is cut into consecutive sections, each ending at an upper
//! coordinate bound. Inside a section every unordered track pair has a
//! per-unit impedance (Ω/km): the diagonal `(t, t)` entries are the
//! conductor self impedances, the off-diagonal ones the mutual impedances.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tp_core::{Phasor, Real, TrackId};

use crate::error::{CouplingError, CouplingResult};

/// Slack allowed when checking coordinates against the table bounds (km).
pub const COVERAGE_EPS: Real = 1e-9;

/// Per-unit impedance of one track pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairResistivity<T> {
    pub a: TrackId,
    pub b: TrackId,
    /// Ω/km
    pub value: T,
}

/// One line section as supplied by the topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResistanceSection<T> {
    /// Upper coordinate bound of the section (km).
    pub until: Real,
    pub entries: Vec<PairResistivity<T>>,
}

impl<T> ResistanceSection<T> {
    pub fn new(until: Real) -> Self {
        Self {
            until,
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, a: TrackId, b: TrackId, value: T) -> Self {
        self.entries.push(PairResistivity { a, b, value });
        self
    }
}

/// Unordered key for a track pair.
pub fn pair_key(a: TrackId, b: TrackId) -> (TrackId, TrackId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, PartialEq)]
struct CompactSection<T> {
    until: Real,
    table: BTreeMap<(TrackId, TrackId), T>,
}

/// Immutable resistivity table covering `[start, end]` of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkResistanceRange<T> {
    start: Real,
    sections: Vec<CompactSection<T>>,
}

impl<T: Phasor> NetworkResistanceRange<T> {
    /// Build and compact a table.
    ///
    /// Sections must have strictly increasing bounds above `start`. A pair
    /// missing from a section inherits the value of the nearest following
    /// section that lists it.
    pub fn new(start: Real, sections: Vec<ResistanceSection<T>>) -> CouplingResult<Self> {
        if !start.is_finite() {
            return Err(CouplingError::BadSection {
                what: format!("start coordinate {start} is not finite"),
            });
        }
        if sections.is_empty() {
            return Err(CouplingError::BadSection {
                what: "no sections".into(),
            });
        }

        let mut lower = start;
        let mut compact = Vec::with_capacity(sections.len());
        for section in sections {
            if !section.until.is_finite() || section.until <= lower {
                return Err(CouplingError::BadSection {
                    what: format!(
                        "bound {} km does not follow {} km",
                        section.until, lower
                    ),
                });
            }
            let mut table = BTreeMap::new();
            for entry in section.entries {
                if !entry.value.is_finite_value() {
                    return Err(CouplingError::BadSection {
                        what: format!("non-finite value for ({}, {})", entry.a, entry.b),
                    });
                }
                table.insert(pair_key(entry.a, entry.b), entry.value);
            }
            lower = section.until;
            compact.push(CompactSection {
                until: section.until,
                table,
            });
        }

        // Back-fill from the end so each gap takes the nearest later value.
        let mut carried: BTreeMap<(TrackId, TrackId), T> = BTreeMap::new();
        for section in compact.iter_mut().rev() {
            for (key, value) in &carried {
                section.table.entry(*key).or_insert(*value);
            }
            carried.clone_from(&section.table);
        }

        Ok(Self {
            start,
            sections: compact,
        })
    }

    pub fn start(&self) -> Real {
        self.start
    }

    pub fn end(&self) -> Real {
        self.sections.last().map_or(self.start, |s| s.until)
    }

    /// Per-unit impedance of a pair at one coordinate.
    pub fn resistivity(&self, a: TrackId, b: TrackId, at: Real) -> CouplingResult<T> {
        self.check_covered(at, at)?;
        let section = self
            .sections
            .iter()
            .find(|s| at <= s.until + COVERAGE_EPS)
            .ok_or(CouplingError::Uncovered { from: at, to: at })?;
        section
            .table
            .get(&pair_key(a, b))
            .copied()
            .ok_or(CouplingError::UnresolvedPair { a, b, at })
    }

    /// Integral of the pair's per-unit impedance over `[from, to]`.
    ///
    /// Sums the partial contribution of every section the range crosses.
    pub fn integrate(&self, a: TrackId, b: TrackId, from: Real, to: Real) -> CouplingResult<T> {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        self.check_covered(lo, hi)?;
        let key = pair_key(a, b);

        let mut total = T::nil();
        let mut lower = self.start;
        for section in &self.sections {
            let seg_lo = lo.max(lower);
            let seg_hi = hi.min(section.until);
            if seg_hi > seg_lo {
                let r = section
                    .table
                    .get(&key)
                    .copied()
                    .ok_or(CouplingError::UnresolvedPair { a, b, at: seg_lo })?;
                total += r.scale(seg_hi - seg_lo);
            }
            lower = section.until;
            if lower >= hi {
                break;
            }
        }
        Ok(total)
    }

    fn check_covered(&self, lo: Real, hi: Real) -> CouplingResult<()> {
        if !(lo.is_finite() && hi.is_finite())
            || lo < self.start - COVERAGE_EPS
            || hi > self.end() + COVERAGE_EPS
        {
            return Err(CouplingError::Uncovered { from: lo, to: hi });
        }
        Ok(())
    }
}
