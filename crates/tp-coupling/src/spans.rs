//! Parallel conductor spans and the overlap sweep.

use std::collections::BTreeMap;

use tp_core::{BRANCH_STRIDE, EdgeId, Phasor, Real, Sentinels, TrackId};
use tp_graph::Coupling;

use crate::error::CouplingResult;
use crate::resistivity::NetworkResistanceRange;

/// Nodes closer than this (km) count as one position.
pub const COINCIDENT_KM: Real = 1e-9;

/// Tracks whose codes differ by less than this couple electromagnetically.
pub const LOCALITY_THRESHOLD: u32 = BRANCH_STRIDE;

/// A wired conductor edge and the coordinate interval it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConductorSpan {
    pub edge: EdgeId,
    pub track: TrackId,
    pub from: Real,
    pub to: Real,
}

impl ConductorSpan {
    /// Normalizes so that `from <= to`.
    pub fn new(edge: EdgeId, track: TrackId, a: Real, b: Real) -> Self {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        Self {
            edge,
            track,
            from,
            to,
        }
    }

    pub fn length(&self) -> Real {
        self.to - self.from
    }
}

/// Interval over which two conductor edges run side by side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InductivelyCoupledSpan {
    pub a: ConductorSpan,
    pub b: ConductorSpan,
    pub from: Real,
    pub to: Real,
}

impl InductivelyCoupledSpan {
    pub fn length(&self) -> Real {
        self.to - self.from
    }

    /// Contact-to-supply pairs carry opposite-sense currents.
    pub fn is_antiparallel(&self) -> bool {
        self.a.track.wire != self.b.track.wire
    }

    /// Mutual impedance integrated over the overlap, signed.
    pub fn impedance<T: Phasor>(&self, range: &NetworkResistanceRange<T>) -> CouplingResult<T> {
        let z = range.integrate(self.a.track, self.b.track, self.from, self.to)?;
        Ok(if self.is_antiparallel() { -z } else { z })
    }
}

/// Whether two distinct tracks are close enough to couple.
pub fn is_local(a: TrackId, b: TrackId) -> bool {
    a != b && a.code().abs_diff(b.code()) < LOCALITY_THRESHOLD
}

/// Every overlapping pair between two span lists.
///
/// Both lists must be sorted by `from` and internally non-overlapping, as
/// the spans of one track are. Runs in `O(len(a) + len(b))` plus output.
pub fn overlaps(a: &[ConductorSpan], b: &[ConductorSpan]) -> Vec<InductivelyCoupledSpan> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (sa, sb) = (a[i], b[j]);
        let lo = sa.from.max(sb.from);
        let hi = sa.to.min(sb.to);
        if hi > lo {
            out.push(InductivelyCoupledSpan {
                a: sa,
                b: sb,
                from: lo,
                to: hi,
            });
        }
        if sa.to <= sb.to {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Self impedance of a conductor span; zero-length spans get the short sentinel.
pub fn self_impedance<T: Phasor>(
    range: &NetworkResistanceRange<T>,
    span: &ConductorSpan,
    sentinels: &Sentinels,
) -> CouplingResult<T> {
    if span.length() <= COINCIDENT_KM {
        return Ok(T::ohms(sentinels.short));
    }
    range.integrate(span.track, span.track, span.from, span.to)
}

/// Mutual couplings between all local track pairs.
pub fn mutual_couplings<T: Phasor>(
    range: &NetworkResistanceRange<T>,
    spans: &[ConductorSpan],
) -> CouplingResult<Vec<Coupling<T>>> {
    let mut by_track: BTreeMap<TrackId, Vec<ConductorSpan>> = BTreeMap::new();
    for span in spans {
        by_track.entry(span.track).or_default().push(*span);
    }
    for list in by_track.values_mut() {
        list.sort_by(|x, y| x.from.total_cmp(&y.from).then(x.to.total_cmp(&y.to)));
    }

    let tracks: Vec<TrackId> = by_track.keys().copied().collect();
    let mut couplings = Vec::new();
    for (k, &ta) in tracks.iter().enumerate() {
        for &tb in &tracks[k + 1..] {
            if !is_local(ta, tb) {
                continue;
            }
            for overlap in overlaps(&by_track[&ta], &by_track[&tb]) {
                let value = overlap.impedance(range)?;
                couplings.push(Coupling {
                    a: overlap.a.edge,
                    b: overlap.b.edge,
                    value,
                });
            }
        }
    }
    tracing::trace!(pairs = couplings.len(), "mutual couplings");
    Ok(couplings)
}
