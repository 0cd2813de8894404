//! Feeding substations and their shoulders.
//!
//! A substation feeds the line on both sides of its axis. Each side is a
//! [`Shoulder`]: a busbar with the source EMF, a through-current source and one
//! feeder per track. A zone only ever contains the shoulder that faces it, so
//! the two shoulders of one substation live in neighbouring zones and are tied
//! together by the amperage exchange.

use tp_core::{
    EdgeId, NodeId, Phasor, Real, Sentinels, SystemKind, TrackId, Voltage,
    constants::shoulder_shift,
    raw::{radians_of, volts_of},
};
use tp_graph::{EdgePayload, Graph, Splice};

use crate::assembly::{Assembly, ShoulderPort};
use crate::common::{
    check_finite, check_len, current_of, feeder_impedance, potential_of,
    set_emf, set_injected,
};
use crate::error::{BlockError, BlockResult};
use crate::factory::BuildContext;
use crate::solution::{BlockSolution, CompactEntry};
use crate::state::{FeederState, StateRecord};
use crate::traits::{BlockKind, Placement, Side, TopologyBlock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstationKind {
    /// One single-phase transformer feeds both shoulders in phase.
    Simple,
    /// Two shoulders fed 60° apart from one three-phase bank.
    Duplex,
}

/// Boosted operating point of a DC substation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Booster<T> {
    pub emf: T,
    pub internal: T,
    /// Lowest acceptable busbar voltage before the booster engages.
    pub min_voltage: Voltage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubstationParams<T> {
    pub coordinate: Real,
    pub kind: SubstationKind,
    /// Main-line tracks fed on each side.
    pub tracks: Vec<u16>,
    /// Source EMF of the leading shoulder.
    pub emf: T,
    /// Internal impedance; zero is replaced by the short sentinel.
    pub internal: T,
    /// Series impedance of a closed feeder.
    pub feeder: T,
    /// Adds supply-wire busbars and feeders.
    pub two_by_25: bool,
    /// Phase-leading shoulder of a duplex substation.
    pub leading: Side,
    pub booster: Option<Booster<T>>,
}

impl<T: Phasor> SubstationParams<T> {
    pub fn simple(coordinate: Real, tracks: Vec<u16>, emf: T, internal: T) -> Self {
        Self {
            coordinate,
            kind: SubstationKind::Simple,
            tracks,
            emf,
            internal,
            feeder: T::nil(),
            two_by_25: false,
            leading: Side::Left,
            booster: None,
        }
    }

    pub fn duplex(coordinate: Real, tracks: Vec<u16>, emf: T, internal: T) -> Self {
        Self {
            kind: SubstationKind::Duplex,
            ..Self::simple(coordinate, tracks, emf, internal)
        }
    }

    pub fn with_two_by_25(mut self) -> Self {
        self.two_by_25 = true;
        self
    }

    pub fn with_booster(mut self, booster: Booster<T>) -> Self {
        self.booster = Some(booster);
        self
    }
}

/// Solved quantities of one shoulder.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoulderReadings<T> {
    pub bus: T,
    pub supply_bus: Option<T>,
    /// Current delivered by the source EMF.
    pub source: T,
    /// Current drawn by the through-current source.
    pub through: T,
    pub supply_through: T,
    pub feeders: Vec<T>,
    pub supply_feeders: Vec<T>,
    /// Contact current leaving the bus: own feeders plus any branch feeders
    /// spliced onto it.
    pub total: T,
    /// Supply current leaving the supply bus, branch feeders included.
    pub supply_total: T,
}

/// Operating point handed to a shoulder build.
struct Source<T> {
    emf: T,
    internal: T,
}

/// One side of a substation, buildable on its own.
#[derive(Debug, Clone)]
pub struct Shoulder<T> {
    side: Side,
    graph: Graph<T>,
    bus: NodeId,
    supply_bus: Option<NodeId>,
    emf_edge: EdgeId,
    supply_emf_edge: Option<EdgeId>,
    through_edge: EdgeId,
    supply_through_edge: Option<EdgeId>,
    feeders: Vec<EdgeId>,
    supply_feeders: Vec<EdgeId>,
    state: FeederState,
    emf: T,
    through: T,
    supply_through: T,
    readings: Option<ShoulderReadings<T>>,
}

impl<T: Phasor> Shoulder<T> {
    fn build(
        label: &str,
        side: Side,
        params: &SubstationParams<T>,
        source: Source<T>,
        state: FeederState,
        through: (T, T),
        sentinels: &Sentinels,
    ) -> BlockResult<Self> {
        let name = format!("{label}:{side}");
        let x = params.coordinate;
        let mut graph = Graph::new();
        let ground = graph.add_ground("rail");
        let bus = graph.add_node(x, None, format!("{name}:bus"), false);
        let z_int = sentinels.clamp_short(source.internal);
        let emf_edge = graph.add_edge(
            ground,
            bus,
            EdgePayload::new(format!("{name}:source"), z_int).with_emf(source.emf),
        )?;
        let through_edge = graph.add_edge(
            ground,
            bus,
            EdgePayload::new(format!("{name}:through"), T::ohms(sentinels.disconnected))
                .with_injected(through.0),
        )?;

        let mut feeders = Vec::with_capacity(params.tracks.len());
        for (&track, &closed) in params.tracks.iter().zip(&state.contact) {
            let t = TrackId::main(track);
            let node = graph.add_node(x, Some(t), format!("{name}:{t}"), true);
            feeders.push(graph.add_edge(
                bus,
                node,
                EdgePayload::new(
                    format!("{name}:feeder {t}"),
                    feeder_impedance(closed, params.feeder, sentinels),
                ),
            )?);
        }

        let (mut supply_bus, mut supply_emf_edge, mut supply_through_edge) = (None, None, None);
        let mut supply_feeders = Vec::new();
        if params.two_by_25 {
            let sbus = graph.add_node(x, None, format!("{name}:supply bus"), false);
            // Source in antiphase: the supply bus sits at -E.
            supply_emf_edge = Some(graph.add_edge(
                sbus,
                ground,
                EdgePayload::new(format!("{name}:supply source"), z_int).with_emf(source.emf),
            )?);
            supply_through_edge = Some(graph.add_edge(
                ground,
                sbus,
                EdgePayload::new(format!("{name}:supply through"), T::ohms(sentinels.disconnected))
                    .with_injected(through.1),
            )?);
            for (&track, &closed) in params.tracks.iter().zip(&state.supply) {
                let t = TrackId::supply(0, track);
                let node = graph.add_node(x, Some(t), format!("{name}:{t}"), true);
                supply_feeders.push(graph.add_edge(
                    sbus,
                    node,
                    EdgePayload::new(
                        format!("{name}:feeder {t}"),
                        feeder_impedance(closed, params.feeder, sentinels),
                    ),
                )?);
            }
            supply_bus = Some(sbus);
        }

        Ok(Self {
            side,
            graph,
            bus,
            supply_bus,
            emf_edge,
            supply_emf_edge,
            through_edge,
            supply_through_edge,
            feeders,
            supply_feeders,
            state,
            emf: source.emf,
            through: through.0,
            supply_through: through.1,
            readings: None,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn graph(&self) -> &Graph<T> {
        &self.graph
    }

    pub fn emf(&self) -> T {
        self.emf
    }

    /// Prescribed through current (contact, supply).
    pub fn through(&self) -> (T, T) {
        (self.through, self.supply_through)
    }

    pub fn readings(&self) -> Option<&ShoulderReadings<T>> {
        self.readings.as_ref()
    }

    /// Feeder totals (contact, supply) from the last collected solve.
    pub fn totals(&self) -> (T, T) {
        self.readings
            .as_ref()
            .map_or((T::nil(), T::nil()), |r| (r.total, r.supply_total))
    }

    fn set_through(&mut self, contact: T, supply: T) {
        self.through = contact;
        self.supply_through = supply;
        if let Some(e) = self.graph.edge_mut(self.through_edge) {
            e.injected = contact;
        }
        if let Some(e) = self.supply_through_edge.and_then(|id| self.graph.edge_mut(id)) {
            e.injected = supply;
        }
    }

    fn merge(&self, label: &str, assembly: &mut Assembly<T>) -> BlockResult<Splice> {
        let splice = assembly.graph.absorb(&self.graph)?;
        let port = ShoulderPort {
            bus: splice.node(self.bus)?,
            supply_bus: self.supply_bus.map(|b| splice.node(b)).transpose()?,
        };
        assembly.register_port(label, self.side, port);
        Ok(splice)
    }

    fn refresh(&self, splice: &Splice, graph: &mut Graph<T>) -> BlockResult<()> {
        set_emf(graph, splice, self.emf_edge, self.emf)?;
        set_injected(graph, splice, self.through_edge, self.through)?;
        if let Some(e) = self.supply_emf_edge {
            set_emf(graph, splice, e, self.emf)?;
        }
        if let Some(e) = self.supply_through_edge {
            set_injected(graph, splice, e, self.supply_through)?;
        }
        Ok(())
    }

    fn collect(&mut self, splice: &Splice, graph: &Graph<T>) -> BlockResult<()> {
        let feeders = self
            .feeders
            .iter()
            .map(|e| current_of(graph, splice, *e))
            .collect::<BlockResult<Vec<_>>>()?;
        let supply_feeders = self
            .supply_feeders
            .iter()
            .map(|e| current_of(graph, splice, *e))
            .collect::<BlockResult<Vec<_>>>()?;
        let source = current_of(graph, splice, self.emf_edge)?;
        let through = -current_of(graph, splice, self.through_edge)?;
        // Branch feeders spliced onto a bus are not ours to list, so the totals
        // come from the bus balance: whatever the sources put in leaves through
        // some feeder.
        let total = source - through;
        let (supply_through, supply_total) =
            match (self.supply_emf_edge, self.supply_through_edge) {
                (Some(src), Some(thr)) => {
                    let supply_through = -current_of(graph, splice, thr)?;
                    let supply_source = current_of(graph, splice, src)?;
                    // The supply source is oriented bus → ground.
                    (supply_through, -supply_through - supply_source)
                }
                _ => (T::nil(), T::nil()),
            };
        self.readings = Some(ShoulderReadings {
            bus: potential_of(graph, splice, self.bus)?,
            supply_bus: self.supply_bus.map(|b| potential_of(graph, splice, b)).transpose()?,
            source,
            through,
            supply_through,
            feeders,
            supply_feeders,
            total,
            supply_total,
        });
        Ok(())
    }
}

/// Feeding substation with a left and a right shoulder.
#[derive(Debug, Clone)]
pub struct Substation<T> {
    label: String,
    params: SubstationParams<T>,
    sentinels: Sentinels,
    boosted: bool,
    left: Shoulder<T>,
    right: Shoulder<T>,
}

impl<T: Phasor> Substation<T> {
    pub fn params(&self) -> &SubstationParams<T> {
        &self.params
    }

    pub fn shoulder(&self, side: Side) -> &Shoulder<T> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn shoulder_mut(&mut self, side: Side) -> &mut Shoulder<T> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn is_boosted(&self) -> bool {
        self.boosted
    }

    fn source(&self, side: Side) -> Source<T> {
        source_for(&self.params, self.boosted, side)
    }

    fn rebuild(&mut self, left: FeederState, right: FeederState) -> BlockResult<()> {
        let new_left = Shoulder::build(
            &self.label,
            Side::Left,
            &self.params,
            self.source(Side::Left),
            left,
            self.left.through(),
            &self.sentinels,
        )?;
        let new_right = Shoulder::build(
            &self.label,
            Side::Right,
            &self.params,
            self.source(Side::Right),
            right,
            self.right.through(),
            &self.sentinels,
        )?;
        self.left = new_left;
        self.right = new_right;
        Ok(())
    }

    /// Swap the shoulders' feeder totals into each other's through sources.
    ///
    /// Simple substations pass them on unchanged. In a duplex substation the
    /// leading shoulder receives the retarding total turned by +60° and the
    /// retarding shoulder the leading total turned by -60°. Contact and supply
    /// totals are exchanged separately.
    pub fn exchange(&mut self) {
        let (l, r) = (self.left.totals(), self.right.totals());
        let (to_left, to_right) = match self.params.kind {
            SubstationKind::Simple => (r, l),
            SubstationKind::Duplex => {
                let shift = radians_of(shoulder_shift());
                let turn = |(c, s): (T, T), a: Real| (c.rotated(a), s.rotated(a));
                match self.params.leading {
                    Side::Left => (turn(r, shift), turn(l, -shift)),
                    Side::Right => (turn(r, -shift), turn(l, shift)),
                }
            }
        };
        self.left.set_through(to_left.0, to_left.1);
        self.right.set_through(to_right.0, to_right.1);
    }

    /// Contact current delivered on both sides together.
    pub fn total_current(&self) -> T {
        self.left.totals().0 + self.right.totals().0
    }

    /// Load current above which the booster engages: `(E - U_min) / Z_int`.
    ///
    /// `None` without a booster, infinite when the internal impedance is
    /// negligible.
    pub fn booster_threshold(&self) -> Option<Real> {
        let booster = self.params.booster.as_ref()?;
        let z = self.params.internal.modulus();
        if z <= self.sentinels.short {
            return Some(Real::INFINITY);
        }
        Some((self.params.emf.modulus() - volts_of(booster.min_voltage)) / z)
    }

    /// Switch to the boosted operating point if the load exceeds the threshold.
    ///
    /// Returns whether the booster engaged; the local graphs are rebuilt and
    /// the owning zones need reassembly.
    pub fn evaluate_booster(&mut self) -> BlockResult<bool> {
        if self.boosted {
            return Ok(false);
        }
        let Some(threshold) = self.booster_threshold() else {
            return Ok(false);
        };
        let load = self.total_current().modulus();
        if load <= threshold {
            return Ok(false);
        }
        tracing::debug!(substation = %self.label, load, threshold, "booster engaged");
        self.boosted = true;
        let (l, r) = (self.left.state.clone(), self.right.state.clone());
        self.rebuild(l, r)?;
        Ok(true)
    }

    /// Return to the nominal operating point. Returns whether anything changed.
    pub fn reset_booster(&mut self) -> BlockResult<bool> {
        if !self.boosted {
            return Ok(false);
        }
        self.boosted = false;
        let (l, r) = (self.left.state.clone(), self.right.state.clone());
        self.rebuild(l, r)?;
        Ok(true)
    }

    fn facing(&self, placement: Placement) -> BlockResult<Side> {
        placement.facing_side().ok_or_else(|| BlockError::Placement {
            label: self.label.clone(),
            what: "a substation must be the first or last block of its zone".into(),
        })
    }

    fn check_state(&self, what: &'static str, state: &FeederState) -> BlockResult<()> {
        let n = self.params.tracks.len();
        check_len(&self.label, what, n, state.contact.len())?;
        let supply = if self.params.two_by_25 { n } else { 0 };
        check_len(&self.label, "supply feeders", supply, state.supply.len())
    }
}

impl<T: Phasor> TopologyBlock<T> for Substation<T> {
    type Params = SubstationParams<T>;

    fn build(label: String, params: SubstationParams<T>, ctx: &mut BuildContext) -> BlockResult<Self> {
        if params.tracks.is_empty() {
            return Err(BlockError::invalid(&label, "substation feeds no track"));
        }
        if T::KIND == SystemKind::Dc
            && (params.kind == SubstationKind::Duplex || params.two_by_25)
        {
            return Err(BlockError::invalid(
                &label,
                "duplex and 2x25 kV substations exist only in AC systems",
            ));
        }
        check_finite(&label, "EMF", params.emf)?;
        check_finite(&label, "internal impedance", params.internal)?;
        check_finite(&label, "feeder impedance", params.feeder)?;
        if let Some(b) = &params.booster {
            check_finite(&label, "booster EMF", b.emf)?;
            check_finite(&label, "booster impedance", b.internal)?;
        }

        let n = params.tracks.len();
        let closed = FeederState {
            contact: vec![true; n],
            supply: if params.two_by_25 { vec![true; n] } else { Vec::new() },
        };
        let sentinels = ctx.sentinels;
        let nil = (T::nil(), T::nil());
        let shoulder = |side| {
            let source = source_for(&params, false, side);
            Shoulder::build(&label, side, &params, source, closed.clone(), nil, &sentinels)
        };
        let (left, right) = (shoulder(Side::Left)?, shoulder(Side::Right)?);
        Ok(Self {
            label,
            params,
            sentinels,
            boosted: false,
            left,
            right,
        })
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Substation
    }

    fn coordinate(&self) -> Real {
        self.params.coordinate
    }

    fn merge_into(&self, assembly: &mut Assembly<T>, placement: Placement) -> BlockResult<Splice> {
        let side = self.facing(placement)?;
        self.shoulder(side).merge(&self.label, assembly)
    }

    fn update_state(&mut self, record: &StateRecord) -> BlockResult<()> {
        let StateRecord::Substation { left, right } = record else {
            return Err(BlockError::StateKind {
                label: self.label.clone(),
                expected: BlockKind::Substation,
                found: record.kind(),
            });
        };
        self.check_state("left feeders", left)?;
        self.check_state("right feeders", right)?;
        self.rebuild(left.clone(), right.clone())
    }

    fn state_record(&self) -> StateRecord {
        StateRecord::Substation {
            left: self.left.state.clone(),
            right: self.right.state.clone(),
        }
    }

    fn refresh_sources(
        &self,
        placement: Placement,
        splice: &Splice,
        graph: &mut Graph<T>,
    ) -> BlockResult<()> {
        let side = self.facing(placement)?;
        self.shoulder(side).refresh(splice, graph)
    }

    fn collect(&mut self, placement: Placement, splice: &Splice, graph: &Graph<T>) -> BlockResult<()> {
        let side = self.facing(placement)?;
        self.shoulder_mut(side).collect(splice, graph)
    }

    fn solution(&self) -> BlockSolution {
        let mut s = BlockSolution::new::<T>(&self.label, BlockKind::Substation, self.params.coordinate)
            .describe(match self.params.kind {
                SubstationKind::Simple => "substation",
                SubstationKind::Duplex => "duplex substation",
            });
        if self.params.booster.is_some() {
            s.attribute("boosted", self.boosted);
        }
        for shoulder in [&self.left, &self.right] {
            let Some(r) = shoulder.readings() else {
                continue;
            };
            let side = shoulder.side;
            s.voltage(format!("{side} bus"), r.bus);
            if let Some(u) = r.supply_bus {
                s.voltage(format!("{side} supply bus"), u);
            }
            s.current(format!("{side} source"), r.source);
            s.current(format!("{side} through"), r.through);
            s.current(format!("{side} total"), r.total);
            for (track, i) in self.params.tracks.iter().zip(&r.feeders) {
                s.current(format!("{side} feeder {}", TrackId::main(*track)), *i);
            }
            if self.params.two_by_25 {
                s.current(format!("{side} supply through"), r.supply_through);
                s.current(format!("{side} supply total"), r.supply_total);
                for (track, i) in self.params.tracks.iter().zip(&r.supply_feeders) {
                    s.current(format!("{side} feeder {}", TrackId::supply(0, *track)), *i);
                }
            }
        }
        s
    }

    fn compact_solution(&self) -> BlockResult<CompactEntry> {
        let mut values = vec![self.params.coordinate];
        let bus = |s: &Shoulder<T>| s.readings().map_or(T::nil(), |r| r.bus);
        for v in [
            self.left.totals().0,
            self.right.totals().0,
            bus(&self.left),
            bus(&self.right),
        ] {
            let (re, im) = v.parts();
            values.extend([re, im]);
        }
        Ok(CompactEntry::Substation(values))
    }
}

/// Operating point of one shoulder: boosted or nominal, retarded by 60° on
/// the lagging side of a duplex substation.
fn source_for<T: Phasor>(params: &SubstationParams<T>, boosted: bool, side: Side) -> Source<T> {
    let (emf, internal) = match (&params.booster, boosted) {
        (Some(b), true) => (b.emf, b.internal),
        _ => (params.emf, params.internal),
    };
    let emf = match params.kind {
        SubstationKind::Duplex if side != params.leading => {
            emf.rotated(-radians_of(shoulder_shift()))
        }
        _ => emf,
    };
    Source { emf, internal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tp_core::{Complex64, volts};

    fn duplex() -> Substation<Complex64> {
        Substation::build(
            "SS1".into(),
            SubstationParams::duplex(0.0, vec![1, 2], Complex64::new(27_500.0, 0.0), Complex64::new(0.1, 1.0)),
            &mut BuildContext::default(),
        )
        .unwrap()
    }

    fn fake_readings(total: Complex64) -> ShoulderReadings<Complex64> {
        ShoulderReadings {
            bus: Complex64::new(27_000.0, 0.0),
            supply_bus: None,
            source: total,
            through: Complex64::new(0.0, 0.0),
            supply_through: Complex64::new(0.0, 0.0),
            feeders: vec![total],
            supply_feeders: vec![],
            total,
            supply_total: Complex64::new(0.0, 0.0),
        }
    }

    #[test]
    fn retarding_shoulder_lags_sixty_degrees() {
        let ss = duplex();
        assert_relative_eq!(ss.left.emf().arg(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            ss.right.emf().arg(),
            -std::f64::consts::FRAC_PI_3,
            epsilon = 1e-12
        );
    }

    #[test]
    fn duplex_exchange_rotates_totals() {
        let mut ss = duplex();
        let current = Complex64::from_polar(400.0, -0.3);
        ss.left.readings = Some(fake_readings(current));
        ss.right.readings = Some(fake_readings(current));
        ss.exchange();
        let shift = std::f64::consts::FRAC_PI_3;
        let (left_through, _) = ss.left.through();
        let (right_through, _) = ss.right.through();
        assert_relative_eq!(left_through.re, current.rotated(shift).re, epsilon = 1e-9);
        assert_relative_eq!(left_through.im, current.rotated(shift).im, epsilon = 1e-9);
        assert_relative_eq!(right_through.re, current.rotated(-shift).re, epsilon = 1e-9);
        assert_relative_eq!(right_through.im, current.rotated(-shift).im, epsilon = 1e-9);
        // the local graph carries the new source value too
        let e = ss.left.graph.edge(ss.left.through_edge).unwrap();
        assert_eq!(e.injected, left_through);
    }

    #[test]
    fn simple_exchange_swaps_totals() {
        let mut ss: Substation<f64> = Substation::build(
            "SS1".into(),
            SubstationParams::simple(0.0, vec![1], 3300.0, 0.05),
            &mut BuildContext::default(),
        )
        .unwrap();
        ss.left.readings = Some(ShoulderReadings {
            bus: 3300.0,
            supply_bus: None,
            source: 120.0,
            through: 0.0,
            supply_through: 0.0,
            feeders: vec![120.0],
            supply_feeders: vec![],
            total: 120.0,
            supply_total: 0.0,
        });
        ss.exchange();
        assert_eq!(ss.right.through().0, 120.0);
        assert_eq!(ss.left.through().0, 0.0);
    }

    #[test]
    fn dc_rejects_duplex() {
        let err = Substation::<f64>::build(
            "SS1".into(),
            SubstationParams::duplex(0.0, vec![1], 3300.0, 0.05),
            &mut BuildContext::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BlockError::InvalidParameter { .. }));
    }

    #[test]
    fn two_by_25_adds_supply_network() {
        let ss = Substation::build(
            "SS1".into(),
            SubstationParams::simple(0.0, vec![1], Complex64::new(27_500.0, 0.0), Complex64::new(0.1, 1.0))
                .with_two_by_25(),
            &mut BuildContext::default(),
        )
        .unwrap();
        let g = ss.left.graph();
        // ground, bus, contact node, supply bus, supply node
        assert_eq!(g.node_count(), 5);
        // source, through, feeder, supply source, supply through, supply feeder
        assert_eq!(g.edge_count(), 6);
        let supply_source = g.edge(ss.left.supply_emf_edge.unwrap()).unwrap();
        assert_eq!(supply_source.target, g.ground().unwrap());
    }

    #[test]
    fn state_round_trip_and_size_check() {
        let mut a = duplex();
        let record = StateRecord::Substation {
            left: FeederState {
                contact: vec![true, false],
                supply: vec![],
            },
            right: FeederState {
                contact: vec![false, false],
                supply: vec![],
            },
        };
        a.update_state(&record).unwrap();
        let mut b = duplex();
        b.update_state(&a.state_record()).unwrap();
        assert_eq!(b.state_record(), record);

        let bad = StateRecord::Substation {
            left: FeederState {
                contact: vec![true],
                supply: vec![],
            },
            right: FeederState::default(),
        };
        assert!(matches!(b.update_state(&bad), Err(BlockError::StateSize { .. })));
    }

    #[test]
    fn booster_threshold_and_engagement() {
        let mut ss: Substation<f64> = Substation::build(
            "SS1".into(),
            SubstationParams::simple(0.0, vec![1], 3300.0, 0.1).with_booster(Booster {
                emf: 3600.0,
                internal: 0.05,
                min_voltage: volts(3000.0),
            }),
            &mut BuildContext::default(),
        )
        .unwrap();
        assert_relative_eq!(ss.booster_threshold().unwrap(), 3000.0, epsilon = 1e-9);
        assert!(!ss.evaluate_booster().unwrap());

        let mut r = ShoulderReadings {
            bus: 3000.0,
            supply_bus: None,
            source: 0.0,
            through: 0.0,
            supply_through: 0.0,
            feeders: vec![1600.0],
            supply_feeders: vec![],
            total: 1600.0,
            supply_total: 0.0,
        };
        ss.left.readings = Some(r.clone());
        r.total = 1500.0;
        ss.right.readings = Some(r);
        assert!(ss.evaluate_booster().unwrap());
        assert!(ss.is_boosted());
        assert_eq!(ss.left.emf(), 3600.0);
        assert!(ss.reset_booster().unwrap());
        assert_eq!(ss.left.emf(), 3300.0);
    }

    #[test]
    fn interior_placement_is_rejected() {
        let ss = duplex();
        let mut asm = Assembly::new(Sentinels::default());
        assert!(matches!(
            ss.merge_into(&mut asm, Placement::Interior),
            Err(BlockError::Placement { .. })
        ));
        ss.merge_into(&mut asm, Placement::First).unwrap();
        assert!(asm.port("SS1", Side::Right).is_some());
        assert!(asm.port("SS1", Side::Left).is_none());
    }
}
