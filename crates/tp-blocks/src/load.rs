//! Traction load (a train drawing current at one point).

use tp_core::{
    Angle, EdgeId, NodeId, Phasor, Real, Sentinels, TrackId, angle_delta, ensure_finite,
    raw::radians_of, radians,
};
use tp_graph::{EdgePayload, Graph, Splice};

use crate::assembly::Assembly;
use crate::common::{check_finite, current_of, merge_interior, potential_of, set_injected};
use crate::error::{BlockError, BlockResult};
use crate::factory::BuildContext;
use crate::solution::{BlockSolution, CompactEntry};
use crate::state::{StateRecord, from_record, to_record};
use crate::traits::{BlockKind, Placement, TopologyBlock};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadParams<T> {
    pub coordinate: Real,
    pub track: TrackId,
    /// Current drawn from the line.
    pub current: T,
    /// Angle the current lags the voltage by. Ignored for DC.
    pub phase_offset: Angle,
}

impl<T: Phasor> LoadParams<T> {
    pub fn new(coordinate: Real, track: TrackId, current: T) -> Self {
        Self {
            coordinate,
            track,
            current,
            phase_offset: radians(0.0),
        }
    }

    pub fn with_phase_offset(mut self, offset: Angle) -> Self {
        self.phase_offset = offset;
        self
    }
}

/// A ground → line edge with the disconnect sentinel and an injected current.
///
/// The solved branch current is the negated injected current (the train
/// returns it through the rail), so the reported load current is `-J`.
#[derive(Debug, Clone)]
pub struct Load<T> {
    label: String,
    params: LoadParams<T>,
    sentinels: Sentinels,
    graph: Graph<T>,
    node: NodeId,
    edge: EdgeId,
    voltage: Option<T>,
    drawn: Option<T>,
}

impl<T: Phasor> Load<T> {
    pub fn track(&self) -> TrackId {
        self.params.track
    }

    /// Prescribed current.
    pub fn current(&self) -> T {
        self.params.current
    }

    pub fn set_current(&mut self, current: T) {
        self.params.current = current;
    }

    pub fn phase_offset(&self) -> Real {
        radians_of(self.params.phase_offset)
    }

    /// Voltage at the load node from the last collected solve.
    pub fn voltage(&self) -> Option<T> {
        self.voltage
    }

    /// Turn the prescribed current towards the node voltage phase.
    ///
    /// The target phase is the voltage phase minus the power-factor offset.
    /// Returns the misalignment (rad) when it exceeded `tolerance` and the
    /// current was rotated, `None` when already aligned or not yet solved.
    pub fn align_phase(&mut self, tolerance: Real) -> Option<Real> {
        let voltage = self.voltage?;
        if voltage.modulus() == 0.0 || self.params.current.modulus() == 0.0 {
            return None;
        }
        let target = voltage.phase() - self.phase_offset();
        let delta = angle_delta(target, self.params.current.phase());
        if delta.abs() <= tolerance {
            return None;
        }
        self.params.current = self.params.current.rotated(delta);
        Some(delta)
    }

    fn rebuild(&mut self) -> BlockResult<()> {
        check_finite(&self.label, "load current", self.params.current)?;
        ensure_finite(self.params.coordinate, "load coordinate")
            .map_err(|e| BlockError::invalid(&self.label, e.to_string()))?;
        let mut graph = Graph::new();
        let ground = graph.add_ground("rail");
        let node = graph.add_node(
            self.params.coordinate,
            Some(self.params.track),
            format!("{}:line", self.label),
            false,
        );
        let edge = graph.add_edge(
            ground,
            node,
            EdgePayload::new(self.label.clone(), T::ohms(self.sentinels.disconnected))
                .with_injected(self.params.current),
        )?;
        self.graph = graph;
        self.node = node;
        self.edge = edge;
        Ok(())
    }
}

impl<T: Phasor> TopologyBlock<T> for Load<T> {
    type Params = LoadParams<T>;

    fn build(label: String, params: LoadParams<T>, ctx: &mut BuildContext) -> BlockResult<Self> {
        let mut load = Self {
            label,
            params,
            sentinels: ctx.sentinels,
            graph: Graph::new(),
            node: NodeId::from_index(0),
            edge: EdgeId::from_index(0),
            voltage: None,
            drawn: None,
        };
        load.rebuild()?;
        Ok(load)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Load
    }

    fn coordinate(&self) -> Real {
        self.params.coordinate
    }

    fn merge_into(&self, assembly: &mut Assembly<T>, placement: Placement) -> BlockResult<Splice> {
        merge_interior(&self.label, &self.graph, assembly, placement)
    }

    fn update_state(&mut self, record: &StateRecord) -> BlockResult<()> {
        let StateRecord::Load {
            current,
            phase_offset,
        } = record
        else {
            return Err(BlockError::StateKind {
                label: self.label.clone(),
                expected: BlockKind::Load,
                found: record.kind(),
            });
        };
        self.params.current = from_record(*current);
        self.params.phase_offset = radians(*phase_offset);
        self.rebuild()
    }

    fn state_record(&self) -> StateRecord {
        StateRecord::Load {
            current: to_record(self.params.current),
            phase_offset: self.phase_offset(),
        }
    }

    fn refresh_sources(
        &self,
        _placement: Placement,
        splice: &Splice,
        graph: &mut Graph<T>,
    ) -> BlockResult<()> {
        set_injected(graph, splice, self.edge, self.params.current)
    }

    fn collect(&mut self, _placement: Placement, splice: &Splice, graph: &Graph<T>) -> BlockResult<()> {
        self.voltage = Some(potential_of(graph, splice, self.node)?);
        self.drawn = Some(-current_of(graph, splice, self.edge)?);
        Ok(())
    }

    fn solution(&self) -> BlockSolution {
        let mut s = BlockSolution::new::<T>(&self.label, BlockKind::Load, self.params.coordinate)
            .on_track(self.params.track);
        s.current("load", self.drawn.unwrap_or_else(T::nil));
        s.current("prescribed", self.params.current);
        s.voltage("pantograph", self.voltage.unwrap_or_else(T::nil));
        s
    }

    fn compact_solution(&self) -> BlockResult<CompactEntry> {
        let (ire, iim) = self.drawn.unwrap_or_else(T::nil).parts();
        let (ure, uim) = self.voltage.unwrap_or_else(T::nil).parts();
        Ok(CompactEntry::Load(vec![
            self.params.coordinate,
            self.params.track.code() as Real,
            ire,
            iim,
            ure,
            uim,
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tp_core::{Complex64, degrees};

    fn load(current: Complex64) -> Load<Complex64> {
        let mut ctx = BuildContext::default();
        Load::build(
            "L1".into(),
            LoadParams::new(5.0, TrackId::main(1), current),
            &mut ctx,
        )
        .unwrap()
    }

    #[test]
    fn builds_a_current_source() {
        let l = load(Complex64::new(100.0, 0.0));
        let edge = l.graph.edge(l.edge).unwrap();
        assert!(edge.is_source());
        assert_eq!(edge.injected, Complex64::new(100.0, 0.0));
        assert_eq!(edge.impedance.re, Sentinels::default().disconnected);
    }

    #[test]
    fn state_round_trip() {
        let mut a = load(Complex64::new(80.0, -20.0));
        a.update_state(&StateRecord::Load {
            current: [120.0, 5.0],
            phase_offset: 0.2,
        })
        .unwrap();
        let mut b = load(Complex64::new(1.0, 0.0));
        b.update_state(&a.state_record()).unwrap();
        assert_eq!(a.state_record(), b.state_record());
        assert_eq!(b.current(), Complex64::new(120.0, 5.0));
    }

    #[test]
    fn wrong_record_kind() {
        let mut l = load(Complex64::new(1.0, 0.0));
        let err = l
            .update_state(&StateRecord::Jumper { links: vec![] })
            .unwrap_err();
        assert!(matches!(err, BlockError::StateKind { .. }));
    }

    #[test]
    fn phase_alignment_honours_offset() {
        let mut l = load(Complex64::from_polar(100.0, 0.0));
        l.params.phase_offset = degrees(15.0);
        l.voltage = Some(Complex64::from_polar(25_000.0, 0.5));
        let tol = 1.0_f64.to_radians();
        let delta = l.align_phase(tol).unwrap();
        assert_relative_eq!(delta, 0.5 - 15.0_f64.to_radians(), epsilon = 1e-12);
        assert_relative_eq!(l.current().norm(), 100.0, epsilon = 1e-9);
        assert!(l.align_phase(tol).is_none());
    }

    proptest::proptest! {
        #[test]
        fn alignment_settles_in_one_step(
            current_phase in -3.0f64..3.0,
            voltage_phase in -3.0f64..3.0,
            offset_deg in -40.0f64..40.0,
        ) {
            let mut l = load(Complex64::from_polar(250.0, current_phase));
            l.params.phase_offset = degrees(offset_deg);
            l.voltage = Some(Complex64::from_polar(27_500.0, voltage_phase));
            let tol = 1.0_f64.to_radians();
            l.align_phase(tol);
            let target = voltage_phase - offset_deg.to_radians();
            proptest::prop_assert!(angle_delta(target, l.current().arg()).abs() <= tol + 1e-9);
            proptest::prop_assert!((l.current().norm() - 250.0).abs() < 1e-9);
            proptest::prop_assert!(l.align_phase(tol).is_none());
        }
    }
}
