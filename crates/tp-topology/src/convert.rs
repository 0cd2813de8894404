//! Conversion of a validated topology into engine inputs.

use tp_blocks::{
    AutotransformerParams, BlockParams, BlockSpec, Booster, BranchFeed, BranchParams, JumperParams,
    Link, LoadParams, SectioningPostParams, ShortCircuitParams, Side, SplitterParams,
    SubstationKind, SubstationParams, Windings,
};
use tp_core::{Phasor, Sentinels, amps, degrees, volts};
use tp_coupling::ResistanceSection;
use tp_network::{NetworkDescription, SolverConfig};

use crate::schema::{
    BlockDef, BlockKindDef, LinkDef, PhasorDef, SectionDef, SubstationKindDef, Topology,
    WindingsDef,
};
use crate::{TopologyError, TopologyResult};

fn value<T: Phasor>(v: PhasorDef) -> T {
    let (re, im) = v.parts();
    T::from_parts(re, im)
}

fn links(defs: &[LinkDef]) -> Vec<Link> {
    defs.iter()
        .map(|l| Link {
            a: l.a,
            b: l.b,
            closed: l.closed,
        })
        .collect()
}

fn windings<T: Phasor>(w: &WindingsDef) -> Windings<T> {
    Windings {
        magnetizing: value(w.magnetizing),
        leakage: value(w.leakage),
    }
}

fn section<T: Phasor>(def: &SectionDef) -> ResistanceSection<T> {
    def.resistivity
        .iter()
        .fold(ResistanceSection::new(def.until_km), |s, r| {
            s.with(r.a, r.b, value(r.value))
        })
}

fn params<T: Phasor>(kind: &BlockKindDef) -> BlockParams<T> {
    match kind {
        BlockKindDef::Substation {
            coordinate_km,
            tracks,
            emf,
            internal,
            feeder,
            kind,
            two_by_25,
            leading,
            booster,
        } => BlockParams::Substation(SubstationParams {
            coordinate: *coordinate_km,
            kind: match kind {
                SubstationKindDef::Simple => SubstationKind::Simple,
                SubstationKindDef::Duplex => SubstationKind::Duplex,
            },
            tracks: tracks.clone(),
            emf: value(*emf),
            internal: value(*internal),
            feeder: value(*feeder),
            two_by_25: *two_by_25,
            leading: leading.unwrap_or(Side::Left),
            booster: booster.map(|b| Booster {
                emf: value(b.emf),
                internal: value(b.internal),
                min_voltage: volts(b.min_voltage_v),
            }),
        }),
        BlockKindDef::SectioningPost {
            coordinate_km,
            branch,
            tracks,
            feeder,
            two_by_25,
            autotransformer,
        } => BlockParams::SectioningPost(SectioningPostParams {
            coordinate: *coordinate_km,
            branch: *branch,
            tracks: tracks.clone(),
            feeder: value(*feeder),
            two_by_25: *two_by_25,
            autotransformer: autotransformer.as_ref().map(windings),
        }),
        BlockKindDef::Load {
            coordinate_km,
            track,
            current,
            phase_offset_deg,
        } => BlockParams::Load(
            LoadParams::new(*coordinate_km, *track, value(*current))
                .with_phase_offset(degrees(*phase_offset_deg)),
        ),
        BlockKindDef::Jumper {
            coordinate_km,
            links: l,
            impedance,
        } => BlockParams::Jumper(JumperParams {
            coordinate: *coordinate_km,
            links: links(l),
            impedance: value(*impedance),
        }),
        BlockKindDef::Branch {
            index,
            splitter,
            feed,
            blocks,
        } => BlockParams::Branch(BranchParams {
            index: *index,
            splitter: SplitterParams {
                coordinate: splitter.coordinate_km,
                branch_coordinate: splitter.branch_coordinate_km,
                links: links(&splitter.links),
                impedance: value(splitter.impedance),
            },
            blocks: blocks.iter().map(spec).collect(),
            feed: feed.as_ref().map(|f| BranchFeed {
                substation: f.substation.clone(),
                side: f.side,
                coordinate: f.coordinate_km,
                tracks: f.tracks.clone(),
                feeder: value(f.feeder),
            }),
        }),
        BlockKindDef::Autotransformer {
            coordinate_km,
            branch,
            track,
            windings: w,
        } => BlockParams::Autotransformer(AutotransformerParams {
            coordinate: *coordinate_km,
            branch: *branch,
            track: *track,
            windings: windings(w),
        }),
        BlockKindDef::ShortCircuit {
            coordinate_km,
            track,
            resistance,
            active,
        } => BlockParams::ShortCircuit(ShortCircuitParams {
            coordinate: *coordinate_km,
            track: *track,
            resistance: value(*resistance),
            active: *active,
        }),
    }
}

fn spec<T: Phasor>(def: &BlockDef) -> BlockSpec<T> {
    BlockSpec {
        label: def.label.clone(),
        params: params(&def.kind),
    }
}

impl Topology {
    /// Outer-iteration settings: defaults with the document's overrides.
    pub fn solver_config(&self) -> SolverConfig {
        let mut config = SolverConfig::default();
        let Some(solver) = &self.solver else {
            return config;
        };
        if let Some(n) = solver.max_iterations {
            config.max_iterations = n;
        }
        if let Some(deg) = solver.phase_tolerance_deg {
            config.phase_tolerance = degrees(deg);
        }
        if let Some(a) = solver.ac_current_tolerance_a {
            config.ac_current_tolerance = amps(a);
        }
        if let Some(a) = solver.dc_current_tolerance_a {
            config.dc_current_tolerance = amps(a);
        }
        config
    }

    /// Build the engine description for value type `T`.
    ///
    /// `T` must match the document's system: `f64` for DC, `Complex64` for AC.
    pub fn to_description<T: Phasor>(&self) -> TopologyResult<NetworkDescription<T>> {
        if T::KIND != self.system {
            return Err(TopologyError::SystemMismatch {
                document: self.system,
                requested: T::KIND,
            });
        }
        let sections = self.sections.iter().map(section).collect();
        let blocks = self.blocks.iter().map(spec).collect();
        let mut description =
            NetworkDescription::new(self.name.clone(), self.line.start_km, sections, blocks)
                .with_config(self.solver_config());
        if let Some(s) = self.sentinels {
            description.sentinels = Sentinels {
                disconnected: s.disconnected_ohm,
                short: s.short_ohm,
            };
        }
        Ok(description)
    }
}
