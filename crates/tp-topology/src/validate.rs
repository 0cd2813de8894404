//! Topology validation logic.

use std::collections::HashSet;

use tp_core::SystemKind;

use crate::schema::{
    BlockDef, BlockKindDef, LinkDef, PhasorDef, SectionDef, SolverDef, SubstationKindDef, Topology,
};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate label: {label}")]
    DuplicateLabel { label: String },

    #[error("Duplicate branch index: {index}")]
    DuplicateBranch { index: u16 },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_topology(topology: &Topology) -> Result<(), ValidationError> {
    if topology.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: topology.version,
        });
    }

    let line = topology.line;
    if !line.start_km.is_finite() || !line.end_km.is_finite() {
        return Err(invalid("line", format!("{line:?}"), "must be finite"));
    }
    if line.end_km <= line.start_km {
        return Err(invalid("line.end_km", line.end_km, "must exceed start_km"));
    }

    if let Some(solver) = &topology.solver {
        validate_solver(solver)?;
    }
    if let Some(s) = &topology.sentinels {
        if !(s.short_ohm > 0.0 && s.short_ohm.is_finite() && s.disconnected_ohm.is_finite()) {
            return Err(invalid("sentinels", format!("{s:?}"), "must be positive and finite"));
        }
        if s.disconnected_ohm <= s.short_ohm {
            return Err(invalid(
                "sentinels.disconnected_ohm",
                s.disconnected_ohm,
                "must exceed short_ohm",
            ));
        }
    }

    validate_sections(&topology.sections, topology.line.end_km, topology.system)?;

    let mut ctx = Context {
        system: topology.system,
        labels: HashSet::new(),
        branches: HashSet::new(),
    };
    let mut substations = 0;
    for block in &topology.blocks {
        if matches!(block.kind, BlockKindDef::Substation { .. }) {
            substations += 1;
        }
        let x = block.kind.coordinate();
        if x.is_finite() && (x < line.start_km || x > line.end_km) {
            return Err(invalid(
                format!("{} coordinate_km", block.kind.type_name()),
                x,
                "outside the line",
            ));
        }
        ctx.block(block, false)?;
    }
    if substations < 2 {
        return Err(invalid(
            "blocks",
            substations,
            "a line needs at least two substations",
        ));
    }

    Ok(())
}

fn validate_solver(solver: &SolverDef) -> Result<(), ValidationError> {
    if solver.max_iterations == Some(0) {
        return Err(invalid("solver.max_iterations", 0, "must be positive"));
    }
    let tolerances = [
        ("solver.phase_tolerance_deg", solver.phase_tolerance_deg),
        ("solver.ac_current_tolerance_a", solver.ac_current_tolerance_a),
        ("solver.dc_current_tolerance_a", solver.dc_current_tolerance_a),
    ];
    for (field, value) in tolerances {
        if let Some(v) = value
            && !(v.is_finite() && v >= 0.0)
        {
            return Err(invalid(field, v, "must be finite and non-negative"));
        }
    }
    Ok(())
}

fn validate_sections(
    sections: &[SectionDef],
    end_km: f64,
    system: SystemKind,
) -> Result<(), ValidationError> {
    let Some(last) = sections.last() else {
        return Err(invalid("sections", "[]", "at least one section is required"));
    };
    let mut previous = f64::NEG_INFINITY;
    for section in sections {
        if !section.until_km.is_finite() || section.until_km <= previous {
            return Err(invalid(
                "sections.until_km",
                section.until_km,
                "must be finite and strictly ascending",
            ));
        }
        previous = section.until_km;
        for entry in &section.resistivity {
            phasor(
                system,
                &format!("resistivity {}/{}", entry.a, entry.b),
                entry.value,
            )?;
        }
    }
    if last.until_km < end_km {
        return Err(invalid(
            "sections.until_km",
            last.until_km,
            "sections must cover the whole line",
        ));
    }
    Ok(())
}

fn phasor(system: SystemKind, field: &str, value: PhasorDef) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(invalid(field, format!("{value:?}"), "must be finite"));
    }
    if system == SystemKind::Dc && !value.is_real() {
        return Err(invalid(
            field,
            format!("{value:?}"),
            "a DC system takes real values only",
        ));
    }
    Ok(())
}

fn ac_only(system: SystemKind, feature: &str) -> Result<(), ValidationError> {
    if system == SystemKind::Dc {
        return Err(ValidationError::Unsupported {
            feature: feature.to_string(),
            reason: "only available in AC systems".to_string(),
        });
    }
    Ok(())
}

struct Context {
    system: SystemKind,
    labels: HashSet<String>,
    branches: HashSet<u16>,
}

impl Context {
    fn block(&mut self, block: &BlockDef, nested: bool) -> Result<(), ValidationError> {
        if let Some(label) = &block.label
            && !self.labels.insert(label.clone())
        {
            return Err(ValidationError::DuplicateLabel {
                label: label.clone(),
            });
        }
        let kind = &block.kind;
        let x = kind.coordinate();
        if !x.is_finite() {
            return Err(invalid(
                format!("{} coordinate_km", kind.type_name()),
                x,
                "must be finite",
            ));
        }
        let system = self.system;

        match kind {
            BlockKindDef::Substation {
                tracks,
                emf,
                internal,
                feeder,
                kind,
                two_by_25,
                booster,
                ..
            } => {
                if nested {
                    return Err(ValidationError::Unsupported {
                        feature: "substation inside a branch".to_string(),
                        reason: "branches are fed through their feed entry".to_string(),
                    });
                }
                tracks_given("substation tracks", tracks)?;
                phasor(system, "substation emf", *emf)?;
                phasor(system, "substation internal", *internal)?;
                phasor(system, "substation feeder", *feeder)?;
                if *kind == SubstationKindDef::Duplex {
                    ac_only(system, "duplex substation")?;
                }
                if *two_by_25 {
                    ac_only(system, "2x25 kV substation")?;
                }
                if let Some(b) = booster {
                    if system == SystemKind::Ac {
                        return Err(ValidationError::Unsupported {
                            feature: "booster".to_string(),
                            reason: "only available in DC systems".to_string(),
                        });
                    }
                    phasor(system, "booster emf", b.emf)?;
                    phasor(system, "booster internal", b.internal)?;
                    if !b.min_voltage_v.is_finite() {
                        return Err(invalid("booster min_voltage_v", b.min_voltage_v, "must be finite"));
                    }
                }
            }
            BlockKindDef::SectioningPost {
                tracks,
                feeder,
                two_by_25,
                autotransformer,
                ..
            } => {
                tracks_given("sectioning post tracks", tracks)?;
                phasor(system, "sectioning post feeder", *feeder)?;
                if *two_by_25 {
                    ac_only(system, "2x25 kV sectioning post")?;
                }
                if let Some(w) = autotransformer {
                    ac_only(system, "autotransformer")?;
                    if !two_by_25 {
                        return Err(invalid(
                            "sectioning post autotransformer",
                            "present",
                            "needs two_by_25",
                        ));
                    }
                    phasor(system, "windings magnetizing", w.magnetizing)?;
                    phasor(system, "windings leakage", w.leakage)?;
                }
            }
            BlockKindDef::Load {
                current,
                phase_offset_deg,
                ..
            } => {
                phasor(system, "load current", *current)?;
                if !phase_offset_deg.is_finite() {
                    return Err(invalid("load phase_offset_deg", phase_offset_deg, "must be finite"));
                }
            }
            BlockKindDef::Jumper {
                links, impedance, ..
            } => {
                links_given("jumper links", links)?;
                phasor(system, "jumper impedance", *impedance)?;
            }
            BlockKindDef::Branch {
                index,
                splitter,
                feed,
                blocks,
            } => {
                if *index == 0 {
                    return Err(invalid("branch index", 0, "branch 0 is the main line"));
                }
                if !self.branches.insert(*index) {
                    return Err(ValidationError::DuplicateBranch { index: *index });
                }
                links_given("splitter links", &splitter.links)?;
                if splitter.links.iter().any(|l| l.b.branch != *index) {
                    return Err(invalid(
                        "splitter links",
                        index,
                        "the branch end of every link must lie on the branch",
                    ));
                }
                if !splitter.branch_coordinate_km.is_finite() {
                    return Err(invalid(
                        "splitter branch_coordinate_km",
                        splitter.branch_coordinate_km,
                        "must be finite",
                    ));
                }
                phasor(system, "splitter impedance", splitter.impedance)?;
                if let Some(f) = feed {
                    tracks_given("branch feed tracks", &f.tracks)?;
                    phasor(system, "branch feed feeder", f.feeder)?;
                    if !f.coordinate_km.is_finite() {
                        return Err(invalid("branch feed coordinate_km", f.coordinate_km, "must be finite"));
                    }
                }
                for inner in blocks {
                    self.block(inner, true)?;
                }
            }
            BlockKindDef::Autotransformer { windings, .. } => {
                ac_only(system, "autotransformer")?;
                phasor(system, "windings magnetizing", windings.magnetizing)?;
                phasor(system, "windings leakage", windings.leakage)?;
            }
            BlockKindDef::ShortCircuit { resistance, .. } => {
                phasor(system, "short circuit resistance", *resistance)?;
            }
        }
        Ok(())
    }
}

fn tracks_given(field: &str, tracks: &[u16]) -> Result<(), ValidationError> {
    if tracks.is_empty() {
        return Err(invalid(field, "[]", "at least one track is required"));
    }
    let unique: HashSet<_> = tracks.iter().collect();
    if unique.len() != tracks.len() {
        return Err(invalid(field, format!("{tracks:?}"), "tracks must be distinct"));
    }
    Ok(())
}

fn links_given(field: &str, links: &[LinkDef]) -> Result<(), ValidationError> {
    if links.is_empty() {
        return Err(invalid(field, "[]", "at least one link is required"));
    }
    Ok(())
}
