//! The network controller: one instance per traction system.
//!
//! Owns the ordered main-line blocks and one [`Zone`] per pair of
//! neighbouring substations. Zones are assembled lazily and dropped whenever
//! a change touches their topology; source-only changes (load currents,
//! exchanged shoulder currents) merely refresh the assembled graphs.

use rayon::prelude::*;
use tp_blocks::{
    Block, BlockKind, BlockParams, BlockSolution, BlockSpec, BuildContext, CompactSummary,
    LoadParams, Side, StateRecord, TopologyBlock,
};
use tp_core::raw::amps_of;
use tp_core::{Phasor, Real, Sentinels, SystemKind};
use tp_coupling::{NetworkResistanceRange, ResistanceSection};
use tp_solver::Zone;

use crate::config::SolverConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::ordering::{boundaries, order};
use crate::report::{Convergence, SolveReport, ZoneReport};

/// Everything needed to build a network.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkDescription<T> {
    pub name: String,
    /// Start of the resistivity table (km).
    pub start_km: Real,
    pub sections: Vec<ResistanceSection<T>>,
    pub blocks: Vec<BlockSpec<T>>,
    pub config: SolverConfig,
    pub sentinels: Sentinels,
}

impl<T> NetworkDescription<T> {
    pub fn new(
        name: impl Into<String>,
        start_km: Real,
        sections: Vec<ResistanceSection<T>>,
        blocks: Vec<BlockSpec<T>>,
    ) -> Self {
        Self {
            name: name.into(),
            start_km,
            sections,
            blocks,
            config: SolverConfig::default(),
            sentinels: Sentinels::default(),
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }
}

/// Position of one zone in the ordered block list.
#[derive(Debug)]
struct ZoneSlot<T: Phasor> {
    left: String,
    right: String,
    first: usize,
    last: usize,
    zone: Option<Zone<T>>,
}

impl<T: Phasor> ZoneSlot<T> {
    fn name(&self) -> String {
        format!("{}..{}", self.left, self.right)
    }

    fn contains(&self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }
}

/// Solver for a whole traction line.
#[derive(Debug)]
pub struct Network<T: Phasor> {
    name: String,
    config: SolverConfig,
    sentinels: Sentinels,
    range: NetworkResistanceRange<T>,
    ctx: BuildContext,
    blocks: Vec<Block<T>>,
    slots: Vec<ZoneSlot<T>>,
}

impl<T: Phasor> Network<T> {
    /// Build every block, order them and lay out the zones.
    pub fn new(description: NetworkDescription<T>) -> NetworkResult<Self> {
        description.config.validate()?;
        let range = NetworkResistanceRange::new(description.start_km, description.sections)?;
        let mut ctx = BuildContext::new(description.sentinels);
        let mut blocks = description
            .blocks
            .into_iter()
            .map(|spec| Block::from_spec(spec, &mut ctx))
            .collect::<Result<Vec<_>, _>>()?;
        order(&mut blocks)?;

        let mut network = Self {
            name: description.name,
            config: description.config,
            sentinels: description.sentinels,
            range,
            ctx,
            blocks,
            slots: Vec::new(),
        };
        let (first, last) = network.fed_span();
        for x in [first, last] {
            if x < network.range.start() || x > network.range.end() {
                return Err(NetworkError::OutOfRange {
                    coordinate: x,
                    start: network.range.start(),
                    end: network.range.end(),
                });
            }
        }
        network.repartition();
        tracing::debug!(
            network = %network.name,
            blocks = network.blocks.len(),
            zones = network.slots.len(),
            "network laid out"
        );
        Ok(network)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn range(&self) -> &NetworkResistanceRange<T> {
        &self.range
    }

    /// Main-line blocks in line order.
    pub fn blocks(&self) -> &[Block<T>] {
        &self.blocks
    }

    /// Find a block by label, including blocks nested in branches.
    pub fn block(&self, label: &str) -> Option<&Block<T>> {
        self.blocks.iter().find_map(|b| b.find(label))
    }

    /// Zone names in line order.
    pub fn zone_names(&self) -> Vec<String> {
        self.slots.iter().map(ZoneSlot::name).collect()
    }

    /// The assembled zone, if it is currently assembled.
    pub fn zone(&self, name: &str) -> Option<&Zone<T>> {
        self.slots
            .iter()
            .find(|s| s.name() == name)
            .and_then(|s| s.zone.as_ref())
    }

    /// Coordinates of the first and last substation.
    fn fed_span(&self) -> (Real, Real) {
        let first = self.blocks.first().map_or(0.0, |b| b.coordinate());
        let last = self.blocks.last().map_or(0.0, |b| b.coordinate());
        (first, last)
    }

    // ---- topology bookkeeping ----

    /// Recompute the zone layout, keeping assembled zones whose members are
    /// unchanged.
    fn repartition(&mut self) {
        let bounds = boundaries(&self.blocks);
        let mut old = std::mem::take(&mut self.slots);
        for pair in bounds.windows(2) {
            let (first, last) = (pair[0], pair[1]);
            let left = self.blocks[first].label().to_string();
            let right = self.blocks[last].label().to_string();
            let kept = old
                .iter()
                .position(|s| s.left == left && s.right == right && s.last - s.first == last - first)
                .and_then(|at| old.swap_remove(at).zone)
                .map(|mut zone| {
                    zone.relocate(first);
                    zone
                });
            self.slots.push(ZoneSlot {
                left,
                right,
                first,
                last,
                zone: kept,
            });
        }
    }

    /// Drop the assembled zones containing `index`.
    fn invalidate(&mut self, index: usize) {
        for slot in self.slots.iter_mut().filter(|s| s.contains(index)) {
            if slot.zone.take().is_some() {
                tracing::trace!(zone = %slot.name(), "zone invalidated");
            }
        }
    }

    fn invalidate_all(&mut self) {
        for slot in &mut self.slots {
            slot.zone = None;
        }
    }

    /// Index of the main-line block that is or contains `label`.
    fn owner(&self, label: &str) -> NetworkResult<usize> {
        self.blocks
            .iter()
            .position(|b| b.find(label).is_some())
            .ok_or_else(|| NetworkError::UnknownLabel {
                label: label.to_string(),
            })
    }

    // ---- load stream ----

    /// Place a new load and return its label.
    ///
    /// Loads on a branch track go into that branch's container.
    pub fn add_load(&mut self, params: LoadParams<T>) -> NetworkResult<String> {
        let branch = params.track.branch;
        if branch == 0 {
            let (start, end) = self.fed_span();
            if !(start..=end).contains(&params.coordinate) {
                return Err(NetworkError::OutOfRange {
                    coordinate: params.coordinate,
                    start,
                    end,
                });
            }
        }
        let block = Block::from_spec(BlockSpec::new(BlockParams::Load(params)), &mut self.ctx)?;
        let label = block.label().to_string();

        if branch == 0 {
            self.blocks.push(block);
            order(&mut self.blocks)?;
            self.repartition();
            let at = self.owner(&label)?;
            self.invalidate(at);
        } else {
            let at = self
                .blocks
                .iter()
                .position(|b| b.as_branch().is_some_and(|br| br.index() == branch))
                .ok_or_else(|| NetworkError::Ordering {
                    what: format!("no branch {branch} for load '{label}'"),
                })?;
            if let Some(container) = self.blocks[at].as_branch_mut() {
                container.insert(block)?;
            }
            self.invalidate(at);
        }
        tracing::debug!(load = %label, "load added");
        Ok(label)
    }

    /// Remove a load by label.
    pub fn remove_load(&mut self, label: &str) -> NetworkResult<()> {
        let at = self.owner(label)?;
        if self.block(label).map(|b| b.kind()) != Some(BlockKind::Load) {
            return Err(NetworkError::NotALoad {
                label: label.to_string(),
            });
        }
        if self.blocks[at].label() == label {
            self.blocks.remove(at);
            self.repartition();
            self.invalidate(at);
        } else {
            if let Some(container) = self.blocks[at].as_branch_mut() {
                container.remove(label);
            }
            self.invalidate(at);
        }
        Ok(())
    }

    /// Remove every load, nested ones included.
    pub fn clear_loads(&mut self) {
        self.blocks.retain(|b| b.kind() != BlockKind::Load);
        for block in &mut self.blocks {
            let Some(container) = block.as_branch_mut() else {
                continue;
            };
            let loads: Vec<String> = container
                .blocks()
                .iter()
                .filter(|b| b.kind() == BlockKind::Load)
                .map(|b| b.label().to_string())
                .collect();
            for label in loads {
                container.remove(&label);
            }
        }
        self.repartition();
        self.invalidate_all();
    }

    /// Apply a state record to the block labelled `label`.
    ///
    /// Load records only change sources; every other record changes
    /// impedances and forces the owning zones to be reassembled.
    pub fn update_state(&mut self, label: &str, record: &StateRecord) -> NetworkResult<()> {
        let at = self.owner(label)?;
        let block = self.blocks[at]
            .find_mut(label)
            .ok_or_else(|| NetworkError::UnknownLabel {
                label: label.to_string(),
            })?;
        block.update_state(record)?;
        if record.kind() != BlockKind::Load {
            self.invalidate(at);
        }
        Ok(())
    }

    pub fn state_record(&self, label: &str) -> NetworkResult<StateRecord> {
        self.block(label)
            .map(|b| b.state_record())
            .ok_or_else(|| NetworkError::UnknownLabel {
                label: label.to_string(),
            })
    }

    // ---- solving ----

    /// Assemble every zone that is not assembled.
    fn ensure_zones(&mut self) -> NetworkResult<()> {
        let blocks = &self.blocks;
        let range = &self.range;
        let sentinels = self.sentinels;
        self.slots
            .par_iter_mut()
            .filter(|slot| slot.zone.is_none())
            .try_for_each(|slot| -> NetworkResult<()> {
                let zone = Zone::assemble(blocks, slot.first, slot.last, range, sentinels)?;
                tracing::debug!(zone = %zone.name(), "zone assembled");
                slot.zone = Some(zone);
                Ok(())
            })
    }

    /// Refresh, solve and collect every zone once.
    fn sweep(&mut self) -> NetworkResult<()> {
        self.ensure_zones()?;
        let blocks = &self.blocks;
        self.slots
            .par_iter_mut()
            .filter_map(|slot| slot.zone.as_mut())
            .try_for_each(|zone| -> NetworkResult<()> {
                zone.refresh(blocks)?;
                zone.solve()?;
                Ok(())
            })?;
        for zone in self.slots.iter().filter_map(|s| s.zone.as_ref()) {
            zone.collect_into(&mut self.blocks)?;
        }
        Ok(())
    }

    /// Feeder totals of the two shoulders facing into each zone.
    fn boundary_totals(&self) -> Vec<[T; 4]> {
        self.slots
            .iter()
            .map(|slot| {
                let facing = |index: usize, side: Side| {
                    self.blocks[index]
                        .as_substation()
                        .map_or((T::nil(), T::nil()), |s| s.shoulder(side).totals())
                };
                let (lc, ls) = facing(slot.first, Side::Right);
                let (rc, rs) = facing(slot.last, Side::Left);
                [lc, ls, rc, rs]
            })
            .collect()
    }

    /// Re-phase every load towards its node voltage; counts per zone.
    fn align_loads(&mut self) -> Vec<usize> {
        let tolerance = self.config.phase_tolerance_rad();
        let mut counts = vec![0; self.slots.len()];
        for (slot, count) in self.slots.iter().zip(counts.iter_mut()) {
            for block in &mut self.blocks[slot.first + 1..slot.last] {
                block.for_each_load_mut(&mut |load| {
                    if load.align_phase(tolerance).is_some() {
                        *count += 1;
                    }
                });
            }
        }
        counts
    }

    fn exchange(&mut self) {
        for block in &mut self.blocks {
            if let Some(substation) = block.as_substation_mut() {
                substation.exchange();
            }
        }
    }

    /// Outer loop shared by both systems: solve, then repeatedly rotate
    /// loads (AC only), exchange boundary currents and re-solve until the
    /// shoulder totals settle or the iteration cap is hit.
    fn iterate(&mut self, rephase: bool, tolerance: Real) -> NetworkResult<(usize, Vec<ZoneReport>)> {
        self.sweep()?;
        let mut previous = self.boundary_totals();
        let mut reports = Vec::new();
        for iteration in 1..=self.config.max_iterations {
            let rephased = if rephase {
                self.align_loads()
            } else {
                vec![0; self.slots.len()]
            };
            self.exchange();
            self.sweep()?;
            let current = self.boundary_totals();

            reports = self
                .slots
                .iter()
                .zip(previous.iter().zip(&current))
                .zip(&rephased)
                .map(|((slot, (before, after)), &rephased)| {
                    let max_delta = before
                        .iter()
                        .zip(after)
                        .map(|(a, b)| (*b - *a).modulus())
                        .fold(0.0, Real::max);
                    let convergence = if max_delta > tolerance {
                        Convergence::NotConverged {
                            reason: format!(
                                "boundary current moved {max_delta:.3} A (tolerance {tolerance} A)"
                            ),
                        }
                    } else if rephased > 0 {
                        Convergence::NotConverged {
                            reason: format!("{rephased} load(s) still re-phasing"),
                        }
                    } else {
                        Convergence::Converged
                    };
                    ZoneReport {
                        name: slot.name(),
                        convergence,
                        max_delta,
                        rephased,
                    }
                })
                .collect();
            previous = current;

            let settled = reports.iter().all(|r| r.convergence.is_converged());
            tracing::debug!(iteration, settled, "outer iteration");
            if settled {
                return Ok((iteration, reports));
            }
        }
        tracing::warn!(
            network = %self.name,
            iterations = self.config.max_iterations,
            "outer iteration did not converge"
        );
        Ok((self.config.max_iterations, reports))
    }

    /// Solve the whole network.
    ///
    /// AC networks align load phases and exchange shoulder currents; DC
    /// networks exchange boundary currents and afterwards engage boosters,
    /// re-solving once more if any engaged. Non-convergence is reported, not
    /// raised.
    pub fn solve(&mut self) -> NetworkResult<SolveReport> {
        let substations = boundaries(&self.blocks);
        let (iterations, zones, boosted) = match T::KIND {
            SystemKind::Ac => {
                let tolerance = amps_of(self.config.ac_current_tolerance);
                let (n, zones) = self.iterate(true, tolerance)?;
                (n, zones, Vec::new())
            }
            SystemKind::Dc => {
                let tolerance = amps_of(self.config.dc_current_tolerance);
                for &i in &substations {
                    let reset = match self.blocks[i].as_substation_mut() {
                        Some(s) => s.reset_booster()?,
                        None => false,
                    };
                    if reset {
                        self.invalidate(i);
                    }
                }
                let (mut n, mut zones) = self.iterate(false, tolerance)?;

                let mut boosted = Vec::new();
                for &i in &substations {
                    let engaged = match self.blocks[i].as_substation_mut() {
                        Some(s) => s.evaluate_booster()?,
                        None => false,
                    };
                    if engaged {
                        boosted.push(self.blocks[i].label().to_string());
                        self.invalidate(i);
                    }
                }
                if !boosted.is_empty() {
                    let (more, again) = self.iterate(false, tolerance)?;
                    n += more;
                    zones = again;
                }
                (n, zones, boosted)
            }
        };

        let report = SolveReport {
            system: T::KIND,
            iterations,
            zones,
            boosted,
        };
        tracing::info!(
            network = %self.name,
            iterations = report.iterations,
            converged = report.converged(),
            "network solved"
        );
        Ok(report)
    }

    // ---- results ----

    /// Solution records of every block in line order, nested ones included.
    pub fn solutions(&self) -> Vec<BlockSolution> {
        self.blocks.iter().flat_map(|b| b.solutions()).collect()
    }

    pub fn compact(&self) -> CompactSummary {
        let mut summary = CompactSummary::default();
        for block in &self.blocks {
            block.compact_into(&mut summary);
        }
        summary
    }
}
