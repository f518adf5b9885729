//! Catalog entries for system positions.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Component, GenerationParams, Interval, SchemeKind};

/// Fault-model probability bounds shared by the redundancy schemes of a
/// module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultModel {
    /// Probability that a recovery attempt is valid.
    pub qrv: Interval,
    /// Probability that a fault is detected.
    pub qd: Interval,
    /// Probability that reconfiguration is accepted.
    pub qall: Interval,
}

impl Default for FaultModel {
    fn default() -> Self {
        Self {
            qrv: Interval::point(1.0),
            qd: Interval::point(1.0),
            qall: Interval::point(1.0),
        }
    }
}

/// Fixed overhead durations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overheads {
    /// Duration of a vote.
    pub vote: u64,
    /// Duration of an acceptance test.
    pub test: u64,
    /// Duration of a recovery.
    pub recovery: u64,
}

/// Errors raised while building a [`ModuleConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The module has no hardware variants.
    #[error("module {0} has no hardware variants")]
    NoHardware(usize),
    /// The module has no software variants.
    #[error("module {0} has no software variants")]
    NoSoftware(usize),
    /// Two variants of the same kind share an identifier.
    #[error("module {module} declares {kind} variant {num} more than once")]
    DuplicateVariant {
        /// The module number.
        module: usize,
        /// `"hw"` or `"sw"`.
        kind: &'static str,
        /// The repeated identifier.
        num: u32,
    },
    /// The execution-time matrix is not software × hardware.
    #[error("module {module} time matrix must be {rows}x{columns}")]
    TimeMatrixShape {
        /// The module number.
        module: usize,
        /// Expected rows (software variants).
        rows: usize,
        /// Expected columns (hardware variants).
        columns: usize,
    },
}

/// Graph-derived data, filled in by [`SystemGraph`](crate::SystemGraph).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Derived {
    pub(crate) predecessors: BTreeSet<usize>,
    pub(crate) successors: Vec<(usize, u64)>,
    pub(crate) dependencies: BTreeSet<usize>,
    pub(crate) input: u64,
    pub(crate) output: u64,
    pub(crate) min_time: u64,
    pub(crate) max_time: u64,
}

/// Catalog entry for one system position.
///
/// Hardware and software variants are sorted by their declared identifier
/// once, at construction. Every selection made afterwards refers to a
/// variant by its *position* in these sorted lists, never by identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleConfig {
    num: usize,
    hardware: Vec<Component>,
    software: Vec<Component>,
    /// `times[s][h]`: execution time of software `s` on hardware `h`.
    times: Vec<Vec<u64>>,
    /// Fault-model bounds.
    pub fault: FaultModel,
    /// Vote/test/recovery overheads.
    pub overheads: Overheads,
    /// Reconfiguration pool key.
    pub zone: Option<u32>,
    /// Deadline for the module's completion, if any.
    pub deadline: Option<u64>,
    schemes: Vec<SchemeKind>,
    pub(crate) derived: Derived,
}

impl ModuleConfig {
    /// Creates a catalog entry.
    ///
    /// Both variant lists are sorted by identifier. `times` must have one row
    /// per software variant and one column per hardware variant, indexed by
    /// the positions of the variants *after* sorting.
    ///
    /// # Errors
    ///
    /// Returns an error if either variant list is empty, contains a repeated
    /// identifier, or if `times` has the wrong shape.
    pub fn new(
        num: usize,
        mut hardware: Vec<Component>,
        mut software: Vec<Component>,
        times: Vec<Vec<u64>>,
    ) -> Result<Self, CatalogError> {
        if hardware.is_empty() {
            return Err(CatalogError::NoHardware(num));
        }
        if software.is_empty() {
            return Err(CatalogError::NoSoftware(num));
        }

        hardware.sort_by_key(|component| component.num);
        software.sort_by_key(|component| component.num);
        check_unique(num, "hw", &hardware)?;
        check_unique(num, "sw", &software)?;

        if times.len() != software.len() || times.iter().any(|row| row.len() != hardware.len()) {
            return Err(CatalogError::TimeMatrixShape {
                module: num,
                rows: software.len(),
                columns: hardware.len(),
            });
        }

        Ok(Self {
            num,
            hardware,
            software,
            times,
            fault: FaultModel::default(),
            overheads: Overheads::default(),
            zone: None,
            deadline: None,
            schemes: Vec::new(),
            derived: Derived::default(),
        })
    }

    /// Sets the fault model.
    #[must_use]
    pub const fn with_fault_model(mut self, fault: FaultModel) -> Self {
        self.fault = fault;
        self
    }

    /// Sets the overhead durations.
    #[must_use]
    pub const fn with_overheads(mut self, overheads: Overheads) -> Self {
        self.overheads = overheads;
        self
    }

    /// Sets the reconfiguration zone.
    #[must_use]
    pub const fn with_zone(mut self, zone: Option<u32>) -> Self {
        self.zone = zone;
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<u64>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Sets the applicable schemes. Repeated kinds are dropped.
    #[must_use]
    pub fn with_schemes(mut self, schemes: impl IntoIterator<Item = SchemeKind>) -> Self {
        self.schemes.clear();
        for kind in schemes {
            if !self.schemes.contains(&kind) {
                self.schemes.push(kind);
            }
        }
        self
    }

    /// Draws a random catalog entry.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` asks for zero hardware or software
    /// variants.
    pub fn generate<R: Rng + ?Sized>(
        num: usize,
        params: &GenerationParams,
        rng: &mut R,
    ) -> Result<Self, CatalogError> {
        let software: Vec<_> = (0..params.software_variants)
            .map(|i| Component::generate(variant_id(i), params, rng))
            .collect();
        let hardware: Vec<_> = (0..params.hardware_variants)
            .map(|i| Component::generate(variant_id(i), params, rng))
            .collect();

        let (min_time, max_time) = if params.min_time <= params.max_time {
            (params.min_time, params.max_time)
        } else {
            (params.max_time, params.min_time)
        };
        let times = (0..software.len())
            .map(|_| {
                (0..hardware.len())
                    .map(|_| rng.gen_range(min_time..=max_time))
                    .collect()
            })
            .collect();

        Ok(Self::new(num, hardware, software, times)?
            .with_fault_model(params.fault)
            .with_overheads(params.overheads)
            .with_zone(params.zone)
            .with_schemes(params.schemes.iter().copied()))
    }

    /// Position of the module in the system.
    #[must_use]
    pub const fn num(&self) -> usize {
        self.num
    }

    /// Hardware variants, sorted by identifier.
    #[must_use]
    pub fn hardware(&self) -> &[Component] {
        &self.hardware
    }

    /// Software variants, sorted by identifier.
    #[must_use]
    pub fn software(&self) -> &[Component] {
        &self.software
    }

    /// The execution-time matrix, `[software][hardware]`.
    #[must_use]
    pub fn times(&self) -> &[Vec<u64>] {
        &self.times
    }

    /// Execution time of software position `sw` on hardware position `hw`.
    ///
    /// # Panics
    ///
    /// Panics if either position is out of bounds.
    #[must_use]
    pub fn time(&self, sw: usize, hw: usize) -> u64 {
        self.times[sw][hw]
    }

    /// Declared schemes, in declaration order.
    #[must_use]
    pub fn schemes(&self) -> &[SchemeKind] {
        &self.schemes
    }

    /// Whether `kind` is declared for this module.
    #[must_use]
    pub fn declares(&self, kind: SchemeKind) -> bool {
        self.schemes.contains(&kind)
    }

    /// Direct predecessors.
    #[must_use]
    pub const fn predecessors(&self) -> &BTreeSet<usize> {
        &self.derived.predecessors
    }

    /// Direct successors with the volume sent to each.
    #[must_use]
    pub fn successors(&self) -> &[(usize, u64)] {
        &self.derived.successors
    }

    /// Transitive predecessors.
    #[must_use]
    pub const fn dependencies(&self) -> &BTreeSet<usize> {
        &self.derived.dependencies
    }

    /// Total volume received from predecessors.
    #[must_use]
    pub const fn input(&self) -> u64 {
        self.derived.input
    }

    /// Total volume sent to successors.
    #[must_use]
    pub const fn output(&self) -> u64 {
        self.derived.output
    }

    /// Propagated earliest completion time.
    #[must_use]
    pub const fn min_time(&self) -> u64 {
        self.derived.min_time
    }

    /// Propagated latest completion time.
    #[must_use]
    pub const fn max_time(&self) -> u64 {
        self.derived.max_time
    }

    /// Number of distinct valid selections for `kind`.
    ///
    /// Software variants within one selection are mutually distinct,
    /// hardware variants need not be.
    #[must_use]
    pub fn variant_count(&self, kind: SchemeKind) -> u64 {
        let h = self.hardware.len() as u64;
        let s = self.software.len() as u64;
        match kind {
            SchemeKind::Simplex | SchemeKind::HardwareReconfiguration => h * s,
            SchemeKind::NvpSingle => h * binomial(s, 3),
            SchemeKind::NvpTriple => h.pow(3) * binomial(s, 3),
            SchemeKind::RecoveryBlock => h.pow(2) * binomial(s, 2),
        }
    }

    /// Size of the module's design space: the variant counts of all declared
    /// schemes, summed.
    #[must_use]
    pub fn total_variant_count(&self) -> u64 {
        self.schemes
            .iter()
            .map(|&kind| self.variant_count(kind))
            .sum()
    }

    /// Minimum and approximate maximum execution time.
    ///
    /// The minimum is the fastest cell of the time matrix. The maximum takes
    /// the slowest cell and assumes the heavier of the two structural
    /// overheads (two runs plus tests and recovery, or three runs plus
    /// votes), whatever the declared schemes are. It is a loose bound.
    #[must_use]
    pub fn time_interval(&self) -> (u64, u64) {
        let cells = || self.times.iter().flatten().copied();
        let fastest = cells().min().unwrap_or_default();
        let slowest = cells().max().unwrap_or_default();
        let Overheads {
            vote,
            test,
            recovery,
        } = self.overheads;

        let maximum = (2 * slowest + 2 * test + recovery).max(3 * slowest + 3 * vote);
        (fastest, maximum)
    }

    /// Minimum and maximum cost over the declared schemes.
    #[must_use]
    pub fn cost_interval(&self) -> (u64, u64) {
        let cheapest_hw = self.hardware.iter().map(|c| c.cost).min().unwrap_or_default();
        let dearest_hw = self.hardware.iter().map(|c| c.cost).max().unwrap_or_default();
        let cheapest_sw = self.software.iter().map(|c| c.cost).min().unwrap_or_default();

        let mut sw_costs: Vec<u64> = self.software.iter().map(|c| c.cost).collect();
        sw_costs.sort_unstable_by(|a, b| b.cmp(a));
        let dearest_sw = |n: usize| -> u64 { sw_costs.iter().take(n).sum() };

        let maximum = self
            .schemes
            .iter()
            .map(|kind| match kind {
                SchemeKind::NvpTriple => dearest_sw(3) + 3 * dearest_hw,
                SchemeKind::RecoveryBlock => 2 * dearest_sw(2) + 2 * dearest_hw,
                SchemeKind::NvpSingle => dearest_sw(3) + dearest_hw,
                SchemeKind::Simplex | SchemeKind::HardwareReconfiguration => {
                    dearest_sw(1) + dearest_hw
                }
            })
            .max()
            .unwrap_or_default();

        (cheapest_sw + cheapest_hw, maximum)
    }
}

fn check_unique(module: usize, kind: &'static str, sorted: &[Component]) -> Result<(), CatalogError> {
    sorted
        .windows(2)
        .find(|pair| pair[0].num == pair[1].num)
        .map_or(Ok(()), |pair| {
            Err(CatalogError::DuplicateVariant {
                module,
                kind,
                num: pair[0].num,
            })
        })
}

fn variant_id(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

/// `C(n, k)`, zero when `k > n`.
fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}
