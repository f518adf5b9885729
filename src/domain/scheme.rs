//! Redundancy schemes and their reliability/cost/time algebra.
//!
//! A [`Scheme`] is one concrete variant selection for one module. Each scheme
//! kind is its own type implementing [`Redundancy`]; [`Variant`] is the sum
//! over them.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::domain::{Interval, ModuleConfig, Schedule, SystemGraph};

mod nvp;
mod reconfiguration;
mod recovery_block;
mod simplex;

pub use nvp::{NvpSingle, NvpTriple};
pub use reconfiguration::HardwareReconfiguration;
pub use recovery_block::RecoveryBlock;
pub use simplex::Simplex;

/// The kind of redundancy scheme.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SchemeKind {
    /// One hardware unit running one software version.
    #[serde(rename = "none")]
    Simplex,
    /// One hardware unit running three software versions with a vote.
    #[serde(rename = "nvp01")]
    NvpSingle,
    /// Three hardware units, each running one software version, with a vote.
    #[serde(rename = "nvp11")]
    NvpTriple,
    /// Two hardware units, each running a primary and an alternate with an
    /// acceptance test.
    #[serde(rename = "rb11")]
    RecoveryBlock,
    /// One hardware unit backed by a pool of zone peers.
    #[serde(rename = "hwrc20")]
    HardwareReconfiguration,
}

impl SchemeKind {
    /// Every kind, in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Simplex,
        Self::NvpSingle,
        Self::NvpTriple,
        Self::RecoveryBlock,
        Self::HardwareReconfiguration,
    ];

    /// The name used in documents and candidate files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Simplex => "none",
            Self::NvpSingle => "nvp01",
            Self::NvpTriple => "nvp11",
            Self::RecoveryBlock => "rb11",
            Self::HardwareReconfiguration => "hwrc20",
        }
    }

    /// Number of hardware positions a selection holds.
    #[must_use]
    pub const fn hardware_count(self) -> usize {
        match self {
            Self::Simplex | Self::NvpSingle | Self::HardwareReconfiguration => 1,
            Self::RecoveryBlock => 2,
            Self::NvpTriple => 3,
        }
    }

    /// Number of distinct software positions a selection holds.
    #[must_use]
    pub const fn software_count(self) -> usize {
        match self {
            Self::Simplex | Self::HardwareReconfiguration => 1,
            Self::RecoveryBlock => 2,
            Self::NvpSingle | Self::NvpTriple => 3,
        }
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Error returned when a scheme name is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown scheme '{0}'")]
pub struct UnknownSchemeError(pub String);

impl FromStr for SchemeKind {
    type Err = UnknownSchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownSchemeError(s.to_string()))
    }
}

/// Errors raised when a selection is invalid for its module.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemeError {
    /// The module position does not exist.
    #[error("module {0} does not exist")]
    UnknownModule(usize),
    /// Wrong number of hardware positions.
    #[error("{kind} needs {expected} hardware variant(s), got {found}")]
    HardwareCount {
        /// The scheme kind.
        kind: SchemeKind,
        /// Required count.
        expected: usize,
        /// Supplied count.
        found: usize,
    },
    /// Wrong number of software positions.
    #[error("{kind} needs {expected} software variant(s), got {found}")]
    SoftwareCount {
        /// The scheme kind.
        kind: SchemeKind,
        /// Required count.
        expected: usize,
        /// Supplied count.
        found: usize,
    },
    /// A hardware position is past the end of the catalog.
    #[error("hardware variant {index} is out of range for module {module} ({available} available)")]
    HardwareOutOfRange {
        /// The module position.
        module: usize,
        /// The offending position.
        index: usize,
        /// Catalog size.
        available: usize,
    },
    /// A software position is past the end of the catalog.
    #[error("software variant {index} is out of range for module {module} ({available} available)")]
    SoftwareOutOfRange {
        /// The module position.
        module: usize,
        /// The offending position.
        index: usize,
        /// Catalog size.
        available: usize,
    },
    /// The same software version was selected twice.
    #[error("software variant {0} selected more than once")]
    DuplicateSoftware(usize),
    /// A selection used the absent-variant sentinel.
    #[error("selection contains the absent-variant sentinel {0}")]
    AbsentVariant(i64),
    /// The catalog is too small to draw a selection.
    #[error("module {module} has {available} software variant(s), {kind} needs {required}")]
    NotEnoughSoftware {
        /// The module position.
        module: usize,
        /// The scheme kind.
        kind: SchemeKind,
        /// Required count.
        required: usize,
        /// Catalog size.
        available: usize,
    },
}

/// What an evaluation pass records about each module: its scheme kind and
/// the position of its (first) selected hardware variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// The module's scheme kind.
    pub kind: SchemeKind,
    /// Selected hardware position (the first one for multi-hardware
    /// schemes). Zone peers are judged by this unit, not by catalog
    /// position 0.
    pub hardware: usize,
}

/// Module position → scheme classification, built in one pass over a
/// candidate before any reliability is computed.
///
/// Hardware-reconfiguration reliability depends on which other modules share
/// the scheme and the zone; reading it from here instead of from the catalog
/// makes evaluation independent of construction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    tags: BTreeMap<usize, Tag>,
}

impl Classification {
    /// Records the scheme chosen for its module, replacing any earlier entry.
    pub fn insert(&mut self, scheme: &Scheme) {
        self.tags.insert(
            scheme.module(),
            Tag {
                kind: scheme.kind(),
                hardware: scheme.hardware()[0],
            },
        );
    }

    /// The tag of a module, if classified.
    #[must_use]
    pub fn get(&self, module: usize) -> Option<Tag> {
        self.tags.get(&module).copied()
    }

    /// Modules classified as hardware reconfiguration in the same zone as
    /// `module`, skipping `module` itself and everything in `excluded`.
    #[must_use]
    pub fn zone_peers(
        &self,
        system: &SystemGraph,
        module: usize,
        excluded: &BTreeSet<usize>,
    ) -> Vec<usize> {
        let Some(zone) = system.module(module).map(|m| m.zone) else {
            return Vec::new();
        };

        self.tags
            .iter()
            .filter(|(position, tag)| {
                **position != module
                    && !excluded.contains(*position)
                    && tag.kind == SchemeKind::HardwareReconfiguration
            })
            .filter(|(position, _)| system.module(**position).is_some_and(|m| m.zone == zone))
            .map(|(position, _)| *position)
            .collect()
    }

    /// Reliability of the hardware selected for a classified module.
    ///
    /// This is the unit at [`Tag::hardware`], which need not be the first
    /// variant of the module's catalog.
    #[must_use]
    pub fn hardware_reliability(&self, system: &SystemGraph, module: usize) -> Option<Interval> {
        let tag = self.get(module)?;
        system
            .module(module)?
            .hardware()
            .get(tag.hardware)
            .map(|component| component.reliability)
    }
}

impl<'a> FromIterator<&'a Scheme> for Classification {
    fn from_iter<I: IntoIterator<Item = &'a Scheme>>(iter: I) -> Self {
        let mut classification = Self::default();
        for scheme in iter {
            classification.insert(scheme);
        }
        classification
    }
}

/// Everything a reliability computation may read.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// The whole system.
    pub system: &'a SystemGraph,
    /// The module being evaluated.
    pub module: &'a ModuleConfig,
    /// Scheme classification of every module in the candidate.
    pub classification: &'a Classification,
}

/// The capability interface every scheme kind provides.
pub trait Redundancy {
    /// The scheme kind.
    fn kind(&self) -> SchemeKind;

    /// Selected hardware positions.
    fn hardware(&self) -> &[usize];

    /// Selected software positions.
    fn software(&self) -> &[usize];

    /// Reliability interval.
    fn reliability(&self, ctx: &EvaluationContext<'_>) -> Interval;

    /// Monetary cost.
    fn cost(&self, module: &ModuleConfig) -> u64;

    /// Execution time.
    fn execution_time(&self, module: &ModuleConfig) -> u64;

    /// Appends this module's tasks and links to `schedule`.
    fn schedule_fragment(&self, module: &ModuleConfig, schedule: &mut Schedule);
}

/// One selection, tagged by scheme kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Variant {
    /// See [`Simplex`].
    Simplex(Simplex),
    /// See [`NvpSingle`].
    NvpSingle(NvpSingle),
    /// See [`NvpTriple`].
    NvpTriple(NvpTriple),
    /// See [`RecoveryBlock`].
    RecoveryBlock(RecoveryBlock),
    /// See [`HardwareReconfiguration`].
    HardwareReconfiguration(HardwareReconfiguration),
}

impl Variant {
    fn as_dyn(&self) -> &dyn Redundancy {
        match self {
            Self::Simplex(inner) => inner,
            Self::NvpSingle(inner) => inner,
            Self::NvpTriple(inner) => inner,
            Self::RecoveryBlock(inner) => inner,
            Self::HardwareReconfiguration(inner) => inner,
        }
    }
}

impl Redundancy for Variant {
    fn kind(&self) -> SchemeKind {
        self.as_dyn().kind()
    }

    fn hardware(&self) -> &[usize] {
        self.as_dyn().hardware()
    }

    fn software(&self) -> &[usize] {
        self.as_dyn().software()
    }

    fn reliability(&self, ctx: &EvaluationContext<'_>) -> Interval {
        self.as_dyn().reliability(ctx)
    }

    fn cost(&self, module: &ModuleConfig) -> u64 {
        self.as_dyn().cost(module)
    }

    fn execution_time(&self, module: &ModuleConfig) -> u64 {
        self.as_dyn().execution_time(module)
    }

    fn schedule_fragment(&self, module: &ModuleConfig, schedule: &mut Schedule) {
        self.as_dyn().schedule_fragment(module, schedule);
    }
}

/// The objectives computed for one module.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    /// Module position.
    pub module: usize,
    /// Scheme kind.
    pub kind: SchemeKind,
    /// Reliability interval.
    pub reliability: Interval,
    /// Cost.
    pub cost: u64,
    /// Execution time.
    pub time: u64,
}

/// A validated variant selection for one module.
///
/// Two schemes are equal when they target the same module with the same
/// selection. Selections whose order does not matter (single-hardware NVP
/// and recovery block software) are stored in ascending order; three-hardware
/// NVP keeps its replica pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scheme {
    module: usize,
    variant: Variant,
}

impl Scheme {
    /// Builds a scheme from explicit catalog positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the module does not exist, the selection has the
    /// wrong cardinality for `kind`, a position is out of range, or a
    /// software version is repeated.
    pub fn new(
        kind: SchemeKind,
        module: usize,
        hw: &[usize],
        sw: &[usize],
        system: &SystemGraph,
    ) -> Result<Self, SchemeError> {
        let config = system
            .module(module)
            .ok_or(SchemeError::UnknownModule(module))?;

        if hw.len() != kind.hardware_count() {
            return Err(SchemeError::HardwareCount {
                kind,
                expected: kind.hardware_count(),
                found: hw.len(),
            });
        }
        if sw.len() != kind.software_count() {
            return Err(SchemeError::SoftwareCount {
                kind,
                expected: kind.software_count(),
                found: sw.len(),
            });
        }
        if let Some(&index) = hw.iter().find(|&&i| i >= config.hardware().len()) {
            return Err(SchemeError::HardwareOutOfRange {
                module,
                index,
                available: config.hardware().len(),
            });
        }
        if let Some(&index) = sw.iter().find(|&&i| i >= config.software().len()) {
            return Err(SchemeError::SoftwareOutOfRange {
                module,
                index,
                available: config.software().len(),
            });
        }
        let mut seen = BTreeSet::new();
        if let Some(&index) = sw.iter().find(|&&i| !seen.insert(i)) {
            return Err(SchemeError::DuplicateSoftware(index));
        }

        Ok(Self {
            module,
            variant: Self::build_variant(kind, hw, sw),
        })
    }

    /// Builds a scheme from signed positions, as found in candidate files.
    ///
    /// # Errors
    ///
    /// Returns [`SchemeError::AbsentVariant`] for negative positions, and
    /// otherwise anything [`Scheme::new`] returns.
    pub fn from_signed(
        kind: SchemeKind,
        module: usize,
        hw: &[i64],
        sw: &[i64],
        system: &SystemGraph,
    ) -> Result<Self, SchemeError> {
        let to_positions = |values: &[i64]| -> Result<Vec<usize>, SchemeError> {
            values
                .iter()
                .map(|&value| usize::try_from(value).map_err(|_| SchemeError::AbsentVariant(value)))
                .collect()
        };
        Self::new(kind, module, &to_positions(hw)?, &to_positions(sw)?, system)
    }

    /// Draws a random valid selection.
    ///
    /// Hardware positions are drawn independently; software positions are
    /// drawn without replacement.
    ///
    /// # Errors
    ///
    /// Returns an error if the module does not exist or has too few software
    /// variants for `kind`.
    pub fn random<R: Rng + ?Sized>(
        kind: SchemeKind,
        module: usize,
        system: &SystemGraph,
        rng: &mut R,
    ) -> Result<Self, SchemeError> {
        let config = system
            .module(module)
            .ok_or(SchemeError::UnknownModule(module))?;
        let available = config.software().len();
        let required = kind.software_count();
        if available < required {
            return Err(SchemeError::NotEnoughSoftware {
                module,
                kind,
                required,
                available,
            });
        }

        let hw: Vec<usize> = (0..kind.hardware_count())
            .map(|_| rng.gen_range(0..config.hardware().len()))
            .collect();
        let mut sw = rand::seq::index::sample(rng, available, required).into_vec();
        sw.sort_unstable();

        Self::new(kind, module, &hw, &sw, system)
    }

    fn build_variant(kind: SchemeKind, hw: &[usize], sw: &[usize]) -> Variant {
        let mut sorted = sw.to_vec();
        sorted.sort_unstable();
        match kind {
            SchemeKind::Simplex => Variant::Simplex(Simplex::new(hw[0], sw[0])),
            SchemeKind::HardwareReconfiguration => {
                Variant::HardwareReconfiguration(HardwareReconfiguration::new(hw[0], sw[0]))
            }
            SchemeKind::NvpSingle => {
                Variant::NvpSingle(NvpSingle::new(hw[0], [sorted[0], sorted[1], sorted[2]]))
            }
            SchemeKind::NvpTriple => {
                Variant::NvpTriple(NvpTriple::new([hw[0], hw[1], hw[2]], [sw[0], sw[1], sw[2]]))
            }
            SchemeKind::RecoveryBlock => {
                Variant::RecoveryBlock(RecoveryBlock::new([hw[0], hw[1]], [sorted[0], sorted[1]]))
            }
        }
    }

    /// Module position.
    #[must_use]
    pub const fn module(&self) -> usize {
        self.module
    }

    /// The tagged selection.
    #[must_use]
    pub const fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Scheme kind.
    #[must_use]
    pub fn kind(&self) -> SchemeKind {
        self.variant.kind()
    }

    /// Selected hardware positions.
    #[must_use]
    pub fn hardware(&self) -> &[usize] {
        self.variant.hardware()
    }

    /// Selected software positions.
    #[must_use]
    pub fn software(&self) -> &[usize] {
        self.variant.software()
    }

    /// Computes reliability, cost and execution time, in that order.
    ///
    /// # Panics
    ///
    /// Panics if the scheme was built against a different system with fewer
    /// modules.
    #[must_use]
    pub fn evaluate(&self, system: &SystemGraph, classification: &Classification) -> Evaluation {
        let module = self.config(system);
        let ctx = EvaluationContext {
            system,
            module,
            classification,
        };

        let reliability = self.variant.reliability(&ctx);
        let cost = self.variant.cost(module);
        let time = self.variant.execution_time(module);
        trace!(
            module = self.module,
            kind = %self.kind(),
            %reliability,
            cost,
            time,
            "evaluated module"
        );

        Evaluation {
            module: self.module,
            kind: self.kind(),
            reliability,
            cost,
            time,
        }
    }

    /// Appends this module's tasks and links to `schedule`.
    ///
    /// # Panics
    ///
    /// Panics if the scheme was built against a different system with fewer
    /// modules.
    pub fn schedule_fragment(&self, system: &SystemGraph, schedule: &mut Schedule) {
        self.variant.schedule_fragment(self.config(system), schedule);
    }

    fn config<'a>(&self, system: &'a SystemGraph) -> &'a ModuleConfig {
        system
            .module(self.module)
            .unwrap_or_else(|| panic!("module {} not found in system", self.module))
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}. {}:{:?}{:?}",
            self.module,
            self.kind(),
            self.hardware(),
            self.software()
        )
    }
}
