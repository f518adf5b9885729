//! Domain models for fault-tolerant architecture evaluation.
//!
//! This module contains the catalog types (components, modules, the system
//! graph), the redundancy schemes and their evaluation, and the generation
//! parameters.

mod interval;
pub use interval::{Bound, Interval, Odds};

mod component;
pub use component::Component;

pub(crate) mod module;
pub use module::{CatalogError, FaultModel, ModuleConfig, Overheads};

mod system;
pub use system::{Link, ReconfigurationMechanism, SystemError, SystemGraph};

/// Redundancy schemes and their reliability, cost and time algebra.
pub mod scheme;
pub use scheme::{
    Classification, Evaluation, Redundancy, Scheme, SchemeError, SchemeKind, UnknownSchemeError,
};

mod assignment;
pub use assignment::{Assignment, AssignmentError, SystemEvaluation, evaluate_many};

/// Scheduler-facing task graphs.
pub mod schedule;
pub use schedule::Schedule;

mod config;
pub use config::{ConfigError, GenerationParams};
