//! Fault-tolerant architecture evaluation
//!
//! A system is a DAG of modules, each with a catalog of hardware and software
//! variants. A candidate picks a redundancy scheme and a variant selection
//! for every module; evaluating it yields interval-valued reliability, cost
//! and execution time, and a task graph for an external scheduler.

pub mod domain;
pub use domain::{
    Assignment, Component, GenerationParams, Interval, Link, ModuleConfig, Schedule, Scheme,
    SchemeKind, SystemEvaluation, SystemGraph,
};

/// Loading and saving systems and candidates.
pub mod storage;
