// Scheduler-facing output.
//
// Task and processor names are a contract with the external scheduler:
// `t{n}`/`p{n}` for single-task modules, `t{n}_{suffix}`/`p{n}_{i}` for
// expanded ones.

use serde::{Deserialize, Serialize};

/// Phase ordinal of a task that receives the module's input.
pub const FAN_OUT: u8 = 0;
/// Phase ordinal of a task doing the module's work.
pub const WORK: u8 = 1;
/// Phase ordinal of a task that emits the module's output.
pub const FAN_IN: u8 = 2;

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task name.
    pub name: String,
    /// Duration.
    pub duration: u64,
    /// Processor group the task runs on.
    pub processor: String,
    /// Phase ordinal within the processor group.
    pub ordinal: u8,
}

/// A precedence constraint between two tasks carrying data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLink {
    /// Source task name.
    pub src: String,
    /// Destination task name.
    pub dst: String,
    /// Volume of data transferred.
    pub volume: u64,
}

/// Tasks and links accumulated from every module of a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Tasks, in the order they were emitted.
    pub tasks: Vec<Task>,
    /// Links, in the order they were emitted.
    pub links: Vec<TaskLink>,
}

impl Schedule {
    /// Appends a task.
    pub fn push_task(
        &mut self,
        name: String,
        duration: u64,
        processor: String,
        ordinal: u8,
    ) {
        self.tasks.push(Task {
            name,
            duration,
            processor,
            ordinal,
        });
    }

    /// Appends a link.
    pub fn push_link(&mut self, src: String, dst: String, volume: u64) {
        self.links.push(TaskLink { src, dst, volume });
    }

    /// Appends the single task `t{module}` on `p{module}`.
    pub fn push_single(&mut self, module: usize, duration: u64) {
        self.push_task(task_name(module), duration, processor_name(module), FAN_OUT);
    }
}

pub(crate) fn task_name(module: usize) -> String {
    format!("t{module}")
}

pub(crate) fn processor_name(module: usize) -> String {
    format!("p{module}")
}

pub(crate) fn sub_task_name(module: usize, suffix: impl std::fmt::Display) -> String {
    format!("t{module}_{suffix}")
}

pub(crate) fn sub_processor_name(module: usize, index: usize) -> String {
    format!("p{module}_{index}")
}
