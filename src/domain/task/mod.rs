//! Task domain - the planner-produced DAG and its execution state.
//!
//! A planner batch is a set of [`Task`] documents forming a DAG via
//! `depends_on`. The engine wraps each in a [`TaskRecord`] that tracks
//! status, resolved inputs, output, and lifecycle timestamps inside a
//! per-user [`ExecutionState`].

mod binding;
mod chain;
mod error;
mod output;
mod record;
mod state;
mod task;

pub use binding::{resolve_inputs, resolve_inputs_deferring, BindingRef};
pub use chain::group_chains;
pub use error::{ErrorKind, TaskError};
pub use output::TaskOutput;
pub use record::{TaskRecord, TaskStatus};
pub use state::{ExecutionState, ExecutionSummary};
pub use task::{ExecutionTarget, LifecycleMessages, OnFailurePolicy, Task, TaskControl};

/// Schemaless JSON object used for task inputs and tool output data.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
