//! Task - the immutable planner-produced document.
//!
//! Tasks arrive as one batch per planning cycle. Each names a tool, an
//! execution target (server or client), its dependencies within the batch,
//! literal inputs, and optional input bindings that copy data out of a
//! prior task's output at dispatch time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::TaskId;

use super::JsonMap;

/// Where a task executes: in-process on the server, or on the user's
/// connected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionTarget {
    Server,
    Client,
}

/// Human-readable strings surfaced to the user-facing layer when the
/// corresponding transition occurs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleMessages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_start: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<String>,
}

/// What the client should do when a task in an emitted chain fails.
///
/// Advisory metadata for the client orchestrator; the server-side engine
/// never aborts a user's DAG on a single failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailurePolicy {
    Abort,
    #[default]
    Continue,
}

/// Per-task execution controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskControl {
    /// Bound on server-side execution; expiry fails the task with a
    /// timeout error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub on_failure: OnFailurePolicy,
}

/// Immutable task document as produced by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,

    /// Symbolic tool name; validated against the tool catalog at
    /// registration.
    pub tool: String,

    pub execution_target: ExecutionTarget,

    /// Ids of tasks within the same batch that must complete first.
    #[serde(default)]
    pub depends_on: Vec<TaskId>,

    /// Literal parameter values.
    #[serde(default)]
    pub inputs: JsonMap,

    /// Parameter name to reference expression
    /// (`$.<task_id>.output.data.<field>[.<field>...]`). BTreeMap keeps
    /// resolution order deterministic.
    #[serde(default)]
    pub input_bindings: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_messages: Option<LifecycleMessages>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<TaskControl>,
}

impl Task {
    /// Creates a task with no dependencies, inputs, or bindings.
    pub fn new(task_id: TaskId, tool: impl Into<String>, execution_target: ExecutionTarget) -> Self {
        Self {
            task_id,
            tool: tool.into(),
            execution_target,
            depends_on: Vec::new(),
            inputs: JsonMap::new(),
            input_bindings: BTreeMap::new(),
            lifecycle_messages: None,
            control: None,
        }
    }

    /// Adds a dependency on another task in the same batch.
    pub fn with_dependency(mut self, task_id: TaskId) -> Self {
        self.depends_on.push(task_id);
        self
    }

    /// Adds a literal input value.
    pub fn with_input(mut self, param: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(param.into(), value);
        self
    }

    /// Adds an input binding (reference expression).
    pub fn with_binding(mut self, param: impl Into<String>, reference: impl Into<String>) -> Self {
        self.input_bindings.insert(param.into(), reference.into());
        self
    }

    /// Sets the lifecycle messages.
    pub fn with_lifecycle_messages(mut self, messages: LifecycleMessages) -> Self {
        self.lifecycle_messages = Some(messages);
        self
    }

    /// Sets the execution controls.
    pub fn with_control(mut self, control: TaskControl) -> Self {
        self.control = Some(control);
        self
    }

    /// Server-execution timeout, if configured.
    pub fn timeout_ms(&self) -> Option<u64> {
        self.control.as_ref().and_then(|c| c.timeout_ms)
    }

    /// The configured lifecycle message for a transition, if any.
    pub fn on_start_message(&self) -> Option<&str> {
        self.lifecycle_messages
            .as_ref()
            .and_then(|m| m.on_start.as_deref())
    }

    pub fn on_success_message(&self) -> Option<&str> {
        self.lifecycle_messages
            .as_ref()
            .and_then(|m| m.on_success.as_deref())
    }

    pub fn on_failure_message(&self) -> Option<&str> {
        self.lifecycle_messages
            .as_ref()
            .and_then(|m| m.on_failure.as_deref())
    }
}
