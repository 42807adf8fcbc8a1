//! TaskRecord - the engine-maintained, mutable wrapper around a Task.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, TaskId, Timestamp, ValidationError};

use super::{ErrorKind, ExecutionTarget, JsonMap, Task, TaskError, TaskOutput};

/// Task lifecycle status.
///
/// Transitions are monotone: `pending -> running -> completed | failed`,
/// with `pending -> failed` for registration and binding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StateMachine for TaskStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TaskStatus::*;
        matches!(
            (self, target),
            (Pending, Running) | (Pending, Failed) | (Running, Completed) | (Running, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TaskStatus::*;
        match self {
            Pending => vec![Running, Failed],
            Running => vec![Completed, Failed],
            Completed => vec![],
            Failed => vec![],
        }
    }
}

/// Mutable execution record for one task.
///
/// Wraps the immutable planner [`Task`] and tracks status, dispatch-time
/// resolved inputs, the terminal output, and lifecycle timestamps. The
/// full record (not a projection) is what gets serialized to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task: Task,

    pub status: TaskStatus,

    /// Literal inputs merged with values materialized from
    /// `input_bindings` immediately before dispatch.
    #[serde(default)]
    pub resolved_inputs: JsonMap,

    /// Present exactly when the status is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<TaskOutput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    pub created_at: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Set when a client-target task is handed to the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emitted_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_received_at: Option<Timestamp>,
}

impl TaskRecord {
    /// A freshly registered record waiting on its dependencies.
    pub fn pending(task: Task) -> Self {
        Self {
            task,
            status: TaskStatus::Pending,
            resolved_inputs: JsonMap::new(),
            output: None,
            error: None,
            error_kind: None,
            created_at: Timestamp::now(),
            started_at: None,
            completed_at: None,
            duration_ms: None,
            emitted_at: None,
            ack_received_at: None,
        }
    }

    /// A record that failed validation at registration and will never be
    /// dispatched. The full task is still stored for inspection.
    pub fn failed_at_registration(task: Task, error: &TaskError) -> Self {
        let now = Timestamp::now();
        Self {
            task,
            status: TaskStatus::Failed,
            resolved_inputs: JsonMap::new(),
            output: Some(TaskOutput::failure(error.to_string())),
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            created_at: now,
            started_at: None,
            completed_at: Some(now),
            duration_ms: None,
            emitted_at: None,
            ack_received_at: None,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task.task_id
    }

    pub fn tool(&self) -> &str {
        &self.task.tool
    }

    pub fn target(&self) -> ExecutionTarget {
        self.task.execution_target
    }

    pub fn depends_on(&self) -> &[TaskId] {
        &self.task.depends_on
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition to running (server dispatch).
    pub fn start(&mut self) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(TaskStatus::Running)?;
        self.started_at = Some(Timestamp::now());
        Ok(())
    }

    /// Transition to running and stamp the emission instant (client
    /// dispatch goes through the transport rather than an executor).
    pub fn emit(&mut self) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(TaskStatus::Running)?;
        let now = Timestamp::now();
        self.started_at = Some(now);
        self.emitted_at = Some(now);
        Ok(())
    }

    /// Transition to completed with the producing output.
    pub fn complete(&mut self, output: TaskOutput) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(TaskStatus::Completed)?;
        let now = Timestamp::now();
        self.completed_at = Some(now);
        if let Some(started) = self.started_at {
            self.duration_ms = Some(now.millis_since(&started));
        }
        self.output = Some(output);
        Ok(())
    }

    /// Transition to failed, recording the error and synthesizing a
    /// failure output so terminal records always carry one.
    pub fn fail(&mut self, error: &TaskError) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(TaskStatus::Failed)?;
        let now = Timestamp::now();
        self.completed_at = Some(now);
        if let Some(started) = self.started_at {
            self.duration_ms = Some(now.millis_since(&started));
        }
        self.error = Some(error.to_string());
        self.error_kind = Some(error.kind());
        if self.output.is_none() {
            self.output = Some(TaskOutput::failure(error.to_string()));
        }
        Ok(())
    }

    /// Stamp receipt of a client acknowledgment.
    pub fn acknowledge(&mut self) {
        self.ack_received_at = Some(Timestamp::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::TaskId;
    use serde_json::json;

    fn sample_task() -> Task {
        Task::new(
            TaskId::new("search0").unwrap(),
            "web_search",
            ExecutionTarget::Server,
        )
        .with_input("query", json!("today gold price"))
    }

    #[test]
    fn pending_record_has_no_timestamps_beyond_creation() {
        let record = TaskRecord::pending(sample_task());

        assert_eq!(record.status, TaskStatus::Pending);
        assert!(record.started_at.is_none());
        assert!(record.completed_at.is_none());
        assert!(record.output.is_none());
    }

    #[test]
    fn start_then_complete_stamps_duration() {
        let mut record = TaskRecord::pending(sample_task());

        record.start().unwrap();
        assert_eq!(record.status, TaskStatus::Running);
        assert!(record.started_at.is_some());

        record.complete(TaskOutput::success(JsonMap::new())).unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert!(record.completed_at.is_some());
        assert!(record.duration_ms.is_some());
        assert!(record.started_at.unwrap() <= record.completed_at.unwrap());
    }

    #[test]
    fn fail_synthesizes_output_when_none_present() {
        let mut record = TaskRecord::pending(sample_task());
        record.start().unwrap();
        record.fail(&TaskError::execution("adapter raised")).unwrap();

        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error_kind, Some(ErrorKind::Execution));
        let output = record.output.unwrap();
        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("adapter raised"));
    }

    #[test]
    fn terminal_record_rejects_further_transitions() {
        let mut record = TaskRecord::pending(sample_task());
        record.start().unwrap();
        record.complete(TaskOutput::success(JsonMap::new())).unwrap();

        assert!(record.start().is_err());
        assert!(record.fail(&TaskError::execution("late")).is_err());
        assert_eq!(record.status, TaskStatus::Completed);
    }

    #[test]
    fn completed_record_rejects_completion_from_pending() {
        let mut record = TaskRecord::pending(sample_task());
        assert!(record.complete(TaskOutput::success(JsonMap::new())).is_err());
        assert_eq!(record.status, TaskStatus::Pending);
    }

    #[test]
    fn emit_stamps_emission_and_start_together() {
        let task = Task::new(
            TaskId::new("create_file").unwrap(),
            "file_create",
            ExecutionTarget::Client,
        );
        let mut record = TaskRecord::pending(task);
        record.emit().unwrap();

        assert_eq!(record.status, TaskStatus::Running);
        assert_eq!(record.started_at, record.emitted_at);
    }

    #[test]
    fn failed_at_registration_is_terminal_with_validation_kind() {
        let record =
            TaskRecord::failed_at_registration(sample_task(), &TaskError::unknown_tool("web_search"));

        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("tool 'web_search' not found"));
        assert_eq!(record.error_kind, Some(ErrorKind::Validation));
        assert!(record.output.is_some());
    }

    #[test]
    fn record_serde_round_trip_preserves_recognized_fields() {
        let mut record = TaskRecord::pending(
            sample_task().with_binding("content", "$.search0.output.data.total_results"),
        );
        record.start().unwrap();
        let mut data = JsonMap::new();
        data.insert("total_results".into(), json!(7));
        record.complete(TaskOutput::success(data)).unwrap();

        let json = serde_json::to_string(&record).unwrap();
        let back: TaskRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.task_id(), record.task_id());
        assert_eq!(back.status, TaskStatus::Completed);
        assert_eq!(back.task.input_bindings, record.task.input_bindings);
        assert_eq!(back.output, record.output);
        assert_eq!(back.started_at, record.started_at);
        assert_eq!(back.duration_ms, record.duration_ms);
    }

    #[test]
    fn status_monotone_under_state_machine() {
        use crate::domain::foundation::StateMachine;
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.can_transition_to(&TaskStatus::Completed));
        assert!(!TaskStatus::Running.can_transition_to(&TaskStatus::Pending));
    }

    proptest::proptest! {
        /// Whatever sequence of marks arrives, a terminal status never
        /// changes again.
        #[test]
        fn status_never_leaves_a_terminal_state(ops in proptest::collection::vec(0u8..3, 1..12)) {
            let mut record = TaskRecord::pending(sample_task());
            let mut terminal: Option<TaskStatus> = None;

            for op in ops {
                let _ = match op {
                    0 => record.start(),
                    1 => record.complete(TaskOutput::success(JsonMap::new())),
                    _ => record.fail(&TaskError::execution("boom")),
                };
                match terminal {
                    Some(status) => proptest::prop_assert_eq!(record.status, status),
                    None if record.is_terminal() => terminal = Some(record.status),
                    None => {}
                }
            }
        }
    }
}
