//! Input-binding resolution.
//!
//! A binding is a reference expression of the form
//! `$.<task_id>.output.data.<field>[.<field>...]` naming a value inside a
//! prior task's output. Resolution happens immediately before dispatch so
//! it observes the most recent outputs. A minimal hand-written parser is
//! enough here; the grammar is fixed and flat.

use std::collections::HashSet;

use serde_json::Value;

use crate::domain::foundation::{TaskId, ValidationError};

use super::{ExecutionState, JsonMap, Task, TaskError, TaskStatus};

const SENTINEL: &str = "$.";

/// Parsed reference expression: source task plus field path under
/// `output.data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRef {
    pub source: TaskId,
    pub path: Vec<String>,
}

impl BindingRef {
    /// Parses `$.<task_id>.output.data.<field>[.<field>...]`.
    pub fn parse(reference: &str) -> Result<Self, ValidationError> {
        let body = reference.strip_prefix(SENTINEL).ok_or_else(|| {
            ValidationError::invalid_format("reference", "missing '$.' sentinel")
        })?;

        let segments: Vec<&str> = body.split('.').collect();
        if segments.len() < 4 {
            return Err(ValidationError::invalid_format(
                "reference",
                "expected '$.<task_id>.output.data.<field>'",
            ));
        }
        if segments[1] != "output" || segments[2] != "data" {
            return Err(ValidationError::invalid_format(
                "reference",
                "path must go through 'output.data'",
            ));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ValidationError::invalid_format(
                "reference",
                "empty path segment",
            ));
        }

        Ok(Self {
            source: TaskId::new(segments[0])?,
            path: segments[3..].iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// Materializes a task's inputs: literal `inputs` merged with every
/// binding resolved against the current state.
///
/// Fails with a binding error if any reference is malformed, names a task
/// that is not completed, or walks a path that does not exist.
pub fn resolve_inputs(task: &Task, state: &ExecutionState) -> Result<JsonMap, TaskError> {
    resolve_inputs_deferring(task, state, &HashSet::new())
}

/// Like [`resolve_inputs`], but skips bindings whose source task is in
/// `deferred`. Used when emitting a client chain: bindings onto earlier
/// members of the same chain are resolved by the client from its local
/// outputs, so the server leaves them in place.
pub fn resolve_inputs_deferring(
    task: &Task,
    state: &ExecutionState,
    deferred: &HashSet<TaskId>,
) -> Result<JsonMap, TaskError> {
    let mut resolved = task.inputs.clone();

    for (param, reference) in &task.input_bindings {
        let binding = BindingRef::parse(reference)
            .map_err(|e| TaskError::binding(param, e.to_string()))?;

        if deferred.contains(&binding.source) {
            continue;
        }

        let record = state.task(&binding.source).ok_or_else(|| {
            TaskError::binding(param, format!("references unknown task '{}'", binding.source))
        })?;

        if record.status != TaskStatus::Completed {
            return Err(TaskError::binding(
                param,
                format!(
                    "source task '{}' is {:?}, not completed",
                    binding.source, record.status
                ),
            ));
        }

        let output = record.output.as_ref().ok_or_else(|| {
            TaskError::binding(param, format!("task '{}' has no output", binding.source))
        })?;

        let root = Value::Object(output.data.clone());
        let mut value: &Value = &root;
        for field in &binding.path {
            match value.as_object().and_then(|m| m.get(field)) {
                Some(next) => value = next,
                None => {
                    return Err(TaskError::binding(
                        param,
                        format!(
                            "field '{}' not found under '{}.output.data'",
                            field, binding.source
                        ),
                    ))
                }
            }
        }
        resolved.insert(param.clone(), value.clone());
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::task::{ExecutionTarget, TaskOutput, TaskRecord};
    use serde_json::json;

    fn task_id(id: &str) -> TaskId {
        TaskId::new(id).unwrap()
    }

    fn state_with_completed_search() -> ExecutionState {
        let mut state = ExecutionState::new(UserId::new("user-1").unwrap());
        let mut record = TaskRecord::pending(Task::new(
            task_id("search0"),
            "web_search",
            ExecutionTarget::Server,
        ));
        record.start().unwrap();
        let mut data = JsonMap::new();
        data.insert("total_results".into(), json!(7));
        data.insert(
            "stats".into(),
            json!({"search_time_ms": 4236.66, "provider": "mock"}),
        );
        record.complete(TaskOutput::success(data)).unwrap();
        state.add_task(record).unwrap();
        state
    }

    #[test]
    fn parse_accepts_single_field_reference() {
        let binding = BindingRef::parse("$.search0.output.data.total_results").unwrap();
        assert_eq!(binding.source, task_id("search0"));
        assert_eq!(binding.path, vec!["total_results"]);
    }

    #[test]
    fn parse_accepts_nested_field_reference() {
        let binding = BindingRef::parse("$.search0.output.data.stats.search_time_ms").unwrap();
        assert_eq!(binding.path, vec!["stats", "search_time_ms"]);
    }

    #[test]
    fn parse_rejects_missing_sentinel() {
        assert!(BindingRef::parse("search0.output.data.x").is_err());
    }

    #[test]
    fn parse_rejects_path_not_through_output_data() {
        assert!(BindingRef::parse("$.search0.output.results").is_err());
        assert!(BindingRef::parse("$.search0.result.data.x").is_err());
    }

    #[test]
    fn parse_rejects_reference_without_fields() {
        assert!(BindingRef::parse("$.search0.output.data").is_err());
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!(BindingRef::parse("$.search0.output.data..x").is_err());
    }

    #[test]
    fn resolve_substitutes_value_from_completed_task() {
        let state = state_with_completed_search();
        let task = Task::new(task_id("create"), "file_create", ExecutionTarget::Client)
            .with_input("path", json!("/tmp/out"))
            .with_binding("content", "$.search0.output.data.total_results");

        let resolved = resolve_inputs(&task, &state).unwrap();
        assert_eq!(resolved["path"], json!("/tmp/out"));
        assert_eq!(resolved["content"], json!(7));
    }

    #[test]
    fn resolve_walks_nested_fields() {
        let state = state_with_completed_search();
        let task = Task::new(task_id("create"), "file_create", ExecutionTarget::Client)
            .with_binding("elapsed", "$.search0.output.data.stats.search_time_ms");

        let resolved = resolve_inputs(&task, &state).unwrap();
        assert_eq!(resolved["elapsed"], json!(4236.66));
    }

    #[test]
    fn resolve_fails_on_missing_field() {
        let state = state_with_completed_search();
        let task = Task::new(task_id("create"), "file_create", ExecutionTarget::Client)
            .with_binding("content", "$.search0.output.data.nonexistent");

        let err = resolve_inputs(&task, &state).unwrap_err();
        assert_eq!(err.kind(), crate::domain::task::ErrorKind::Binding);
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn resolve_fails_when_source_not_completed() {
        let mut state = ExecutionState::new(UserId::new("user-1").unwrap());
        state
            .add_task(TaskRecord::pending(Task::new(
                task_id("search0"),
                "web_search",
                ExecutionTarget::Server,
            )))
            .unwrap();

        let task = Task::new(task_id("create"), "file_create", ExecutionTarget::Client)
            .with_binding("content", "$.search0.output.data.total_results");

        let err = resolve_inputs(&task, &state).unwrap_err();
        assert!(err.to_string().contains("not completed"));
    }

    #[test]
    fn resolve_fails_on_unknown_source_task() {
        let state = ExecutionState::new(UserId::new("user-1").unwrap());
        let task = Task::new(task_id("create"), "file_create", ExecutionTarget::Client)
            .with_binding("content", "$.ghost.output.data.x");

        let err = resolve_inputs(&task, &state).unwrap_err();
        assert!(err.to_string().contains("unknown task"));
    }

    #[test]
    fn deferred_sources_are_left_for_the_client() {
        let state = ExecutionState::new(UserId::new("user-1").unwrap());
        let task = Task::new(task_id("write"), "file_create", ExecutionTarget::Client)
            .with_input("path", json!("~/a/x.txt"))
            .with_binding("content", "$.mkdir.output.data.folder_path");

        let deferred: HashSet<TaskId> = [task_id("mkdir")].into_iter().collect();
        let resolved = resolve_inputs_deferring(&task, &state, &deferred).unwrap();

        assert_eq!(resolved["path"], json!("~/a/x.txt"));
        assert!(!resolved.contains_key("content"));
    }

    #[test]
    fn malformed_reference_fails_even_when_deferred_candidate() {
        let state = ExecutionState::new(UserId::new("user-1").unwrap());
        let task = Task::new(task_id("write"), "file_create", ExecutionTarget::Client)
            .with_binding("content", "not-a-reference");

        let deferred: HashSet<TaskId> = [task_id("mkdir")].into_iter().collect();
        assert!(resolve_inputs_deferring(&task, &state, &deferred).is_err());
    }
}
