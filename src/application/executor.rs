//! ServerToolExecutor - invokes registered server-side tool adapters.
//!
//! Adapters are registered once at startup, keyed by tool name. The
//! executor is safe for concurrent calls across tasks and users: the
//! adapter table is frozen after construction and no per-user lock is
//! ever taken here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::domain::task::{JsonMap, TaskError, TaskOutput, TaskRecord};

/// One server-side tool implementation.
///
/// Adapters receive the task's materialized inputs and return the
/// structured `data` payload their tool contract promises (e.g. web
/// search returns `{results, total_results, search_time_ms, ...}`).
/// Implementations must be internally concurrency-safe.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Tool name this adapter serves.
    fn name(&self) -> &str;

    async fn run(&self, inputs: &JsonMap) -> Result<JsonMap, TaskError>;
}

/// Executes server-target tasks via their registered adapters.
pub struct ServerToolExecutor {
    adapters: HashMap<String, Arc<dyn ToolAdapter>>,
}

impl Default for ServerToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerToolExecutor {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registers an adapter under its tool name. Called at startup,
    /// before the executor is shared.
    pub fn register_adapter(&mut self, adapter: Arc<dyn ToolAdapter>) {
        debug!(tool = adapter.name(), "registered tool adapter");
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub fn has_adapter(&self, tool: &str) -> bool {
        self.adapters.contains_key(tool)
    }

    /// Executes a task, consuming `resolved_inputs` when non-empty and
    /// the literal `inputs` otherwise.
    ///
    /// Never panics and never returns early with a transport-level error:
    /// a missing adapter, an adapter failure, or an empty payload all
    /// come back as a `success = false` output with a populated error.
    pub async fn execute(&self, task: &TaskRecord) -> TaskOutput {
        let tool = task.tool();

        let Some(adapter) = self.adapters.get(tool) else {
            return TaskOutput::failure(format!("no adapter registered for tool '{}'", tool));
        };

        let inputs = if task.resolved_inputs.is_empty() {
            &task.task.inputs
        } else {
            &task.resolved_inputs
        };

        match adapter.run(inputs).await {
            Ok(data) if data.is_empty() => {
                error!(tool, task_id = %task.task_id(), "adapter returned empty payload");
                TaskOutput::failure(format!("tool '{}' returned an empty payload", tool))
            }
            Ok(data) => TaskOutput::success(data),
            Err(e) => {
                error!(tool, task_id = %task.task_id(), error = %e, "tool execution error");
                TaskOutput::failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::TaskId;
    use crate::domain::task::{ExecutionTarget, Task};
    use serde_json::json;

    struct EchoAdapter;

    #[async_trait]
    impl ToolAdapter for EchoAdapter {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(&self, inputs: &JsonMap) -> Result<JsonMap, TaskError> {
            let mut data = JsonMap::new();
            data.insert("echoed".into(), serde_json::Value::Object(inputs.clone()));
            Ok(data)
        }
    }

    struct FailingAdapter;

    #[async_trait]
    impl ToolAdapter for FailingAdapter {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn run(&self, _inputs: &JsonMap) -> Result<JsonMap, TaskError> {
            Err(TaskError::execution("upstream service unavailable"))
        }
    }

    struct EmptyAdapter;

    #[async_trait]
    impl ToolAdapter for EmptyAdapter {
        fn name(&self) -> &str {
            "empty"
        }

        async fn run(&self, _inputs: &JsonMap) -> Result<JsonMap, TaskError> {
            Ok(JsonMap::new())
        }
    }

    fn executor() -> ServerToolExecutor {
        let mut executor = ServerToolExecutor::new();
        executor.register_adapter(Arc::new(EchoAdapter));
        executor.register_adapter(Arc::new(FailingAdapter));
        executor.register_adapter(Arc::new(EmptyAdapter));
        executor
    }

    fn record(tool: &str) -> TaskRecord {
        TaskRecord::pending(
            Task::new(TaskId::new("t1").unwrap(), tool, ExecutionTarget::Server)
                .with_input("query", json!("gold")),
        )
    }

    #[tokio::test]
    async fn execute_runs_adapter_with_literal_inputs() {
        let output = executor().execute(&record("echo")).await;

        assert!(output.success);
        assert_eq!(output.data["echoed"]["query"], json!("gold"));
    }

    #[tokio::test]
    async fn execute_prefers_resolved_inputs_when_present() {
        let mut task = record("echo");
        task.resolved_inputs.insert("query".into(), json!("silver"));

        let output = executor().execute(&task).await;
        assert_eq!(output.data["echoed"]["query"], json!("silver"));
    }

    #[tokio::test]
    async fn execute_without_adapter_fails_with_error() {
        let output = executor().execute(&record("unadapted")).await;

        assert!(!output.success);
        assert_eq!(
            output.error.as_deref(),
            Some("no adapter registered for tool 'unadapted'")
        );
    }

    #[tokio::test]
    async fn adapter_error_becomes_failed_output() {
        let output = executor().execute(&record("flaky")).await;

        assert!(!output.success);
        assert!(output.error.as_deref().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn empty_payload_becomes_failed_output() {
        let output = executor().execute(&record("empty")).await;

        assert!(!output.success);
        assert!(output.error.as_deref().unwrap().contains("empty payload"));
    }

    #[tokio::test]
    async fn executor_is_safe_for_concurrent_calls() {
        let executor = Arc::new(executor());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let executor = executor.clone();
            handles.push(tokio::spawn(async move {
                executor.execute(&record("echo")).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().success);
        }
    }
}
