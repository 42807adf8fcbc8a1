//! TaskOrchestrator - per-user execution state store.
//!
//! Accepts task plans from the planner, stores per-user state, analyzes
//! dependencies, and routes server/client tasks. Every state-mutating
//! operation (and every read that must stay consistent with later
//! mutations) runs under that user's lock; lock order across users is
//! not significant.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::domain::foundation::{TaskId, UserId, ValidationError};
use crate::domain::task::{
    resolve_inputs_deferring, ExecutionState, ExecutionSummary, ExecutionTarget, JsonMap, Task,
    TaskError, TaskOutput, TaskRecord, TaskStatus,
};
use crate::ports::ToolCatalog;

/// Runnable slice returned by [`TaskOrchestrator::next_batch`],
/// partitioned by execution target. Lists preserve registration order.
#[derive(Debug, Default)]
pub struct TaskBatch {
    pub server: Vec<TaskRecord>,
    pub client: Vec<TaskRecord>,
}

impl TaskBatch {
    pub fn is_empty(&self) -> bool {
        self.server.is_empty() && self.client.is_empty()
    }

    pub fn len(&self) -> usize {
        self.server.len() + self.client.len()
    }
}

/// Central orchestrator managing task execution state across users.
pub struct TaskOrchestrator {
    catalog: Arc<dyn ToolCatalog>,

    /// Per-user state, each behind its own lock.
    states: RwLock<HashMap<UserId, Arc<Mutex<ExecutionState>>>>,
}

impl TaskOrchestrator {
    pub fn new(catalog: Arc<dyn ToolCatalog>) -> Self {
        Self {
            catalog,
            states: RwLock::new(HashMap::new()),
        }
    }

    async fn state_for(&self, user_id: &UserId) -> Option<Arc<Mutex<ExecutionState>>> {
        self.states.read().await.get(user_id).cloned()
    }

    async fn state_or_create(&self, user_id: &UserId) -> Arc<Mutex<ExecutionState>> {
        if let Some(state) = self.state_for(user_id).await {
            return state;
        }
        let mut states = self.states.write().await;
        states
            .entry(user_id.clone())
            .or_insert_with(|| {
                info!(user_id = %user_id, "created execution state");
                Arc::new(Mutex::new(ExecutionState::new(user_id.clone())))
            })
            .clone()
    }

    /// Registers a batch of planner tasks for a user.
    ///
    /// Structural problems (duplicate ids, dependencies on ids that exist
    /// neither in the batch nor in the state, cycles) reject the whole
    /// batch and insert nothing: the planner contract promises a valid
    /// DAG, and partial insertion would leave dangling edges behind.
    /// Unknown tools are a per-task condition: the task is recorded as
    /// failed and never dispatched, while its siblings proceed.
    pub async fn register(&self, user_id: &UserId, tasks: Vec<Task>) -> Result<(), ValidationError> {
        if tasks.is_empty() {
            return Ok(());
        }

        let state = self.state_or_create(user_id).await;
        let mut state = state.lock().await;

        validate_batch_structure(&tasks, &state)?;

        info!(user_id = %user_id, count = tasks.len(), "registering tasks");

        for task in tasks {
            let record = if self.catalog.is_known(&task.tool) {
                debug!(
                    user_id = %user_id,
                    task_id = %task.task_id,
                    tool = %task.tool,
                    target = ?task.execution_target,
                    "task registered"
                );
                TaskRecord::pending(task)
            } else {
                let error = TaskError::unknown_tool(&task.tool);
                warn!(user_id = %user_id, task_id = %task.task_id, %error, "task failed validation");
                TaskRecord::failed_at_registration(task, &error)
            };
            state.add_task(record)?;
        }

        Ok(())
    }

    /// Returns the batch of tasks ready to dispatch.
    ///
    /// A pending task is admitted when each dependency is completed — or,
    /// for client-target tasks, when the dependency is itself an admitted
    /// client task of this same batch. The relaxation is what lets a
    /// contiguous client chain leave in a single trip; the emitted chain
    /// preserves dependency order, so the client can execute it locally.
    /// Admission runs to a fixpoint so dependents registered before their
    /// dependencies are still picked up.
    pub async fn next_batch(&self, user_id: &UserId) -> TaskBatch {
        let Some(state) = self.state_for(user_id).await else {
            return TaskBatch::default();
        };
        let state = state.lock().await;

        let completed = state
            .completed_ids()
            .into_iter()
            .cloned()
            .collect::<HashSet<_>>();
        let mut admitted: HashSet<TaskId> = HashSet::new();
        let mut admitted_client: HashSet<TaskId> = HashSet::new();

        loop {
            let mut changed = false;
            for record in state.records() {
                if record.status != TaskStatus::Pending || admitted.contains(record.task_id()) {
                    continue;
                }
                let is_client = record.target() == ExecutionTarget::Client;
                let ready = record.depends_on().iter().all(|dep| {
                    completed.contains(dep) || (is_client && admitted_client.contains(dep))
                });
                if ready {
                    admitted.insert(record.task_id().clone());
                    if is_client {
                        admitted_client.insert(record.task_id().clone());
                    }
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let mut batch = TaskBatch::default();
        for record in state.records() {
            if admitted.contains(record.task_id()) {
                match record.target() {
                    ExecutionTarget::Server => batch.server.push(record.clone()),
                    ExecutionTarget::Client => batch.client.push(record.clone()),
                }
            }
        }

        if !batch.is_empty() {
            debug!(
                user_id = %user_id,
                server = batch.server.len(),
                client = batch.client.len(),
                "runnable batch"
            );
        }

        batch
    }

    /// Marks a server task as running.
    pub async fn mark_running(&self, user_id: &UserId, task_id: &TaskId) {
        self.with_task(user_id, task_id, |record| {
            record.start()?;
            info!(user_id = %user_id, task_id = %task_id, "task started");
            Ok(())
        })
        .await;
    }

    /// Marks a task as completed, storing its output for downstream
    /// binding resolution.
    pub async fn mark_completed(&self, user_id: &UserId, task_id: &TaskId, output: TaskOutput) {
        self.with_task(user_id, task_id, |record| {
            record.complete(output)?;
            info!(
                user_id = %user_id,
                task_id = %task_id,
                duration_ms = record.duration_ms,
                "task completed"
            );
            Ok(())
        })
        .await;
    }

    /// Marks a task as failed with the given error.
    pub async fn mark_failed(&self, user_id: &UserId, task_id: &TaskId, error: &TaskError) {
        self.with_task(user_id, task_id, |record| {
            record.fail(error)?;
            warn!(
                user_id = %user_id,
                task_id = %task_id,
                kind = ?error.kind(),
                %error,
                "task failed"
            );
            Ok(())
        })
        .await;
    }

    /// Marks a client task as handed to the transport (running, with the
    /// emission instant stamped).
    pub async fn mark_emitted(&self, user_id: &UserId, task_id: &TaskId) {
        self.with_task(user_id, task_id, |record| {
            record.emit()?;
            info!(user_id = %user_id, task_id = %task_id, "task emitted to client");
            Ok(())
        })
        .await;
    }

    /// Applies an inbound client acknowledgment: success completes the
    /// task, failure fails it with a client-reported error.
    pub async fn handle_client_ack(&self, user_id: &UserId, task_id: &TaskId, output: TaskOutput) {
        self.with_task(user_id, task_id, |record| {
            record.acknowledge();
            if output.success {
                record.complete(output)?;
                info!(user_id = %user_id, task_id = %task_id, "client ack: completed");
            } else {
                let error = TaskError::client_reported(
                    output
                        .error
                        .clone()
                        .unwrap_or_else(|| "client execution failed".to_string()),
                );
                record.fail(&error)?;
                warn!(user_id = %user_id, task_id = %task_id, %error, "client ack: failed");
            }
            Ok(())
        })
        .await;
    }

    /// Materializes a pending task's inputs immediately before dispatch,
    /// storing them on the record. Bindings onto tasks in `deferred`
    /// (earlier members of the same emitted chain) are left for the
    /// client to resolve locally.
    pub async fn resolve_inputs(
        &self,
        user_id: &UserId,
        task_id: &TaskId,
        deferred: &HashSet<TaskId>,
    ) -> Result<JsonMap, TaskError> {
        let state = self
            .state_for(user_id)
            .await
            .ok_or_else(|| TaskError::execution(format!("no execution state for '{}'", user_id)))?;
        let mut state = state.lock().await;

        let resolved = {
            let record = state
                .task(task_id)
                .ok_or_else(|| TaskError::execution(format!("task '{}' not found", task_id)))?;
            resolve_inputs_deferring(&record.task, &state, deferred)?
        };

        if let Some(record) = state.task_mut(task_id) {
            record.resolved_inputs = resolved.clone();
        }
        state.touch();

        Ok(resolved)
    }

    /// Read-only deep copy of one task record.
    pub async fn task_snapshot(&self, user_id: &UserId, task_id: &TaskId) -> Option<TaskRecord> {
        let state = self.state_for(user_id).await?;
        let state = state.lock().await;
        state.task(task_id).cloned()
    }

    /// Read-only deep copy of a user's whole state.
    pub async fn state_snapshot(&self, user_id: &UserId) -> Option<ExecutionState> {
        let state = self.state_for(user_id).await?;
        let state = state.lock().await;
        Some(state.clone())
    }

    /// Counts by status for a user (all zeroes when no state exists).
    pub async fn summary(&self, user_id: &UserId) -> ExecutionSummary {
        match self.state_for(user_id).await {
            Some(state) => state.lock().await.summary(),
            None => ExecutionSummary::default(),
        }
    }

    /// Tears a user's state down (disconnect or explicit cleanup).
    pub async fn cleanup_user(&self, user_id: &UserId) {
        if self.states.write().await.remove(user_id).is_some() {
            info!(user_id = %user_id, "cleaned up execution state");
        }
    }

    async fn with_task<F>(&self, user_id: &UserId, task_id: &TaskId, apply: F)
    where
        F: FnOnce(&mut TaskRecord) -> Result<(), ValidationError>,
    {
        let Some(state) = self.state_for(user_id).await else {
            warn!(user_id = %user_id, task_id = %task_id, "no execution state for task update");
            return;
        };
        let mut state = state.lock().await;
        match state.task_mut(task_id) {
            Some(record) => {
                if let Err(e) = apply(record) {
                    warn!(user_id = %user_id, task_id = %task_id, error = %e, "illegal task transition ignored");
                } else {
                    state.touch();
                }
            }
            None => {
                warn!(user_id = %user_id, task_id = %task_id, "unknown task in update");
            }
        }
    }
}

/// Rejects structurally invalid batches: duplicate ids, dangling
/// dependencies, and dependency cycles within the batch.
fn validate_batch_structure(tasks: &[Task], state: &ExecutionState) -> Result<(), ValidationError> {
    let mut batch_ids: HashSet<&TaskId> = HashSet::new();
    for task in tasks {
        if !batch_ids.insert(&task.task_id) || state.task(&task.task_id).is_some() {
            return Err(ValidationError::invalid_format(
                "task_id",
                format!("duplicate task id '{}'", task.task_id),
            ));
        }
    }

    for task in tasks {
        for dep in &task.depends_on {
            if !batch_ids.contains(dep) && state.task(dep).is_none() {
                return Err(ValidationError::invalid_format(
                    "depends_on",
                    format!(
                        "task '{}' depends on unknown task '{}'",
                        task.task_id, dep
                    ),
                ));
            }
        }
    }

    // Cycle detection over batch-internal edges (edges into prior state
    // point at registered tasks, which cannot point back into the batch).
    let index: HashMap<&TaskId, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (&t.task_id, i))
        .collect();
    let mut visited = vec![0u8; tasks.len()]; // 0 = white, 1 = gray, 2 = black
    for start in 0..tasks.len() {
        if visited[start] != 0 {
            continue;
        }
        let mut stack = vec![(start, 0usize)];
        visited[start] = 1;
        while let Some((node, edge)) = stack.pop() {
            let deps = &tasks[node].depends_on;
            if edge < deps.len() {
                stack.push((node, edge + 1));
                if let Some(&next) = index.get(&deps[edge]) {
                    match visited[next] {
                        0 => {
                            visited[next] = 1;
                            stack.push((next, 0));
                        }
                        1 => {
                            return Err(ValidationError::invalid_format(
                                "depends_on",
                                format!("dependency cycle through task '{}'", tasks[next].task_id),
                            ));
                        }
                        _ => {}
                    }
                }
            } else {
                visited[node] = 2;
            }
        }
    }

    Ok(())
}
