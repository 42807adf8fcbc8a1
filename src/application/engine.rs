//! ExecutionEngine - per-user background driver loop.
//!
//! One driver task per active user pulls runnable batches from the
//! orchestrator, fans server tasks out in parallel, hands client tasks
//! (grouped into dependency chains) to the transport, and exits once the
//! user's DAG is drained. Acknowledgments from clients arrive through
//! the transport layer and unblock dependents on the next poll.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::foundation::{TaskId, UserId};
use crate::domain::task::{group_chains, TaskError, TaskRecord, TaskStatus};
use crate::ports::TaskEmitter;

use super::{ServerToolExecutor, TaskOrchestrator};

/// Handle to a live driver. Cloneable; all clones control the same
/// underlying task.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    id: Uuid,
    abort: AbortHandle,
}

impl DriverHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    fn abort(&self) {
        self.abort.abort();
    }
}

impl PartialEq for DriverHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

struct DriverEntry {
    handle: DriverHandle,
    join: Option<JoinHandle<()>>,
}

/// Drives registered DAGs to completion, one background task per user.
pub struct ExecutionEngine {
    orchestrator: Arc<TaskOrchestrator>,
    executor: Arc<ServerToolExecutor>,
    emitter: Arc<dyn TaskEmitter>,
    config: EngineConfig,
    drivers: Mutex<std::collections::HashMap<UserId, DriverEntry>>,
}

impl ExecutionEngine {
    pub fn new(
        orchestrator: Arc<TaskOrchestrator>,
        executor: Arc<ServerToolExecutor>,
        emitter: Arc<dyn TaskEmitter>,
        config: EngineConfig,
    ) -> Self {
        Self {
            orchestrator,
            executor,
            emitter,
            config,
            drivers: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Starts the driver for a user, or returns the live one (idempotent:
    /// at most one driver exists per user).
    pub async fn start(self: &Arc<Self>, user_id: UserId) -> DriverHandle {
        let mut drivers = self.drivers.lock().await;

        if let Some(entry) = drivers.get(&user_id) {
            if !entry.handle.is_finished() {
                debug!(user_id = %user_id, "driver already running");
                return entry.handle.clone();
            }
        }

        let id = Uuid::new_v4();
        let engine = Arc::clone(self);
        let driver_user = user_id.clone();
        let join = tokio::spawn(async move { engine.run_driver(driver_user, id).await });
        let handle = DriverHandle {
            id,
            abort: join.abort_handle(),
        };
        drivers.insert(
            user_id.clone(),
            DriverEntry {
                handle: handle.clone(),
                join: Some(join),
            },
        );
        info!(user_id = %user_id, driver_id = %id, "started execution driver");
        handle
    }

    /// Whether a driver is currently live for the user.
    pub async fn is_running(&self, user_id: &UserId) -> bool {
        self.drivers
            .lock()
            .await
            .get(user_id)
            .map(|e| !e.handle.is_finished())
            .unwrap_or(false)
    }

    /// Cancels the user's driver. In-flight server executions were
    /// spawned as their own tasks, so they run to completion and still
    /// apply their results; emitted client tasks are not recalled.
    pub async fn stop(&self, user_id: &UserId) {
        if let Some(entry) = self.drivers.lock().await.remove(user_id) {
            if !entry.handle.is_finished() {
                entry.handle.abort();
                info!(user_id = %user_id, "stopped execution driver");
            }
        }
    }

    /// Waits for the user's driver to finish (tests and shutdown).
    pub async fn wait(&self, user_id: &UserId) {
        let join = {
            let mut drivers = self.drivers.lock().await;
            drivers.get_mut(user_id).and_then(|e| e.join.take())
        };
        if let Some(join) = join {
            // Abort errors just mean stop() won the race.
            let _ = join.await;
        }
    }

    async fn run_driver(self: Arc<Self>, user_id: UserId, driver_id: Uuid) {
        info!(user_id = %user_id, "execution loop started");

        let mut iteration = 0u32;
        let mut idle_count = 0u32;

        while iteration < self.config.max_iterations {
            iteration += 1;

            let batch = self.orchestrator.next_batch(&user_id).await;

            if batch.is_empty() {
                let summary = self.orchestrator.summary(&user_id).await;
                if summary.is_drained() {
                    break;
                }
                idle_count += 1;
                debug!(
                    user_id = %user_id,
                    idle_count,
                    pending = summary.pending,
                    running = summary.running,
                    "no runnable tasks"
                );
                if idle_count >= self.config.max_idle {
                    warn!(
                        user_id = %user_id,
                        pending = summary.pending,
                        running = summary.running,
                        "exiting with unfinished tasks (failed dependencies or missing acks)"
                    );
                    break;
                }
                tokio::time::sleep(self.config.idle_sleep()).await;
                continue;
            }

            idle_count = 0;
            debug!(
                user_id = %user_id,
                iteration,
                server = batch.server.len(),
                client = batch.client.len(),
                "dispatching batch"
            );

            if !batch.server.is_empty() {
                self.dispatch_server_batch(&user_id, batch.server).await;
            }
            if !batch.client.is_empty() {
                self.dispatch_client_batch(&user_id, batch.client).await;
            }

            tokio::time::sleep(self.config.poll_sleep()).await;
        }

        if iteration >= self.config.max_iterations {
            warn!(user_id = %user_id, iteration, "max iterations reached");
        }

        let summary = self.orchestrator.summary(&user_id).await;
        info!(
            user_id = %user_id,
            total = summary.total,
            completed = summary.completed,
            failed = summary.failed,
            pending = summary.pending,
            running = summary.running,
            success_rate = format!("{:.1}%", summary.success_rate()),
            "execution loop ended"
        );

        let mut drivers = self.drivers.lock().await;
        if drivers.get(&user_id).map(|e| e.handle.id) == Some(driver_id) {
            drivers.remove(&user_id);
        }
    }

    /// Executes a server batch: every task runs as its own spawned task
    /// (so cancellation of the driver does not cancel them), and the
    /// batch completes when all of them reach a terminal state.
    async fn dispatch_server_batch(self: &Arc<Self>, user_id: &UserId, tasks: Vec<TaskRecord>) {
        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let engine = Arc::clone(self);
                let user_id = user_id.clone();
                tokio::spawn(async move { engine.execute_server_task(user_id, task).await })
            })
            .collect();

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(user_id = %user_id, error = %e, "server task panicked or was cancelled");
            }
        }
    }

    async fn execute_server_task(&self, user_id: UserId, mut task: TaskRecord) {
        let task_id = task.task_id().clone();

        // Bindings materialize immediately before dispatch so they see the
        // most recent outputs; a resolution failure means no execution.
        match self
            .orchestrator
            .resolve_inputs(&user_id, &task_id, &HashSet::new())
            .await
        {
            Ok(resolved) => task.resolved_inputs = resolved,
            Err(e) => {
                self.fail_task(&user_id, &task, &e).await;
                return;
            }
        }

        self.orchestrator.mark_running(&user_id, &task_id).await;
        self.emitter
            .notify_status(&user_id, &task_id, TaskStatus::Running)
            .await;
        if let Some(message) = task.task.on_start_message() {
            info!(user_id = %user_id, task_id = %task_id, "{}", message);
        }

        let output = match task.task.timeout_ms() {
            Some(timeout_ms) => {
                let deadline = std::time::Duration::from_millis(timeout_ms);
                match tokio::time::timeout(deadline, self.executor.execute(&task)).await {
                    Ok(output) => output,
                    Err(_) => {
                        self.fail_task(&user_id, &task, &TaskError::timeout(timeout_ms))
                            .await;
                        return;
                    }
                }
            }
            None => self.executor.execute(&task).await,
        };

        if output.success {
            self.orchestrator
                .mark_completed(&user_id, &task_id, output)
                .await;
            self.emitter
                .notify_status(&user_id, &task_id, TaskStatus::Completed)
                .await;
            if let Some(message) = task.task.on_success_message() {
                info!(user_id = %user_id, task_id = %task_id, "{}", message);
            }
        } else {
            let error = TaskError::execution(
                output
                    .error
                    .unwrap_or_else(|| "tool execution failed".to_string()),
            );
            self.fail_task(&user_id, &task, &error).await;
        }
    }

    /// Dispatches a client batch: dependency chains go out as one
    /// `task:execute_batch` trip, singletons individually.
    async fn dispatch_client_batch(&self, user_id: &UserId, tasks: Vec<TaskRecord>) {
        for chain in group_chains(tasks) {
            if chain.len() > 1 {
                self.emit_client_chain(user_id, chain).await;
            } else if let Some(task) = chain.into_iter().next() {
                self.emit_client_single(user_id, task).await;
            }
        }
    }

    async fn emit_client_single(&self, user_id: &UserId, task: TaskRecord) {
        let task_id = task.task_id().clone();

        if let Err(e) = self
            .orchestrator
            .resolve_inputs(user_id, &task_id, &HashSet::new())
            .await
        {
            self.fail_task(user_id, &task, &e).await;
            return;
        }

        self.orchestrator.mark_emitted(user_id, &task_id).await;
        self.emitter
            .notify_status(user_id, &task_id, TaskStatus::Running)
            .await;
        if let Some(message) = task.task.on_start_message() {
            info!(user_id = %user_id, task_id = %task_id, "{}", message);
        }

        let Some(fresh) = self.orchestrator.task_snapshot(user_id, &task_id).await else {
            return;
        };
        if let Err(e) = self.emitter.emit_single(user_id, &fresh).await {
            self.fail_task(user_id, &task, &TaskError::transport(e.to_string()))
                .await;
        }
    }

    async fn emit_client_chain(&self, user_id: &UserId, chain: Vec<TaskRecord>) {
        // Server-resolvable bindings materialize now; bindings onto
        // earlier chain members stay in place for the client to resolve
        // from its local outputs. A member that cannot resolve truncates
        // the chain there: everything after it depends on it anyway.
        let mut prepared: Vec<TaskRecord> = Vec::new();
        let mut earlier: HashSet<TaskId> = HashSet::new();
        for task in chain {
            match self
                .orchestrator
                .resolve_inputs(user_id, task.task_id(), &earlier)
                .await
            {
                Ok(_) => {
                    earlier.insert(task.task_id().clone());
                    prepared.push(task);
                }
                Err(e) => {
                    self.fail_task(user_id, &task, &e).await;
                    break;
                }
            }
        }

        if prepared.is_empty() {
            return;
        }

        let mut emitted = Vec::with_capacity(prepared.len());
        for task in &prepared {
            self.orchestrator.mark_emitted(user_id, task.task_id()).await;
            self.emitter
                .notify_status(user_id, task.task_id(), TaskStatus::Running)
                .await;
            if let Some(message) = task.task.on_start_message() {
                info!(user_id = %user_id, task_id = %task.task_id(), "{}", message);
            }
            if let Some(fresh) = self.orchestrator.task_snapshot(user_id, task.task_id()).await {
                emitted.push(fresh);
            }
        }

        debug!(
            user_id = %user_id,
            chain = ?emitted.iter().map(|t| t.task_id().as_str()).collect::<Vec<_>>(),
            "emitting client chain"
        );

        if let Err(e) = self.emitter.emit_batch(user_id, &emitted).await {
            let error = TaskError::transport(e.to_string());
            for task in &prepared {
                self.fail_task(user_id, task, &error).await;
            }
        }
    }

    async fn fail_task(&self, user_id: &UserId, task: &TaskRecord, error: &TaskError) {
        self.orchestrator
            .mark_failed(user_id, task.task_id(), error)
            .await;
        self.emitter
            .notify_status(user_id, task.task_id(), TaskStatus::Failed)
            .await;
        if let Some(message) = task.task.on_failure_message() {
            info!(user_id = %user_id, task_id = %task.task_id(), "{}", message);
        }
    }
}
