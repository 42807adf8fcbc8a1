//! WebSocketTaskEmitter - the real transport implementation of the
//! TaskEmitter port.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::domain::foundation::{TaskId, UserId};
use crate::domain::task::{TaskRecord, TaskStatus};
use crate::ports::{TaskEmitter, TransportError};

use super::connections::ConnectionManager;
use super::messages::ServerMessage;

/// Emits tasks to connected clients over their WebSocket sessions.
pub struct WebSocketTaskEmitter {
    connections: Arc<ConnectionManager>,
}

impl WebSocketTaskEmitter {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl TaskEmitter for WebSocketTaskEmitter {
    async fn emit_single(&self, user_id: &UserId, task: &TaskRecord) -> Result<(), TransportError> {
        self.connections
            .send_to_user(user_id, ServerMessage::TaskExecute(task.clone()))
            .await?;
        debug!(user_id = %user_id, task_id = %task.task_id(), "emitted task");
        Ok(())
    }

    async fn emit_batch(
        &self,
        user_id: &UserId,
        tasks: &[TaskRecord],
    ) -> Result<(), TransportError> {
        self.connections
            .send_to_user(
                user_id,
                ServerMessage::TaskExecuteBatch {
                    tasks: tasks.to_vec(),
                    is_chain: true,
                },
            )
            .await?;
        debug!(user_id = %user_id, count = tasks.len(), "emitted task batch");
        Ok(())
    }

    async fn notify_status(&self, user_id: &UserId, task_id: &TaskId, status: TaskStatus) {
        // Best-effort: a user without a dashboard open is not an error.
        let _ = self
            .connections
            .send_to_user(
                user_id,
                ServerMessage::TaskStatus {
                    task_id: task_id.clone(),
                    status,
                },
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::connections::ClientId;
    use crate::domain::task::{ExecutionTarget, Task};

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn record(id: &str) -> TaskRecord {
        TaskRecord::pending(Task::new(
            TaskId::new(id).unwrap(),
            "file_create",
            ExecutionTarget::Client,
        ))
    }

    #[tokio::test]
    async fn emit_single_reaches_connected_client() {
        let connections = Arc::new(ConnectionManager::with_default_capacity());
        let mut rx = connections.join(&user(), ClientId::new()).await;
        let emitter = WebSocketTaskEmitter::new(connections);

        emitter.emit_single(&user(), &record("c1")).await.unwrap();

        match rx.recv().await.unwrap() {
            ServerMessage::TaskExecute(task) => assert_eq!(task.task_id().as_str(), "c1"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn emit_batch_sets_chain_flag() {
        let connections = Arc::new(ConnectionManager::with_default_capacity());
        let mut rx = connections.join(&user(), ClientId::new()).await;
        let emitter = WebSocketTaskEmitter::new(connections);

        emitter
            .emit_batch(&user(), &[record("mkdir"), record("write")])
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            ServerMessage::TaskExecuteBatch { tasks, is_chain } => {
                assert!(is_chain);
                assert_eq!(tasks.len(), 2);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn emit_to_disconnected_user_fails() {
        let connections = Arc::new(ConnectionManager::with_default_capacity());
        let emitter = WebSocketTaskEmitter::new(connections);

        let result = emitter.emit_single(&user(), &record("c1")).await;
        assert!(matches!(result, Err(TransportError::NotConnected(_))));
    }

    #[tokio::test]
    async fn notify_status_to_disconnected_user_is_silent() {
        let connections = Arc::new(ConnectionManager::with_default_capacity());
        let emitter = WebSocketTaskEmitter::new(connections);

        emitter
            .notify_status(&user(), &TaskId::new("c1").unwrap(), TaskStatus::Running)
            .await;
    }
}
