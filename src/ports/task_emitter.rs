//! TaskEmitter port - Interface for dispatching tasks to a user's client.
//!
//! The client is an end-user device reached over a persistent
//! bidirectional session. Two drop-in implementations exist: the real
//! WebSocket transport and an in-process direct-call emitter used by
//! tests and the client simulator. Acknowledgments travel back through
//! the transport layer and reach the orchestrator as client acks.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{TaskId, UserId};
use crate::domain::task::{TaskRecord, TaskStatus};

/// Errors raised when a task cannot be handed to the client transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The user has no live session.
    #[error("no client session connected for user '{0}'")]
    NotConnected(UserId),

    /// The session exists but the send failed.
    #[error("failed to send to client: {0}")]
    SendFailed(String),
}

/// Port for emitting tasks to a connected client.
///
/// Implementations serialize the full [`TaskRecord`] so the client-side
/// orchestrator gets the same data the server holds.
#[async_trait]
pub trait TaskEmitter: Send + Sync {
    /// Emit one task (`task:execute`).
    async fn emit_single(&self, user_id: &UserId, task: &TaskRecord) -> Result<(), TransportError>;

    /// Emit a dependency chain as one batch (`task:execute_batch` with
    /// `is_chain: true`); the client resolves internal bindings locally.
    async fn emit_batch(&self, user_id: &UserId, tasks: &[TaskRecord])
        -> Result<(), TransportError>;

    /// Advisory `task:status` push for real-time UI updates. Best-effort:
    /// a disconnected user is not an error.
    async fn notify_status(&self, user_id: &UserId, task_id: &TaskId, status: TaskStatus);
}
