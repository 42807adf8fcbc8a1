//! WebSocket message types for task dispatch and acknowledgment.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: connection status, task dispatch, status pushes, pings
//! - Client → Server: task results, pings

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{TaskId, UserId};
use crate::domain::task::{TaskOutput, TaskRecord, TaskStatus};

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Connection established successfully.
    #[serde(rename = "connected")]
    Connected(ConnectedMessage),

    /// Dispatch one task; the full record goes over the wire so the
    /// client orchestrator has the same data the server holds.
    #[serde(rename = "task:execute")]
    TaskExecute(TaskRecord),

    /// Dispatch a dependency chain; the client executes it locally and
    /// acknowledges once.
    #[serde(rename = "task:execute_batch")]
    TaskExecuteBatch { tasks: Vec<TaskRecord>, is_chain: bool },

    /// Advisory status push for real-time UI updates.
    #[serde(rename = "task:status")]
    TaskStatus { task_id: TaskId, status: TaskStatus },

    /// Heartbeat response.
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

/// Sent when a client successfully connects.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedMessage {
    pub user_id: String,
    pub client_id: String,
    pub timestamp: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Terminal result for one task.
    #[serde(rename = "task:result")]
    TaskResult {
        user_id: UserId,
        task_id: TaskId,
        result: TaskOutput,
    },

    /// Terminal results for a whole emitted chain, acknowledged at once.
    #[serde(rename = "task:batch_results")]
    TaskBatchResults {
        user_id: UserId,
        results: Vec<TaskResultItem>,
    },

    /// Heartbeat request.
    #[serde(rename = "ping")]
    Ping,
}

/// One entry of a batch acknowledgment.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskResultItem {
    pub task_id: TaskId,
    pub result: TaskOutput,
}
