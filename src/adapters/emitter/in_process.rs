//! InProcessTaskEmitter - direct-call replacement for the WebSocket
//! transport.
//!
//! Instead of sending tasks over a socket, emitted records go straight to
//! a registered async callback (a scripted client in tests, or the local
//! client simulator in development). The callback acknowledges through
//! the orchestrator exactly like a remote client would, which makes this
//! emitter a drop-in for the WebSocket one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::domain::foundation::{TaskId, UserId};
use crate::domain::task::{TaskRecord, TaskStatus};
use crate::ports::{TaskEmitter, TransportError};

/// Async callback receiving emitted tasks.
///
/// Arguments: the target user, the emitted records, and whether the
/// records form a dependency chain.
pub type TaskDeliveryCallback = Arc<
    dyn Fn(UserId, Vec<TaskRecord>, bool) -> Pin<Box<dyn Future<Output = ()> + Send>>
        + Send
        + Sync,
>;

/// Direct-call implementation of the TaskEmitter port.
pub struct InProcessTaskEmitter {
    callback: RwLock<Option<TaskDeliveryCallback>>,

    /// Advisory status notifications, kept for inspection.
    statuses: Mutex<Vec<(TaskId, TaskStatus)>>,
}

impl InProcessTaskEmitter {
    pub fn new() -> Self {
        Self {
            callback: RwLock::new(None),
            statuses: Mutex::new(Vec::new()),
        }
    }

    /// Registers the delivery callback. Without one, emissions fail like
    /// a disconnected transport.
    pub async fn set_delivery_callback(&self, callback: TaskDeliveryCallback) {
        *self.callback.write().await = Some(callback);
        debug!("in-process delivery callback registered");
    }

    /// Recorded `task:status` notifications, in order.
    pub async fn status_notifications(&self) -> Vec<(TaskId, TaskStatus)> {
        self.statuses.lock().await.clone()
    }

    async fn deliver(
        &self,
        user_id: &UserId,
        tasks: Vec<TaskRecord>,
        is_chain: bool,
    ) -> Result<(), TransportError> {
        let callback = self.callback.read().await.clone();
        match callback {
            Some(callback) => {
                callback(user_id.clone(), tasks, is_chain).await;
                Ok(())
            }
            None => Err(TransportError::NotConnected(user_id.clone())),
        }
    }
}

impl Default for InProcessTaskEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskEmitter for InProcessTaskEmitter {
    async fn emit_single(&self, user_id: &UserId, task: &TaskRecord) -> Result<(), TransportError> {
        self.deliver(user_id, vec![task.clone()], false).await
    }

    async fn emit_batch(
        &self,
        user_id: &UserId,
        tasks: &[TaskRecord],
    ) -> Result<(), TransportError> {
        self.deliver(user_id, tasks.to_vec(), true).await
    }

    async fn notify_status(&self, _user_id: &UserId, task_id: &TaskId, status: TaskStatus) {
        self.statuses.lock().await.push((task_id.clone(), status));
    }
}
