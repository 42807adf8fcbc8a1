//! Connection management for user-keyed message routing.
//!
//! The client session map is keyed by user id; a user may hold several
//! connections (tabs, devices) and each receives every message addressed
//! to that user. The engine only reads this map (via the emitter); it is
//! mutated exclusively by the transport layer on connect/disconnect.

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::domain::foundation::UserId;
use crate::ports::TransportError;

use super::messages::ServerMessage;

/// Unique identifier for one WebSocket connection, generated server-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks which users have live sessions and routes messages to them.
///
/// Uses `RwLock` since sends (reads) vastly outnumber connects and
/// disconnects (writes).
pub struct ConnectionManager {
    /// Map of user_id → broadcast sender fanning out to that user's
    /// connections.
    channels: RwLock<HashMap<UserId, broadcast::Sender<ServerMessage>>>,

    /// Map of client_id → user_id for O(1) cleanup on disconnect.
    client_users: RwLock<HashMap<ClientId, UserId>>,

    channel_capacity: usize,
}

impl ConnectionManager {
    /// # Arguments
    ///
    /// * `channel_capacity` - Buffer size per user channel. Bursts beyond
    ///   it drop the oldest messages for lagging connections.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            client_users: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }

    /// Create with default capacity (128 messages).
    pub fn with_default_capacity() -> Self {
        Self::new(128)
    }

    /// Registers a connection for a user, creating the channel if this is
    /// the first one. Returns the receiver for that user's messages.
    pub async fn join(
        &self,
        user_id: &UserId,
        client_id: ClientId,
    ) -> broadcast::Receiver<ServerMessage> {
        let mut channels = self.channels.write().await;

        let sender = channels.entry(user_id.clone()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.channel_capacity);
            tx
        });

        self.client_users
            .write()
            .await
            .insert(client_id, user_id.clone());

        sender.subscribe()
    }

    /// Removes a connection. Returns true when the user now has no live
    /// connections at all (the caller tears the user's state down then).
    pub async fn leave(&self, client_id: &ClientId) -> bool {
        let mut client_users = self.client_users.write().await;

        let Some(user_id) = client_users.remove(client_id) else {
            return false;
        };

        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(&user_id) {
            if sender.receiver_count() == 0 {
                drop(channels);
                self.channels.write().await.remove(&user_id);
                return true;
            }
            return false;
        }
        true
    }

    /// Sends a message to every connection of a user.
    pub async fn send_to_user(
        &self,
        user_id: &UserId,
        message: ServerMessage,
    ) -> Result<(), TransportError> {
        let channels = self.channels.read().await;

        match channels.get(user_id) {
            Some(sender) if sender.receiver_count() > 0 => sender
                .send(message)
                .map(|_| ())
                .map_err(|e| TransportError::SendFailed(e.to_string())),
            _ => Err(TransportError::NotConnected(user_id.clone())),
        }
    }

    /// Whether the user has at least one live connection.
    pub async fn is_connected(&self, user_id: &UserId) -> bool {
        self.channels
            .read()
            .await
            .get(user_id)
            .map(|s| s.receiver_count() > 0)
            .unwrap_or(false)
    }

    /// Count of live connections for a user.
    pub async fn connection_count(&self, user_id: &UserId) -> usize {
        self.channels
            .read()
            .await
            .get(user_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Total connections across all users.
    pub async fn total_connection_count(&self) -> usize {
        self.client_users.read().await.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
