/**
 * Delivery Engine
 *
 * Turns an outbound `ServerFrame` into queued socket writes: to one
 * nickname, one user id, every subscriber of a group, or everyone online.
 *
 * Recipients are looked up as a snapshot and the registry lock is released
 * before any write. A write that fails (writer gone, or queue still full
 * after the write timeout) evicts that connection from the registry and asks
 * its socket task to close; delivery to the other recipients continues.
 */
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;

use super::connection::Connection;
use super::registry::ConnectionRegistry;
use crate::shared::{GroupId, ServerFrame, UserId};

/// Pushes frames to live connections
#[derive(Debug, Clone)]
pub struct DeliveryEngine {
    registry: ConnectionRegistry,
    write_timeout: Duration,
}

impl DeliveryEngine {
    pub fn new(registry: ConnectionRegistry, write_timeout: Duration) -> Self {
        Self {
            registry,
            write_timeout,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Deliver to a nickname's current connection
    ///
    /// # Returns
    /// `false` if the user is offline or the write failed
    pub async fn deliver(&self, nickname: &str, frame: &ServerFrame) -> bool {
        let Some(connection) = self.registry.lookup_by_identity(nickname) else {
            tracing::debug!("[Delivery] {} is offline, skipping {}", nickname, frame.kind());
            return false;
        };
        self.deliver_to_connection(&connection, frame).await
    }

    /// Deliver to a user id's current connection
    pub async fn deliver_to_user(&self, user_id: UserId, frame: &ServerFrame) -> bool {
        let Some(connection) = self.registry.lookup_by_user(user_id) else {
            tracing::debug!("[Delivery] User {} is offline, skipping {}", user_id, frame.kind());
            return false;
        };
        self.deliver_to_connection(&connection, frame).await
    }

    /// Deliver to one specific connection, registered or not
    pub async fn deliver_to_connection(&self, connection: &Arc<Connection>, frame: &ServerFrame) -> bool {
        let Some(message) = encode(frame) else {
            return false;
        };
        self.write(connection, message).await
    }

    /// Deliver to every subscriber of a group
    ///
    /// # Arguments
    /// * `group_id` - Group channel
    /// * `frame` - Frame to send
    /// * `exclude` - User id to skip, normally the sender
    ///
    /// # Returns
    /// Number of connections the frame was queued for
    pub async fn broadcast_to_group(
        &self,
        group_id: GroupId,
        frame: &ServerFrame,
        exclude: Option<UserId>,
    ) -> usize {
        let recipients: Vec<Arc<Connection>> = self
            .registry
            .group_members(group_id)
            .into_iter()
            .filter(|conn| Some(conn.user_id()) != exclude)
            .collect();
        let delivered = self.fan_out(&recipients, frame).await;
        tracing::debug!(
            "[Delivery] {} ({:?}) to group {}: {}/{} connections",
            frame.kind(),
            frame.event_type(),
            group_id,
            delivered,
            recipients.len()
        );
        delivered
    }

    /// Deliver to every registered connection
    pub async fn broadcast_all(&self, frame: &ServerFrame) -> usize {
        let recipients = self.registry.connections();
        self.fan_out(&recipients, frame).await
    }

    async fn fan_out(&self, recipients: &[Arc<Connection>], frame: &ServerFrame) -> usize {
        let Some(message) = encode(frame) else {
            return 0;
        };
        let mut delivered = 0;
        for connection in recipients {
            if self.write(connection, message.clone()).await {
                delivered += 1;
            }
        }
        delivered
    }

    async fn write(&self, connection: &Arc<Connection>, message: Message) -> bool {
        match connection.send(message, self.write_timeout).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    "[Delivery] Write to {} (connection {}) failed: {}; evicting",
                    connection.nickname(),
                    connection.id(),
                    err
                );
                self.registry.evict(connection);
                connection.close();
                false
            }
        }
    }
}

fn encode(frame: &ServerFrame) -> Option<Message> {
    match frame.to_json() {
        Ok(json) => Some(Message::Text(json.into())),
        Err(err) => {
            tracing::error!("[Delivery] Failed to encode {} frame: {}", frame.kind(), err);
            None
        }
    }
}
