/**
 * Message Dispatcher
 *
 * One `Dispatcher` per connection. The socket task hands it each text frame
 * and awaits the result before reading the next one, so frames from one
 * connection are processed strictly in arrival order.
 *
 * # Handlers
 *
 * - `chat`: persist, then deliver to the recipient's connection, then queue
 *   a `new_message` notification
 * - `subscribe`: membership check, then registry subscribe
 * - `unsubscribe`: registry unsubscribe
 * - `group_chat`: only while subscribed; persist together with the unread
 *   counters, broadcast to the other subscribers, refresh their counters and
 *   queue `group_message` notifications
 *
 * Nothing is delivered or notified for a message that failed to persist.
 *
 * A direct message counts as delivered once its frame is queued on the
 * recipient's outbound channel, not once the writer has put it on the wire.
 * Frames still queued when a socket dies are lost with it.
 * Dropped frames are logged; with `error_acks` enabled the sender also gets
 * an `error` frame.
 */
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use super::connection::Connection;
use crate::backend::auth::users::get_user_id_by_nickname;
use crate::backend::chat;
use crate::backend::groups;
use crate::backend::server::state::AppState;
use crate::shared::{
    ChatMessage, ChatRequest, ClientFrame, GroupChatMessage, GroupChatRequest, GroupId, ServerFrame,
};

/// Why an inbound frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Not an envelope, wrong payload shape or failed validation
    Malformed,
    /// Subscribe to a group the user is not a member of
    NotMember,
    /// Group message to a group the connection is not subscribed to
    NotSubscribed,
    /// The connection was evicted while the frame was in flight
    ConnectionClosed,
    /// Storage failed; nothing was delivered
    PersistFailed,
}

impl DropReason {
    /// Status code carried in the `error` frame
    pub fn code(&self) -> u16 {
        match self {
            Self::Malformed => 400,
            Self::NotMember | Self::NotSubscribed => 403,
            Self::ConnectionClosed => 410,
            Self::PersistFailed => 500,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Malformed => "Malformed frame",
            Self::NotMember => "Not a member of this group",
            Self::NotSubscribed => "Not subscribed to this group",
            Self::ConnectionClosed => "Connection closed",
            Self::PersistFailed => "Message could not be stored",
        }
    }
}

/// Result of handling one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Stored; `delivered` is true once the frame is queued for the
    /// recipient and false when the recipient is offline
    ChatSent { message_id: i64, delivered: bool },
    Subscribed(GroupId),
    Unsubscribed(GroupId),
    /// Stored and pushed to `recipients` live connections
    GroupChatSent {
        message_id: i64,
        group_id: GroupId,
        recipients: usize,
    },
    /// Envelope kind the server does not handle
    UnknownKind(String),
    Dropped(DropReason),
}

/// Routes a connection's inbound frames
pub struct Dispatcher {
    state: AppState,
    connection: Arc<Connection>,
}

impl Dispatcher {
    pub fn new(state: AppState, connection: Arc<Connection>) -> Self {
        Self { state, connection }
    }

    /// Decode and handle one text frame
    pub async fn handle_text(&self, text: &str) -> DispatchOutcome {
        let outcome = match ClientFrame::decode(text) {
            Ok(frame) => self.dispatch(frame).await,
            Err(err) => {
                tracing::warn!(
                    "[Dispatch] Malformed frame from {}: {}",
                    self.connection.nickname(),
                    err
                );
                DispatchOutcome::Dropped(DropReason::Malformed)
            }
        };

        if let DispatchOutcome::Dropped(reason) = &outcome {
            if self.state.config.error_acks {
                self.acknowledge_error(*reason).await;
            }
        }
        outcome
    }

    /// Handle an already decoded frame
    pub async fn dispatch(&self, frame: ClientFrame) -> DispatchOutcome {
        match frame {
            ClientFrame::Chat(request) => self.handle_chat(request).await,
            ClientFrame::Subscribe(sub) => self.handle_subscribe(sub.group_id).await,
            ClientFrame::Unsubscribe(sub) => self.handle_unsubscribe(sub.group_id),
            ClientFrame::GroupChat(request) => self.handle_group_chat(request).await,
            ClientFrame::Unknown(kind) => {
                tracing::info!(
                    "[Dispatch] Ignoring unknown frame type '{}' from {}",
                    kind,
                    self.connection.nickname()
                );
                DispatchOutcome::UnknownKind(kind)
            }
        }
    }

    async fn handle_chat(&self, request: ChatRequest) -> DispatchOutcome {
        if let Err(err) = request.validate() {
            tracing::warn!("[Dispatch] Invalid chat from {}: {}", self.connection.nickname(), err);
            return DispatchOutcome::Dropped(DropReason::Malformed);
        }

        let sender = self.connection.nickname();
        let timestamp = server_timestamp();
        let message_id = match chat::db::save_message(
            &self.state.db,
            sender,
            &request.to,
            &request.message,
            &timestamp,
        )
        .await
        {
            Ok(id) => id,
            Err(err) => {
                tracing::error!("[Dispatch] Failed to store chat from {} to {}: {}", sender, request.to, err);
                return DispatchOutcome::Dropped(DropReason::PersistFailed);
            }
        };

        let frame = ServerFrame::Chat(ChatMessage {
            from: sender.to_string(),
            to: request.to.clone(),
            message: request.message,
            timestamp,
        });
        let delivered = self.deliver_chat(message_id, &request.to, &frame).await;

        let notifier = self.state.notifier.clone();
        let pool = self.state.db.clone();
        let sender = sender.to_string();
        let recipient = request.to;
        tokio::spawn(async move {
            match get_user_id_by_nickname(&pool, &recipient).await {
                Ok(Some(recipient_id)) => {
                    if let Err(err) = notifier.new_message(recipient_id, &sender).await {
                        tracing::warn!("[Dispatch] Failed to store message notification for {}: {}", recipient, err);
                    }
                }
                Ok(None) => tracing::debug!("[Dispatch] No user named {}, skipping notification", recipient),
                Err(err) => tracing::warn!("[Dispatch] Failed to look up {}: {}", recipient, err),
            }
        });

        DispatchOutcome::ChatSent {
            message_id,
            delivered,
        }
    }

    /// Push a stored direct message to the recipient's live connection
    ///
    /// The message is claimed (`delivered` 0 → 1) before its frame is
    /// queued. The recipient's socket claims backlog messages the same way,
    /// so exactly one side sends it. A frame that cannot be queued releases
    /// the claim and stays in the backlog.
    async fn deliver_chat(&self, message_id: i64, recipient: &str, frame: &ServerFrame) -> bool {
        let Some(connection) = self.state.registry.lookup_by_identity(recipient) else {
            tracing::debug!("[Dispatch] {} is offline, message {} stays in the backlog", recipient, message_id);
            return false;
        };

        match chat::db::claim_undelivered(&self.state.db, message_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("[Dispatch] Message {} already replayed to {}", message_id, recipient);
                return true;
            }
            Err(err) => {
                tracing::warn!("[Dispatch] Failed to claim message {}: {}", message_id, err);
                return false;
            }
        }

        if self.state.delivery.deliver_to_connection(&connection, frame).await {
            return true;
        }
        if let Err(err) = chat::db::release_claim(&self.state.db, message_id).await {
            tracing::warn!("[Dispatch] Failed to release message {}: {}", message_id, err);
        }
        false
    }

    async fn handle_subscribe(&self, group_id: GroupId) -> DispatchOutcome {
        let user_id = self.connection.user_id();
        match groups::db::is_member(&self.state.db, group_id, user_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    "[Dispatch] {} tried to subscribe to group {} without membership",
                    self.connection.nickname(),
                    group_id
                );
                return DispatchOutcome::Dropped(DropReason::NotMember);
            }
            Err(err) => {
                tracing::error!("[Dispatch] Membership check for group {} failed: {}", group_id, err);
                return DispatchOutcome::Dropped(DropReason::PersistFailed);
            }
        }

        if !self.state.registry.subscribe(&self.connection, group_id) {
            tracing::debug!(
                "[Dispatch] Connection {} closed before subscribing to group {}",
                self.connection.id(),
                group_id
            );
            return DispatchOutcome::Dropped(DropReason::ConnectionClosed);
        }
        tracing::info!("[Dispatch] {} subscribed to group {}", self.connection.nickname(), group_id);
        DispatchOutcome::Subscribed(group_id)
    }

    fn handle_unsubscribe(&self, group_id: GroupId) -> DispatchOutcome {
        self.state.registry.unsubscribe(&self.connection, group_id);
        tracing::info!("[Dispatch] {} unsubscribed from group {}", self.connection.nickname(), group_id);
        DispatchOutcome::Unsubscribed(group_id)
    }

    async fn handle_group_chat(&self, request: GroupChatRequest) -> DispatchOutcome {
        if let Err(err) = request.validate() {
            tracing::warn!("[Dispatch] Invalid group chat from {}: {}", self.connection.nickname(), err);
            return DispatchOutcome::Dropped(DropReason::Malformed);
        }

        let group_id = request.group_id;
        let sender_id = self.connection.user_id();
        if !self.state.registry.is_subscribed(&self.connection, group_id) {
            tracing::warn!(
                "[Dispatch] {} sent to group {} without subscribing",
                self.connection.nickname(),
                group_id
            );
            return DispatchOutcome::Dropped(DropReason::NotSubscribed);
        }

        let timestamp = server_timestamp();
        let message_id = match groups::db::record_group_message(
            &self.state.db,
            group_id,
            sender_id,
            &request.content,
            &timestamp,
        )
        .await
        {
            Ok(id) => id,
            Err(err) => {
                tracing::error!("[Dispatch] Failed to store group message for group {}: {}", group_id, err);
                return DispatchOutcome::Dropped(DropReason::PersistFailed);
            }
        };

        let frame = ServerFrame::GroupChat(GroupChatMessage {
            sender: self.connection.nickname().to_string(),
            content: request.content,
            timestamp,
            group_id,
        });
        let recipients = self
            .state
            .delivery
            .broadcast_to_group(group_id, &frame, Some(sender_id))
            .await;

        if let Err(err) = self
            .state
            .notifier
            .broadcast_notification_update(group_id, sender_id)
            .await
        {
            tracing::warn!("[Dispatch] Failed to refresh unread counters for group {}: {}", group_id, err);
        }

        let notifier = self.state.notifier.clone();
        let sender = self.connection.nickname().to_string();
        tokio::spawn(async move {
            if let Err(err) = notifier
                .group_message_to_members(group_id, sender_id, &sender)
                .await
            {
                tracing::warn!("[Dispatch] Failed to notify members of group {}: {}", group_id, err);
            }
        });

        DispatchOutcome::GroupChatSent {
            message_id,
            group_id,
            recipients,
        }
    }

    async fn acknowledge_error(&self, reason: DropReason) {
        let frame = ServerFrame::Error {
            code: reason.code(),
            message: reason.message().to_string(),
        };
        self.state
            .delivery
            .deliver_to_connection(&self.connection, &frame)
            .await;
    }
}

fn server_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
