/**
 * Frame Envelopes
 *
 * Every WebSocket text frame is a JSON object `{"type": <kind>, "data": <payload>}`.
 * Inbound frames decode into the closed `ClientFrame` sum; kinds the server
 * does not know land in `ClientFrame::Unknown` instead of failing. Outbound
 * frames are built as `ServerFrame` values and encoded with `to_json`.
 *
 * `subscribe`/`group_subscribe` and `unsubscribe`/`group_unsubscribe` are
 * accepted as aliases.
 */
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

use super::error::SharedError;
use super::message::{
    ChatMessage, ChatRequest, GroupChatMessage, GroupChatRequest, GroupId, GroupSubscription,
    NotificationPayload,
};

/// Coarse category of an outbound frame, used for logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Direct chat message
    Chat,
    /// Group chat message
    GroupChat,
    /// Notification or notification counter refresh
    Notification,
    /// Online user list changed
    Presence,
    /// Follow/join request lists changed
    RequestUpdate,
    /// Error acknowledgement for a dropped frame
    Error,
}

/// Inbound frame sent by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Chat(ChatRequest),
    GroupChat(GroupChatRequest),
    Subscribe(GroupSubscription),
    Unsubscribe(GroupSubscription),
    /// Envelope with a kind the server does not handle
    Unknown(String),
}

#[derive(Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl ClientFrame {
    /// Decode a text frame
    ///
    /// # Arguments
    /// * `text` - Raw frame text as received from the socket
    ///
    /// # Returns
    /// * `Ok(ClientFrame)` - a known frame, or `Unknown(kind)` for unrecognized kinds
    /// * `Err(SharedError::SerializationError)` - text is not a `{type, data}` envelope
    /// * `Err(SharedError::PayloadError)` - known kind whose `data` has the wrong shape
    pub fn decode(text: &str) -> Result<Self, SharedError> {
        let InboundEnvelope { kind, data } = serde_json::from_str(text)?;
        let frame = match kind.as_str() {
            "chat" => Self::Chat(payload(&kind, data)?),
            "group_chat" => Self::GroupChat(payload(&kind, data)?),
            "subscribe" | "group_subscribe" => Self::Subscribe(payload(&kind, data)?),
            "unsubscribe" | "group_unsubscribe" => Self::Unsubscribe(payload(&kind, data)?),
            _ => Self::Unknown(kind),
        };
        Ok(frame)
    }

    /// Envelope kind this frame was decoded from (canonical spelling)
    pub fn kind(&self) -> &str {
        match self {
            Self::Chat(_) => "chat",
            Self::GroupChat(_) => "group_chat",
            Self::Subscribe(_) => "subscribe",
            Self::Unsubscribe(_) => "unsubscribe",
            Self::Unknown(kind) => kind,
        }
    }
}

fn payload<T: DeserializeOwned>(kind: &str, data: Value) -> Result<T, SharedError> {
    serde_json::from_value(data).map_err(|e| SharedError::payload(kind, e.to_string()))
}

/// Outbound frame pushed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    Chat(ChatMessage),
    GroupChat(GroupChatMessage),
    Notification(NotificationPayload),
    /// Follow relationship of the recipient changed
    FollowStatusUpdate { status: String },
    /// Group unread counters changed
    NotificationUpdate { group_id: GroupId, action: String },
    /// A group event was created
    EventNotificationUpdate {
        event_id: i64,
        group_id: GroupId,
        action: String,
    },
    /// Request list changed; the frame kind is the request type itself
    RequestUpdate { request_type: String },
    /// Online user list changed; carries no data
    UserListUpdate,
    /// Error acknowledgement for a frame the server dropped
    Error { code: u16, message: String },
}

impl ServerFrame {
    /// Wire `type` of the frame
    pub fn kind(&self) -> &str {
        match self {
            Self::Chat(_) => "chat",
            Self::GroupChat(_) => "group_chat",
            Self::Notification(_) => "notification",
            Self::FollowStatusUpdate { .. } => "follow_status_update",
            Self::NotificationUpdate { .. } => "notification_update",
            Self::EventNotificationUpdate { .. } => "event_notification_update",
            Self::RequestUpdate { request_type } => request_type,
            Self::UserListUpdate => "user_list_update",
            Self::Error { .. } => "error",
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Chat(_) => EventType::Chat,
            Self::GroupChat(_) => EventType::GroupChat,
            Self::Notification(_)
            | Self::FollowStatusUpdate { .. }
            | Self::NotificationUpdate { .. }
            | Self::EventNotificationUpdate { .. } => EventType::Notification,
            Self::RequestUpdate { .. } => EventType::RequestUpdate,
            Self::UserListUpdate => EventType::Presence,
            Self::Error { .. } => EventType::Error,
        }
    }

    /// Payload placed in the envelope `data` field
    pub fn data(&self) -> Result<Value, SharedError> {
        let data = match self {
            Self::Chat(message) => serde_json::to_value(message)?,
            Self::GroupChat(message) => serde_json::to_value(message)?,
            Self::Notification(payload) => serde_json::to_value(payload)?,
            Self::FollowStatusUpdate { status } => json!({ "status": status }),
            Self::NotificationUpdate { group_id, action } => {
                json!({ "group_id": group_id, "action": action })
            }
            Self::EventNotificationUpdate {
                event_id,
                group_id,
                action,
            } => json!({ "event_id": event_id, "group_id": group_id, "action": action }),
            Self::RequestUpdate { .. } => json!({ "action": "new_request" }),
            Self::UserListUpdate => Value::Null,
            Self::Error { code, message } => json!({ "code": code, "message": message }),
        };
        Ok(data)
    }

    /// Encode as a `{"type", "data"}` JSON text frame
    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Serialize)]
struct OutboundEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: Value,
}

impl Serialize for ServerFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.data().map_err(serde::ser::Error::custom)?;
        OutboundEnvelope {
            kind: self.kind(),
            data,
        }
        .serialize(serializer)
    }
}
