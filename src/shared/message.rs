/**
 * Chat and Notification Payloads
 *
 * Payload shapes carried in the `data` field of frames. Inbound requests
 * (`ChatRequest`, `GroupChatRequest`, `GroupSubscription`) are what a client
 * sends; outbound messages (`ChatMessage`, `GroupChatMessage`,
 * `NotificationPayload`) are what the server pushes.
 *
 * Group ids use the camelCase `groupId` key on the wire.
 */
use serde::{Deserialize, Serialize};

use super::error::SharedError;

/// Numeric user id (primary key of the users table)
pub type UserId = i64;

/// Numeric group id (primary key of the groups table)
pub type GroupId = i64;

/// Longest chat or group message accepted, in characters
pub const MAX_MESSAGE_CHARS: usize = 10_000;

/// Direct chat request sent by a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// Recipient nickname
    pub to: String,
    /// Message text
    pub message: String,
}

impl ChatRequest {
    /// Validate the request before it is persisted
    ///
    /// # Returns
    /// * `Ok(())` - recipient and text are usable
    /// * `Err(SharedError::ValidationError)` - empty recipient, empty or oversized text
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.to.trim().is_empty() {
            return Err(SharedError::validation("to", "Recipient cannot be empty"));
        }
        validate_text("message", &self.message)
    }
}

/// Group chat request sent by a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupChatRequest {
    #[serde(rename = "groupId")]
    pub group_id: GroupId,
    pub content: String,
}

impl GroupChatRequest {
    /// Validate the request before it is persisted
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.group_id <= 0 {
            return Err(SharedError::validation("groupId", "Group id must be positive"));
        }
        validate_text("content", &self.content)
    }
}

/// Subscribe / unsubscribe request naming a group channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupSubscription {
    #[serde(rename = "groupId")]
    pub group_id: GroupId,
}

/// Direct chat message pushed to the recipient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Sender nickname
    pub from: String,
    /// Recipient nickname
    pub to: String,
    /// Message text
    pub message: String,
    /// RFC 3339 timestamp taken when the message was persisted
    pub timestamp: String,
}

/// Group chat message pushed to subscribed members
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupChatMessage {
    /// Sender nickname
    pub sender: String,
    pub content: String,
    /// RFC 3339 timestamp taken when the message was persisted
    pub timestamp: String,
    #[serde(rename = "groupId")]
    pub group_id: GroupId,
}

/// Notification pushed to a single user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    /// Notification kind, e.g. `follow_request` or `group_message`
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable text
    pub message: String,
    /// Id of the related entity (group, post, event, user) if any
    pub related_id: Option<i64>,
    /// Creation time as unix seconds
    pub timestamp: i64,
}

fn validate_text(field: &str, text: &str) -> Result<(), SharedError> {
    if text.trim().is_empty() {
        return Err(SharedError::validation(field, "Message cannot be empty"));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(SharedError::validation(
            field,
            format!("Message exceeds {} characters", MAX_MESSAGE_CHARS),
        ));
    }
    Ok(())
}
