//! Shared Module
//!
//! Types that cross the WebSocket boundary. Everything here is plain serde
//! data so a client crate can depend on it without pulling in the server.

/// Chat and notification payloads
pub mod message;

/// Inbound and outbound frame envelopes
pub mod frame;

/// Shared error types
pub mod error;

pub use error::SharedError;
pub use frame::{ClientFrame, EventType, ServerFrame};
pub use message::{
    ChatMessage, ChatRequest, GroupChatMessage, GroupChatRequest, GroupId, GroupSubscription,
    NotificationPayload, UserId,
};
