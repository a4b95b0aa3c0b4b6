//! Notifications
//!
//! `notify_user` is the single entry point other services use to tell a user
//! something happened. The notification is stored first and then pushed to
//! the user's live connection if there is one; an offline user finds it in
//! storage later.
//!
//! # Module Structure
//!
//! ```text
//! notifications/
//! ├── mod.rs      - Notification kinds
//! ├── db.rs       - Durable notification records
//! └── notifier.rs - notify_user, typed constructors and broadcast helpers
//! ```

/// Database operations for notifications
pub mod db;

/// Durable-then-live notification service
pub mod notifier;

pub use notifier::Notifier;

/// Notification kind stored in the `type` column and sent as `data.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    FollowRequest,
    GroupInvite,
    GroupJoinRequest,
    EventCreated,
    PostInteraction,
    NewMessage,
    GroupMessage,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FollowRequest => "follow_request",
            Self::GroupInvite => "group_invite",
            Self::GroupJoinRequest => "group_join_request",
            Self::EventCreated => "event_created",
            Self::PostInteraction => "post_interaction",
            Self::NewMessage => "new_message",
            Self::GroupMessage => "group_message",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
