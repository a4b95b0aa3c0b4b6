/**
 * Notification Service
 *
 * `Notifier::notify_user` stores the notification and only then attempts a
 * live push, so a user never sees a live notification that is missing from
 * storage. A push to an offline user is skipped silently.
 *
 * The typed constructors below build the message text for each kind of
 * social event. The broadcast helpers push counter/list refresh frames that
 * are never stored.
 */
use chrono::Utc;
use sqlx::SqlitePool;

use super::{db, NotificationKind};
use crate::backend::groups;
use crate::backend::realtime::delivery::DeliveryEngine;
use crate::shared::{GroupId, NotificationPayload, ServerFrame, UserId};

/// Kind of interaction on a post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostInteraction {
    Like,
    Comment,
    Dislike,
    Other,
}

impl From<&str> for PostInteraction {
    fn from(value: &str) -> Self {
        match value {
            "like" => Self::Like,
            "comment" => Self::Comment,
            "dislike" => Self::Dislike,
            _ => Self::Other,
        }
    }
}

impl PostInteraction {
    fn verb_phrase(&self) -> &'static str {
        match self {
            Self::Like => "liked your post",
            Self::Comment => "commented on your post",
            Self::Dislike => "disliked your post",
            Self::Other => "interacted with your post",
        }
    }
}

/// Durable-then-live notification service
#[derive(Debug, Clone)]
pub struct Notifier {
    pool: SqlitePool,
    delivery: DeliveryEngine,
}

impl Notifier {
    pub fn new(pool: SqlitePool, delivery: DeliveryEngine) -> Self {
        Self { pool, delivery }
    }

    /// Store a notification, then push it if the user is online
    ///
    /// # Arguments
    /// * `user_id` - Recipient
    /// * `kind` - Notification kind
    /// * `message` - Human-readable text
    /// * `related_id` - Related entity id, if any
    ///
    /// # Returns
    /// * `Ok(true)` - stored and pushed live
    /// * `Ok(false)` - stored; the user is offline or the push failed
    /// * `Err(sqlx::Error)` - not stored, and therefore not pushed
    pub async fn notify_user(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        message: &str,
        related_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let created_at = Utc::now();
        db::insert_notification(&self.pool, user_id, kind, message, related_id, created_at).await?;

        let frame = ServerFrame::Notification(NotificationPayload {
            kind: kind.as_str().to_string(),
            message: message.to_string(),
            related_id,
            timestamp: created_at.timestamp(),
        });
        let pushed = self.delivery.deliver_to_user(user_id, &frame).await;
        tracing::debug!(
            "[Notify] {} for user {} stored (live push: {})",
            kind,
            user_id,
            pushed
        );
        Ok(pushed)
    }

    pub async fn follow_request(
        &self,
        target_id: UserId,
        follower_id: UserId,
        follower_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!("{} sent you a follow request", follower_nickname);
        self.notify_user(target_id, NotificationKind::FollowRequest, &message, Some(follower_id))
            .await
    }

    /// Tell the follower that `target_nickname` accepted
    pub async fn follow_accepted(
        &self,
        follower_id: UserId,
        target_id: UserId,
        target_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!("{} accepted your follow request", target_nickname);
        self.notify_user(follower_id, NotificationKind::FollowRequest, &message, Some(target_id))
            .await
    }

    pub async fn group_invite(
        &self,
        invited_id: UserId,
        group_id: GroupId,
        group_name: &str,
        inviter_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!(
            "{} invited you to join the group '{}'",
            inviter_nickname, group_name
        );
        self.notify_user(invited_id, NotificationKind::GroupInvite, &message, Some(group_id))
            .await
    }

    pub async fn group_join_request(
        &self,
        admin_id: UserId,
        group_id: GroupId,
        group_name: &str,
        requester_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!(
            "{} requested to join the group '{}'",
            requester_nickname, group_name
        );
        self.notify_user(admin_id, NotificationKind::GroupJoinRequest, &message, Some(group_id))
            .await
    }

    pub async fn group_join_accepted(
        &self,
        requester_id: UserId,
        group_id: GroupId,
        group_name: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!("Your request to join the group '{}' was accepted", group_name);
        self.notify_user(requester_id, NotificationKind::GroupJoinRequest, &message, Some(group_id))
            .await
    }

    pub async fn event_created(
        &self,
        member_id: UserId,
        group_id: GroupId,
        group_name: &str,
        event_title: &str,
        creator_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!(
            "{} created a new event '{}' in the group '{}'",
            creator_nickname, event_title, group_name
        );
        self.notify_user(member_id, NotificationKind::EventCreated, &message, Some(group_id))
            .await
    }

    pub async fn post_interaction(
        &self,
        owner_id: UserId,
        post_id: i64,
        interaction: PostInteraction,
        actor_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!("{} {}", actor_nickname, interaction.verb_phrase());
        self.notify_user(owner_id, NotificationKind::PostInteraction, &message, Some(post_id))
            .await
    }

    pub async fn post_mention(
        &self,
        mentioned_id: UserId,
        post_id: i64,
        mentioner_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!("{} mentioned you in a post", mentioner_nickname);
        self.notify_user(mentioned_id, NotificationKind::PostInteraction, &message, Some(post_id))
            .await
    }

    pub async fn event_reminder(
        &self,
        member_id: UserId,
        group_id: GroupId,
        group_name: &str,
        event_title: &str,
        event_time: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!(
            "Reminder: Event '{}' in group '{}' starts at {}",
            event_title, group_name, event_time
        );
        self.notify_user(member_id, NotificationKind::EventCreated, &message, Some(group_id))
            .await
    }

    pub async fn role_change(
        &self,
        user_id: UserId,
        group_id: GroupId,
        group_name: &str,
        new_role: &str,
        admin_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!(
            "{} changed your role to {} in the group '{}'",
            admin_nickname, new_role, group_name
        );
        self.notify_user(user_id, NotificationKind::GroupInvite, &message, Some(group_id))
            .await
    }

    pub async fn group_post(
        &self,
        member_id: UserId,
        group_id: GroupId,
        group_name: &str,
        poster_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!("{} posted in the group '{}'", poster_nickname, group_name);
        self.notify_user(member_id, NotificationKind::PostInteraction, &message, Some(group_id))
            .await
    }

    pub async fn new_message(
        &self,
        recipient_id: UserId,
        sender_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!("{} sent you a new message", sender_nickname);
        self.notify_user(recipient_id, NotificationKind::NewMessage, &message, None)
            .await
    }

    pub async fn group_message(
        &self,
        member_id: UserId,
        group_id: GroupId,
        group_name: &str,
        sender_nickname: &str,
    ) -> Result<bool, sqlx::Error> {
        let message = format!(
            "{} sent a message in the group '{}'",
            sender_nickname, group_name
        );
        self.notify_user(member_id, NotificationKind::GroupMessage, &message, Some(group_id))
            .await
    }

    /// Notify every other group member of a new group message
    ///
    /// # Returns
    /// Number of notifications stored
    pub async fn group_message_to_members(
        &self,
        group_id: GroupId,
        sender_id: UserId,
        sender_nickname: &str,
    ) -> Result<usize, sqlx::Error> {
        let group_name = groups::db::group_name(&self.pool, group_id)
            .await?
            .unwrap_or_else(|| groups::db::UNKNOWN_GROUP_NAME.to_string());
        let members = groups::db::other_members(&self.pool, group_id, sender_id).await?;

        let mut stored = 0;
        for member_id in members {
            match self
                .group_message(member_id, group_id, &group_name, sender_nickname)
                .await
            {
                Ok(_) => stored += 1,
                Err(err) => tracing::warn!(
                    "[Notify] Failed to store group message notification for user {}: {}",
                    member_id,
                    err
                ),
            }
        }
        Ok(stored)
    }

    /// Push `follow_status_update {status}` to a nickname
    pub async fn notify_follow_status_update(&self, nickname: &str, status: &str) -> bool {
        tracing::info!("[Notify] Follow status update for {}: {}", nickname, status);
        let frame = ServerFrame::FollowStatusUpdate {
            status: status.to_string(),
        };
        self.delivery.deliver(nickname, &frame).await
    }

    /// Push `notification_update` to every online member of the group except the sender
    ///
    /// # Returns
    /// Number of members the frame was queued for
    pub async fn broadcast_notification_update(
        &self,
        group_id: GroupId,
        sender_id: UserId,
    ) -> Result<usize, sqlx::Error> {
        let frame = ServerFrame::NotificationUpdate {
            group_id,
            action: "new_message".to_string(),
        };
        self.push_to_other_members(group_id, sender_id, &frame).await
    }

    /// Push `event_notification_update` to every online member of the group except the creator
    pub async fn broadcast_event_notification_update(
        &self,
        event_id: i64,
        group_id: GroupId,
        creator_id: UserId,
    ) -> Result<usize, sqlx::Error> {
        let frame = ServerFrame::EventNotificationUpdate {
            event_id,
            group_id,
            action: "new_event".to_string(),
        };
        self.push_to_other_members(group_id, creator_id, &frame).await
    }

    /// Push a request-list refresh typed `request_type` to a nickname
    pub async fn broadcast_request_update(&self, nickname: &str, request_type: &str) -> bool {
        let frame = ServerFrame::RequestUpdate {
            request_type: request_type.to_string(),
        };
        self.delivery.deliver(nickname, &frame).await
    }

    /// Push `user_list_update` to everyone online
    pub async fn broadcast_user_list_update(&self) -> usize {
        let delivered = self.delivery.broadcast_all(&ServerFrame::UserListUpdate).await;
        tracing::debug!("[Notify] User list update sent to {} connections", delivered);
        delivered
    }

    async fn push_to_other_members(
        &self,
        group_id: GroupId,
        exclude: UserId,
        frame: &ServerFrame,
    ) -> Result<usize, sqlx::Error> {
        let members = groups::db::other_members(&self.pool, group_id, exclude).await?;
        let mut delivered = 0;
        for member_id in members {
            if self.delivery.deliver_to_user(member_id, frame).await {
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}
