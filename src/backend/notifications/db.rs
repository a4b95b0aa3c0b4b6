/**
 * Database Operations for Notifications
 */
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::NotificationKind;
use crate::shared::UserId;

/// Stored notification
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct NotificationRecord {
    pub id: i64,
    pub user_id: UserId,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub related_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Insert an unread notification
///
/// # Returns
/// Id of the stored notification
pub async fn insert_notification(
    pool: &SqlitePool,
    user_id: UserId,
    kind: NotificationKind,
    message: &str,
    related_id: Option<i64>,
    created_at: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, type, message, is_read, related_id, created_at)
        VALUES (?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(message)
    .bind(related_id)
    .bind(created_at)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// A user's notifications, newest first
pub async fn notifications_for(pool: &SqlitePool, user_id: UserId) -> Result<Vec<NotificationRecord>, sqlx::Error> {
    sqlx::query_as::<_, NotificationRecord>(
        r#"
        SELECT id, user_id, type, message, is_read, related_id, created_at
        FROM notifications
        WHERE user_id = ?
        ORDER BY id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Number of unread notifications
pub async fn unread_count(pool: &SqlitePool, user_id: UserId) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}
