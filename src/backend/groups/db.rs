/**
 * Database Operations for Groups
 *
 * Group creation and membership changes are driven by other services; the
 * writers here exist so those services (and tests) can seed data. The
 * realtime core only reads membership and writes group messages.
 */
use chrono::Utc;
use sqlx::SqlitePool;

use crate::shared::{GroupId, UserId};

/// Name used when a group row is missing
pub const UNKNOWN_GROUP_NAME: &str = "Unknown Group";

/// Create a group and make its creator an admin member
pub async fn create_group(
    pool: &SqlitePool,
    name: &str,
    description: &str,
    created_by: UserId,
) -> Result<GroupId, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let group_id = sqlx::query(
        "INSERT INTO groups (group_name, description, created_by, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(description)
    .bind(created_by)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO group_members (group_id, user_id, joined_at, is_admin) VALUES (?, ?, ?, 1)",
    )
    .bind(group_id)
    .bind(created_by)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(group_id)
}

/// Add a member; adding an existing member is a no-op
pub async fn add_member(pool: &SqlitePool, group_id: GroupId, user_id: UserId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO group_members (group_id, user_id, joined_at, is_admin) VALUES (?, ?, ?, 0)",
    )
    .bind(group_id)
    .bind(user_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Whether `user_id` is a member of `group_id`
pub async fn is_member(pool: &SqlitePool, group_id: GroupId, user_id: UserId) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = ? AND user_id = ?)",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Group name, if the group exists
pub async fn group_name(pool: &SqlitePool, group_id: GroupId) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT group_name FROM groups WHERE group_id = ?")
        .bind(group_id)
        .fetch_optional(pool)
        .await
}

/// Member ids of a group except `exclude`
pub async fn other_members(
    pool: &SqlitePool,
    group_id: GroupId,
    exclude: UserId,
) -> Result<Vec<UserId>, sqlx::Error> {
    sqlx::query_scalar::<_, UserId>(
        "SELECT user_id FROM group_members WHERE group_id = ? AND user_id != ? ORDER BY user_id",
    )
    .bind(group_id)
    .bind(exclude)
    .fetch_all(pool)
    .await
}

/// Store a group message and bump every other member's unread counter
///
/// Both writes commit together or not at all.
///
/// # Returns
/// Id of the stored message
pub async fn record_group_message(
    pool: &SqlitePool,
    group_id: GroupId,
    sender_id: UserId,
    content: &str,
    created_at: &str,
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let message_id = sqlx::query(
        "INSERT INTO group_messages (group_id, user_id, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(group_id)
    .bind(sender_id)
    .bind(content)
    .bind(created_at)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query(
        r#"
        INSERT INTO group_message_notifications (group_id, user_id, unread_count)
        SELECT group_id, user_id, 1
        FROM group_members
        WHERE group_id = ? AND user_id != ?
        ON CONFLICT (group_id, user_id) DO UPDATE SET unread_count = unread_count + 1
        "#,
    )
    .bind(group_id)
    .bind(sender_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(message_id)
}

/// Unread group messages for a member
pub async fn unread_count(pool: &SqlitePool, group_id: GroupId, user_id: UserId) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT unread_count FROM group_message_notifications WHERE group_id = ? AND user_id = ?",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(count.unwrap_or(0))
}
