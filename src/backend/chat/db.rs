/**
 * Database Operations for Direct Messages
 */
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::shared::ChatMessage;

/// Persisted direct message
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredMessage {
    #[sqlx(rename = "message_id")]
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    #[sqlx(rename = "message")]
    pub text: String,
    pub timestamp: String,
    pub delivered: bool,
}

impl StoredMessage {
    /// Wire payload for replaying this message
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            from: self.sender.clone(),
            to: self.recipient.clone(),
            message: self.text.clone(),
            timestamp: self.timestamp.clone(),
        }
    }
}

/// Save a direct message
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `sender` - Sender nickname
/// * `recipient` - Recipient nickname
/// * `text` - Message body
/// * `timestamp` - RFC 3339 timestamp shown to both sides
///
/// # Returns
/// Id of the stored message
pub async fn save_message(
    pool: &SqlitePool,
    sender: &str,
    recipient: &str,
    text: &str,
    timestamp: &str,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query(
        r#"
        INSERT INTO messages (sender, recipient, message, timestamp, is_read, delivered)
        VALUES (?, ?, ?, ?, 0, 0)
        "#,
    )
    .bind(sender)
    .bind(recipient)
    .bind(text)
    .bind(timestamp)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Messages addressed to `recipient` that were never delivered live, oldest first
pub async fn undelivered_for(pool: &SqlitePool, recipient: &str) -> Result<Vec<StoredMessage>, sqlx::Error> {
    sqlx::query_as::<_, StoredMessage>(
        r#"
        SELECT message_id, sender, recipient, message, timestamp, delivered
        FROM messages
        WHERE recipient = ? AND delivered = 0
        ORDER BY message_id ASC
        "#,
    )
    .bind(recipient)
    .fetch_all(pool)
    .await
}

/// Ids bound per `mark_delivered` statement, well under SQLite's bind limit
const MARK_DELIVERED_CHUNK: usize = 500;

/// Flag messages as delivered
///
/// Large id lists are split into several statements.
///
/// # Returns
/// Number of rows updated
pub async fn mark_delivered(pool: &SqlitePool, ids: &[i64]) -> Result<u64, sqlx::Error> {
    let mut updated = 0;
    for chunk in ids.chunks(MARK_DELIVERED_CHUNK) {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE messages SET delivered = 1 WHERE message_id IN (");
        let mut separated = query.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        updated += query.build().execute(pool).await?.rows_affected();
    }
    Ok(updated)
}

/// Atomically flag one undelivered message as delivered
///
/// # Returns
/// `true` if this call flipped the flag; `false` if the message was already
/// delivered (or does not exist)
pub async fn claim_undelivered(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE messages SET delivered = 1 WHERE message_id = ? AND delivered = 0")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Undo a claim whose frame could not be queued
pub async fn release_claim(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE messages SET delivered = 0 WHERE message_id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Conversation between two nicknames, oldest first
pub async fn conversation(
    pool: &SqlitePool,
    a: &str,
    b: &str,
) -> Result<Vec<StoredMessage>, sqlx::Error> {
    sqlx::query_as::<_, StoredMessage>(
        r#"
        SELECT message_id, sender, recipient, message, timestamp, delivered
        FROM messages
        WHERE (sender = ? AND recipient = ?) OR (sender = ? AND recipient = ?)
        ORDER BY message_id ASC
        "#,
    )
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_all(pool)
    .await
}
