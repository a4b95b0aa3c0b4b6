/**
 * User Model and Database Operations
 *
 * Users are addressed by numeric `uid` in storage and by `nickname` on the
 * wire. Registration and profile management live outside this crate; only
 * the lookups the realtime core needs are provided, plus `create_user` for
 * seeding.
 */
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::shared::UserId;

/// User row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    #[sqlx(rename = "uid")]
    pub id: UserId,
    /// Unique display handle used to address direct messages
    pub nickname: String,
    pub email: String,
    /// Hashed password (bcrypt)
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Create a new user
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `nickname` - Unique nickname
/// * `email` - Unique email
/// * `password_hash` - bcrypt hash of the password
///
/// # Returns
/// Created user or error (a duplicate nickname/email is a unique violation)
pub async fn create_user(
    pool: &SqlitePool,
    nickname: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    let uid = sqlx::query(
        r#"
        INSERT INTO users (nickname, email, password, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(nickname)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(User {
        id: uid,
        nickname: nickname.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at: now,
    })
}

/// Get user by email
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT uid, nickname, email, password, created_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Get user by ID
pub async fn get_user_by_id(pool: &SqlitePool, id: UserId) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT uid, nickname, email, password, created_at FROM users WHERE uid = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Nickname for a user id
pub async fn get_nickname(pool: &SqlitePool, id: UserId) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT nickname FROM users WHERE uid = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// User id for a nickname
pub async fn get_user_id_by_nickname(
    pool: &SqlitePool,
    nickname: &str,
) -> Result<Option<UserId>, sqlx::Error> {
    sqlx::query_scalar::<_, UserId>("SELECT uid FROM users WHERE nickname = ?")
        .bind(nickname)
        .fetch_optional(pool)
        .await
}
