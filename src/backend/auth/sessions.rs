/**
 * Session Store and Resolver
 *
 * Sessions are opaque UUID v4 tokens stored server-side with an absolute
 * expiry. The browser carries the token in the `session_id` cookie; the
 * resolver turns it back into a user id for the WebSocket upgrade and the
 * REST endpoints.
 *
 * # Lifecycle
 *
 * - `create_session` replaces any previous session of the same user
 * - `resolve` rejects unknown, malformed and expired tokens; an expired
 *   session is deleted the first time it is seen
 * - `delete_session` removes the session on logout
 */
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::UserId;

/// Reasons a session token does not resolve to a user
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no session token provided")]
    MissingToken,
    #[error("session token is malformed")]
    MalformedToken,
    #[error("session not found")]
    UnknownSession,
    #[error("session expired")]
    Expired,
    /// Session is valid but its user no longer exists
    #[error("session user not found")]
    UnknownUser,
    /// Configured lifetime pushes the expiry past what timestamps can hold
    #[error("session lifetime out of range")]
    LifetimeOutOfRange,
    #[error("session store error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::LifetimeOutOfRange => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Stored session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// Resolves session tokens against the sessions table
#[derive(Clone)]
pub struct SessionResolver {
    pool: SqlitePool,
    /// `None` when the lifetime does not fit a `chrono::Duration`
    ttl: Option<chrono::Duration>,
}

impl SessionResolver {
    /// Create a resolver issuing sessions that live for `ttl`
    pub fn new(pool: SqlitePool, ttl: std::time::Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).ok();
        Self { pool, ttl }
    }

    /// Resolve a token to the user it belongs to
    ///
    /// # Arguments
    /// * `token` - Raw cookie value
    ///
    /// # Returns
    /// * `Ok(UserId)` - the session exists and has not expired
    /// * `Err(AuthError)` - missing, malformed, unknown or expired token, or store failure
    pub async fn resolve(&self, token: &str) -> Result<UserId, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let token = Uuid::parse_str(token)
            .map_err(|_| AuthError::MalformedToken)?
            .to_string();

        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT user_id, expires_at FROM sessions WHERE session = ?",
        )
        .bind(&token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::UnknownSession)?;

        if row.expires_at <= Utc::now() {
            tracing::debug!("[Auth] Session for user {} expired, deleting", row.user_id);
            self.delete_session(&token).await?;
            return Err(AuthError::Expired);
        }

        Ok(row.user_id)
    }

    /// Create a fresh session for a user
    ///
    /// Any existing session of the user is replaced.
    ///
    /// # Errors
    /// `AuthError::LifetimeOutOfRange` if now + lifetime overflows the
    /// timestamp range; nothing is written in that case.
    pub async fn create_session(&self, user_id: UserId) -> Result<Session, AuthError> {
        let expires_at = self
            .ttl
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or(AuthError::LifetimeOutOfRange)?;
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id,
            expires_at,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO sessions (session, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.token)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("[Auth] Created session for user {}", user_id);
        Ok(session)
    }

    /// Delete a session; unknown tokens are ignored
    pub async fn delete_session(&self, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sessions WHERE session = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert a session with an explicit expiry (used to seed expired sessions)
    pub async fn insert_session(&self, session: &Session) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR REPLACE INTO sessions (session, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.token)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
