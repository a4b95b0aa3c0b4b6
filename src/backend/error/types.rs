/**
 * Backend Error Types
 *
 * # Error Categories
 *
 * - `HandlerError` - request-level failures with an explicit status code
 * - `AuthError` - session resolution failures (401, or 500 when the store fails)
 * - `DatabaseError` / `MigrationError` - persistence failures (500)
 * - `ConfigError` - invalid server configuration at startup
 * - `SharedError` / `SerializationError` - frame and JSON failures
 */
use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::auth::sessions::AuthError;
use crate::backend::server::config::ConfigError;
use crate::shared::SharedError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use socialnet::backend::error::BackendError;
/// use axum::http::StatusCode;
///
/// let err = BackendError::handler(StatusCode::BAD_REQUEST, "Invalid request");
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
///
/// let err = BackendError::unauthenticated("Invalid password");
/// assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error with an explicit status code
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Session could not be resolved to a user
    #[error(transparent)]
    AuthError(#[from] AuthError),

    /// Query or connection failure
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Schema migration failure at startup
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// Invalid configuration at startup
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error(transparent)]
    SharedError(#[from] SharedError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status code
    /// * `message` - Error message returned to the client
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// 401 with the given message
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::UNAUTHORIZED, message)
    }

    /// 400 with the given message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::handler(StatusCode::BAD_REQUEST, message)
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `AuthError` - 401, except a failing session store which is 500
    /// - `DatabaseError` / `MigrationError` / `ConfigError` - 500
    /// - `SharedError` - 400, except serialization failures which are 500
    /// - `SerializationError` - 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::AuthError(err) => err.status_code(),
            Self::DatabaseError(_) | Self::MigrationError(_) | Self::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::PayloadError { .. } | SharedError::ValidationError { .. } => {
                    StatusCode::BAD_REQUEST
                }
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the client
    ///
    /// Server-side failures are reported generically; the detail goes to the log.
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::AuthError(err) if err.status_code() == StatusCode::UNAUTHORIZED => {
                "Unauthorized".to_string()
            }
            Self::SharedError(err) if self.status_code() == StatusCode::BAD_REQUEST => {
                err.to_string()
            }
            _ => "Internal server error".to_string(),
        }
    }
}
