/**
 * Session Authentication
 *
 * `SessionUser` is an axum extractor that reads the `session_id` cookie,
 * resolves it through the session resolver and loads the user's nickname.
 * Any failure rejects the request with 401 before the handler runs, which
 * is how the WebSocket upgrade refuses unauthenticated clients.
 */
use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};

use crate::backend::auth::sessions::AuthError;
use crate::backend::auth::users::get_nickname;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::shared::UserId;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session_id";

/// Authenticated user resolved from the session cookie
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: UserId,
    pub nickname: String,
    /// The raw session token, needed for logout
    pub token: String,
}

/// Value of the session cookie, if present
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AuthError::MissingToken)?;

        let user_id = state.sessions.resolve(&token).await.map_err(|err| {
            tracing::warn!("[Auth] Rejecting session: {}", err);
            err
        })?;

        let nickname = get_nickname(&state.db, user_id)
            .await
            .map_err(AuthError::from)?
            .ok_or_else(|| {
                tracing::warn!("[Auth] Session user {} has no nickname", user_id);
                AuthError::UnknownUser
            })?;

        Ok(SessionUser {
            user_id,
            nickname,
            token,
        })
    }
}
