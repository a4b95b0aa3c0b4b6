/**
 * Login and Logout Handlers
 *
 * # Authentication Process
 *
 * 1. Look up user by email
 * 2. Verify password using bcrypt
 * 3. Create a session (replacing any previous one)
 * 4. Set the `session_id` cookie
 */
use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Json, Response},
};

use crate::backend::auth::handlers::types::{LoginRequest, LoginResponse};
use crate::backend::auth::users::get_user_by_email;
use crate::backend::error::BackendError;
use crate::backend::middleware::auth::{SessionUser, SESSION_COOKIE};
use crate::backend::server::state::AppState;

/// Login handler
///
/// # Errors
///
/// * `401 Unauthorized` - unknown email or wrong password
/// * `500 Internal Server Error` - database or session store failure
///
/// # Example Request
///
/// ```http
/// POST /api/login HTTP/1.1
/// Content-Type: application/json
///
/// { "email": "alice@example.com", "password": "hunter22" }
/// ```
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, BackendError> {
    let user = get_user_by_email(&state.db, request.email.trim())
        .await?
        .ok_or_else(|| {
            tracing::info!("[Auth] Login for unknown email");
            BackendError::unauthenticated("Invalid email or password")
        })?;

    let hash = user.password_hash.clone();
    let password = request.password;
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|err| BackendError::handler(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
        .unwrap_or(false);
    if !verified {
        tracing::info!("[Auth] Wrong password for user {}", user.id);
        return Err(BackendError::unauthenticated("Invalid email or password"));
    }

    let session = state.sessions.create_session(user.id).await?;
    tracing::info!("[Auth] {} logged in", user.nickname);

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session.token, state.config.session_ttl_secs
    );
    let body = LoginResponse {
        message: "Login successful".to_string(),
        nickname: user.nickname,
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Logout handler
///
/// Deletes the session behind the cookie and expires the cookie.
pub async fn logout(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Response, BackendError> {
    state.sessions.delete_session(&user.token).await?;
    tracing::info!("[Auth] {} logged out", user.nickname);

    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(serde_json::json!({ "message": "Logout successful" })),
    )
        .into_response())
}
