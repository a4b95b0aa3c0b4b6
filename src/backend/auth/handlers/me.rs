/**
 * Session Status Handler
 *
 * GET /api/auth/status reports who the session cookie belongs to. An
 * invalid or missing session is rejected by the `SessionUser` extractor
 * with 401.
 */
use axum::response::Json;

use crate::backend::auth::handlers::types::AuthStatusResponse;
use crate::backend::middleware::auth::SessionUser;

pub async fn auth_status(user: SessionUser) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        authenticated: true,
        nickname: user.nickname,
    })
}
