/**
 * API Route Handlers
 *
 * # Routes
 *
 * ## Authentication
 * - `POST /api/login` - Start a session
 * - `POST /api/logout` - End the session
 * - `GET /api/auth/status` - Who the session belongs to
 *
 * ## Operations
 * - `GET /health` - Liveness and live connection count
 */
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::backend::auth::{auth_status, login, logout};
use crate::backend::realtime::registry::ConnectionRegistry;
use crate::backend::server::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
}

pub async fn health(State(registry): State<ConnectionRegistry>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: registry.connection_count(),
    })
}

pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/auth/status", get(auth_status))
        .route("/health", get(health))
}
