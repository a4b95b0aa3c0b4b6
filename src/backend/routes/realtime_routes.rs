/**
 * Realtime Routes
 *
 * - `GET /ws` - WebSocket upgrade; requires the `session_id` cookie
 */
use axum::{routing::get, Router};

use crate::backend::realtime::socket::ws_upgrade;
use crate::backend::server::state::AppState;

pub fn configure_realtime_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/ws", get(ws_upgrade))
}
