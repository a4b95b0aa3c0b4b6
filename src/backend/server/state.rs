/**
 * Application State Management
 *
 * `AppState` is the central state container handed to every handler and to
 * each connection's socket task. Everything inside is cheap to clone: the
 * pool and the registry are reference-counted handles.
 *
 * # State Extraction
 *
 * `FromRef` implementations let handlers extract just the part they need,
 * e.g. `State(pool): State<SqlitePool>`.
 */
use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::backend::auth::sessions::SessionResolver;
use crate::backend::notifications::Notifier;
use crate::backend::realtime::delivery::DeliveryEngine;
use crate::backend::realtime::registry::ConnectionRegistry;
use crate::backend::server::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub sessions: SessionResolver,
    pub registry: ConnectionRegistry,
    pub delivery: DeliveryEngine,
    pub notifier: Notifier,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the services together around an open pool
    pub fn new(db: SqlitePool, config: ServerConfig) -> Self {
        let registry = ConnectionRegistry::new();
        let delivery = DeliveryEngine::new(registry.clone(), config.write_timeout());
        let notifier = Notifier::new(db.clone(), delivery.clone());
        let sessions = SessionResolver::new(db.clone(), config.session_ttl());
        Self {
            db,
            sessions,
            registry,
            delivery,
            notifier,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for SessionResolver {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for ConnectionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}

impl FromRef<AppState> for Notifier {
    fn from_ref(state: &AppState) -> Self {
        state.notifier.clone()
    }
}
