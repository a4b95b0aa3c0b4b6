/**
 * Server Initialization
 *
 * Opens the SQLite pool, applies migrations and wires `AppState`.
 *
 * # Initialization Process
 *
 * 1. Connect to `database_url` (the file is created if missing)
 * 2. Run the embedded migrations from `migrations/`
 * 3. Build the registry, delivery engine, notifier and session resolver
 *
 * The database is required. Startup fails if it cannot be opened.
 */
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::backend::error::BackendError;
use crate::backend::server::config::ServerConfig;
use crate::backend::server::state::AppState;

/// Open the database and run migrations
///
/// # Arguments
/// * `database_url` - sqlx SQLite URL, e.g. `sqlite://socialnet.db`
///
/// # Errors
/// * `BackendError::DatabaseError` - invalid URL or connection failure
/// * `BackendError::MigrationError` - a migration failed to apply
pub async fn connect_database(database_url: &str) -> Result<SqlitePool, BackendError> {
    tracing::info!("[Init] Connecting to database...");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("[Init] Database ready, migrations applied");

    Ok(pool)
}

/// Build the application state from configuration
pub async fn create_state(config: ServerConfig) -> Result<AppState, BackendError> {
    tracing::info!("[Init] Initializing realtime core");
    let pool = connect_database(&config.database_url).await?;
    Ok(AppState::new(pool, config))
}

/// Fresh migrated database in a temporary directory
#[cfg(test)]
pub(crate) async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let pool = connect_database(&url).await.expect("test database");
    (dir, pool)
}
