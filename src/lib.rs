//! Socialnet - Real-time Core
//!
//! Socialnet is the connection and fan-out core of a social network backend.
//! It authenticates WebSocket connections, keeps a live registry of who is
//! connected and which group channels they listen to, routes inbound chat
//! frames, and pushes notifications to the right live connections.
//!
//! # Module Structure
//!
//! - **`shared`** - Wire types shared by the server and any client
//!   - Inbound/outbound frame envelopes
//!   - Chat and notification payloads
//!   - Error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Session resolution and login endpoints
//!   - Connection registry and delivery engine
//!   - Message dispatcher and notification service
//!   - SQLite persistence through sqlx
//!
//! # Feature Flags
//!
//! - **`ssr`** - Enables the backend modules and the `socialnet-server` binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use socialnet::backend::routes::create_router;
//! use socialnet::backend::server::{config::ServerConfig, init::create_state};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::load()?;
//! let state = create_state(config).await?;
//! let app = create_router(state);
//! // Serve `app` with axum::serve
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The routing tables live behind a single `Mutex` and are only held for the
//! duration of a map operation. Socket writes happen outside the lock through
//! a bounded per-connection queue drained by a writer task.

/// Shared wire types
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
