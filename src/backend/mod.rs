//! Backend Module
//!
//! Server-side code for the social network realtime core: the Axum HTTP
//! server, session authentication, the WebSocket endpoint and its routing
//! tables, and SQLite persistence for messages, groups and notifications.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, database startup, application state
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`auth`** - Users, sessions, login/logout handlers
//! - **`middleware`** - Session cookie extraction
//! - **`realtime`** - Connections, registry, delivery, dispatch, socket task
//! - **`chat`** - Direct message persistence and offline backlog
//! - **`groups`** - Group membership and group message persistence
//! - **`notifications`** - Durable notifications and live pushes
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── auth/           - Authentication
//! ├── middleware/     - Request middleware
//! ├── realtime/       - WebSocket connections and delivery
//! ├── chat/           - Direct messages
//! ├── groups/         - Groups and group messages
//! ├── notifications/  - Notifications
//! └── error/          - Error types
//! ```
//!
//! # State Management
//!
//! `AppState` holds the SQLite pool, the session resolver, the connection
//! registry, the delivery engine and the notifier. Every component is a
//! cheap `Clone` around shared `Arc` data, so handlers and socket tasks each
//! hold their own handle.
//!
//! # Concurrency
//!
//! Each socket runs one reader task and one writer task. The registry is a
//! single `Mutex` that is never held across an `.await`; delivery works on
//! snapshots and writes through bounded per-connection queues.

/// Server setup and configuration
#[cfg(feature = "ssr")]
pub mod server;

/// Route configuration
#[cfg(feature = "ssr")]
pub mod routes;

/// Direct message persistence
#[cfg(feature = "ssr")]
pub mod chat;

/// Groups and group messages
#[cfg(feature = "ssr")]
pub mod groups;

/// Notifications
#[cfg(feature = "ssr")]
pub mod notifications;

/// WebSocket realtime core
#[cfg(feature = "ssr")]
pub mod realtime;

/// Backend error types
#[cfg(feature = "ssr")]
pub mod error;

/// Authentication and user management
#[cfg(feature = "ssr")]
pub mod auth;

/// Middleware for request processing
#[cfg(feature = "ssr")]
pub mod middleware;

/// Re-export commonly used types
#[cfg(feature = "ssr")]
pub use error::BackendError;
#[cfg(feature = "ssr")]
pub use notifications::{NotificationKind, Notifier};
#[cfg(feature = "ssr")]
pub use realtime::{ConnectionRegistry, DeliveryEngine, Dispatcher};
#[cfg(feature = "ssr")]
pub use routes::create_router;
#[cfg(feature = "ssr")]
pub use server::{create_state, AppState, ServerConfig};
