//! Middleware Module
//!
//! Request-level helpers shared by the HTTP and WebSocket routes.
//!
//! - **`auth`** - `SessionUser` extractor resolving the `session_id` cookie

pub mod auth;

pub use auth::{session_token, SessionUser, SESSION_COOKIE};
