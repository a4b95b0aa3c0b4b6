//! Authentication Module
//!
//! Cookie sessions backed by the sessions table.
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs      - Module exports and documentation
//! ├── users.rs    - User model and lookups
//! ├── sessions.rs - Session store and resolver
//! └── handlers/   - Login, logout and status endpoints
//! ```
//!
//! # Authentication Flow
//!
//! 1. **Login**: email + password → bcrypt verify → session row → `session_id` cookie
//! 2. **Upgrade / REST**: cookie → `SessionResolver::resolve` → user id → nickname
//! 3. **Logout**: session row deleted, cookie expired

/// User data model and database operations
pub mod users;

/// Session store and resolver
pub mod sessions;

/// HTTP handlers for authentication endpoints
pub mod handlers;

pub use handlers::{auth_status, login, logout};
pub use sessions::{AuthError, Session, SessionResolver};
