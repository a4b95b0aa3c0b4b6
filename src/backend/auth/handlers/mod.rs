//! Authentication Handlers Module
//!
//! # Module Structure
//!
//! ```text
//! handlers/
//! ├── mod.rs   - Module exports and documentation
//! ├── types.rs - Request and response types
//! ├── login.rs - Login and logout handlers
//! └── me.rs    - Session status handler
//! ```
//!
//! # Handlers
//!
//! - **`login`** - POST /api/login - verify credentials, set the `session_id` cookie
//! - **`logout`** - POST /api/logout - delete the session, clear the cookie
//! - **`auth_status`** - GET /api/auth/status - nickname behind the current session
//!
//! # Security
//!
//! - Passwords are verified with bcrypt off the async runtime
//! - Unknown email and wrong password both return 401
//! - The session cookie is `HttpOnly` and `SameSite=Lax`

/// Request and response types
pub mod types;

/// Login and logout handlers
pub mod login;

/// Session status handler
pub mod me;

pub use login::{login, logout};
pub use me::auth_status;
pub use types::{AuthStatusResponse, LoginRequest, LoginResponse};
