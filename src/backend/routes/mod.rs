//! Routes Module
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs             - Module exports
//! ├── router.rs          - Router assembly and HTTP tracing layer
//! ├── realtime_routes.rs - WebSocket upgrade endpoint
//! └── api_routes.rs      - Login, logout, session status, health
//! ```

/// Main router creation
pub mod router;

/// WebSocket route
pub mod realtime_routes;

/// API endpoint handlers
pub mod api_routes;

pub use router::create_router;
