//! Server Module
//!
//! Configuration, state and startup wiring for the server.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs    - Module exports
//! ├── config.rs - ServerConfig, its builder and ConfigError
//! ├── state.rs  - AppState and FromRef implementations
//! └── init.rs   - Database connection, migrations, state creation
//! ```

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

pub use config::{ConfigError, ServerConfig};
pub use init::create_state;
pub use state::AppState;
