//! Backend Error Module
//!
//! Error types for the server. Handlers return `Result<_, BackendError>` and
//! the error is rendered as a JSON body with a matching status code.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - IntoResponse implementation
//! ```
//!
//! # Response Format
//!
//! ```json
//! { "error": "Unauthorized", "status": 401 }
//! ```

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::BackendError;
