//! Direct Chat Persistence
//!
//! Direct messages are stored before they are pushed, keyed by sender and
//! recipient nickname. A `delivered` flag tracks whether the recipient has
//! seen the message live; anything still undelivered is replayed as a
//! backlog when the recipient next connects.

/// Database operations for direct messages
pub mod db;

pub use db::StoredMessage;
