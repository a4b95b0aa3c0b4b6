//! Group Membership and Group Messages
//!
//! Membership is the authority for who may subscribe to a group channel.
//! Group messages are stored together with the per-member unread counters
//! in a single transaction.

/// Database operations for groups
pub mod db;
