//! Integration tests
//!
//! Each test spawns a real server on an ephemeral port with its own
//! temporary SQLite database.

#![cfg(feature = "ssr")]

#[path = "../common/mod.rs"]
mod common;

mod api;
mod database;
