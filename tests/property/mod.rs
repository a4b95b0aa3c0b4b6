//! Property-based tests

#![cfg(feature = "ssr")]

mod registry_proptest;
