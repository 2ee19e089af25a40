//! # Ping Bindings
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide test fixtures
//! for `bindscan-core` integration tests. It emulates the module a schema
//! compiler would generate for a `ping.proto` file (definition classes,
//! message classes, legacy registration callables and a real compatibility
//! surface) plus an in-memory loopback transport.
//! It is not intended for production use.

pub mod ping;
pub mod transport;
