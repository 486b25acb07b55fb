//! Deterministic, pure logic for routing and response payloads.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod envelope;
pub mod errors;
pub mod notification;
pub mod route_pattern;
pub mod route_registry;
pub mod route_target;
pub mod types;
