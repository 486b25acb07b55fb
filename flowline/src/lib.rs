//! Server-side UI plumbing: navigation routing and the UIDL round-trip protocol.
//!
//! - **[`core`]**: Pure, deterministic logic (route entries, the registry and
//!   frozen route table, notifications, the response envelope). No I/O.
//! - **[`protocol`]**: The UIDL request handler. Applies client RPC batches to
//!   UI state and writes state deltas, reaching transport, session and UI
//!   state only through traits.
//! - **[`io`]**: Configuration and route manifest loading.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod protocol;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
