//! UIDL request/response protocol.
//!
//! [`handler::UidlRequestHandler`] drives one round trip: resolve the UI,
//! apply the client's RPC batch ([`rpc`]), write the state delta
//! ([`uidl_writer`]). Transport, session and UI state are reached only
//! through the traits in [`request`] and [`session`].

pub mod handler;
pub mod log;
pub mod request;
pub mod rpc;
pub mod session;
pub mod uidl_writer;
