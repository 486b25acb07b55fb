//! Log capability injected into the protocol handler.
//!
//! Severity is part of the handler's contract (a malformed message is an
//! error, a bad security key a warning), so it is routed through a trait
//! that tests can record instead of a global subscriber.

use tracing::{error, warn};

pub trait HandlerLog: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Forwards to `tracing` under the `flowline::protocol` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl HandlerLog for TracingLog {
    fn error(&self, message: &str) {
        error!(target: "flowline::protocol", "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(target: "flowline::protocol", "{}", message);
    }
}
