//! Session and UI seams consumed by the protocol handler.
//!
//! Session lifecycle, UI construction and component state live outside this
//! crate. The surrounding session layer serializes access so that at most one
//! request per UI is in flight; nothing here locks.

use serde_json::Value;

use crate::core::types::UiId;
use crate::protocol::rpc::RpcInvocation;

/// Message sequencing for one UI.
///
/// Clients number their messages from zero. The server numbers every UIDL
/// response it writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    last_processed_client_id: Option<u64>,
    server_sync_id: u64,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next client message must carry.
    pub fn expected_client_id(&self) -> u64 {
        self.last_processed_client_id.map_or(0, |id| id + 1)
    }

    pub fn last_processed_client_id(&self) -> Option<u64> {
        self.last_processed_client_id
    }

    pub fn mark_processed(&mut self, client_id: u64) {
        self.last_processed_client_id = Some(client_id);
    }

    /// Id of the last UIDL response written, zero before the first one.
    pub fn server_sync_id(&self) -> u64 {
        self.server_sync_id
    }

    /// Advance and return the id for the next UIDL response.
    pub fn next_server_sync_id(&mut self) -> u64 {
        self.server_sync_id += 1;
        self.server_sync_id
    }
}

/// Server-side state of one UI instance.
pub trait UiState {
    fn ui_id(&self) -> UiId;

    /// Per-UI security token every RPC batch must echo.
    fn csrf_token(&self) -> &str;

    fn sync_state(&mut self) -> &mut SyncState;

    /// Apply one client invocation to component state.
    fn apply_invocation(&mut self, invocation: &RpcInvocation) -> anyhow::Result<()>;

    /// Changes accumulated since the previous call. The payload is written to
    /// the client verbatim.
    fn collect_changes(&mut self) -> Value;
}

/// The UIs owned by one session.
pub trait SessionUis {
    fn find_ui(&mut self, ui_id: UiId) -> Option<&mut dyn UiState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_client_id_starts_at_zero() {
        let mut sync = SyncState::new();
        assert_eq!(sync.expected_client_id(), 0);
        sync.mark_processed(0);
        assert_eq!(sync.expected_client_id(), 1);
        assert_eq!(sync.last_processed_client_id(), Some(0));
    }

    #[test]
    fn server_sync_id_increments_per_response() {
        let mut sync = SyncState::new();
        assert_eq!(sync.server_sync_id(), 0);
        assert_eq!(sync.next_server_sync_id(), 1);
        assert_eq!(sync.next_server_sync_id(), 2);
        assert_eq!(sync.server_sync_id(), 2);
    }
}
