//! Serializes the state delta of a UI as a UIDL response.

use serde_json::{Value, json};

use crate::core::envelope::wrap_for_client;
use crate::protocol::session::UiState;

/// Build the UIDL object for everything that changed since the previous
/// round trip. Advances the server sync id.
pub fn create_uidl(ui: &mut dyn UiState) -> Value {
    let changes = ui.collect_changes();
    let sync = ui.sync_state();
    let sync_id = sync.next_server_sync_id();
    json!({
        "syncId": sync_id,
        "clientId": sync.expected_client_id(),
        "changes": changes,
    })
}

/// [`create_uidl`] wrapped in the response envelope.
pub fn write_uidl(ui: &mut dyn UiState) -> String {
    wrap_for_client(&create_uidl(ui))
}
