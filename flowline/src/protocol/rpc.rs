//! Client-to-server RPC batch parsing and application.

use std::io::{self, Read};
use std::sync::LazyLock;

use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::protocol::session::UiState;

const UIDL_REQUEST_SCHEMA: &str = include_str!("../../schemas/uidl_request.schema.json");

static UIDL_REQUEST_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(UIDL_REQUEST_SCHEMA).expect("embedded UIDL schema is valid JSON");
    jsonschema::validator_for(&schema).expect("embedded UIDL schema compiles")
});

/// One client-originated invocation, e.g. an event fired on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcInvocation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<u64>,
    /// Remaining invocation fields, passed to the UI untouched.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Client message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_id: Option<i64>,
    pub rpc: Vec<RpcInvocation>,
}

impl RpcBatch {
    /// Parse and schema-check a message body.
    pub fn parse(body: &str) -> Result<Self, RpcError> {
        let value: Value = serde_json::from_str(body)?;
        if !UIDL_REQUEST_VALIDATOR.is_valid(&value) {
            let messages = UIDL_REQUEST_VALIDATOR
                .iter_errors(&value)
                .map(|err| err.to_string())
                .collect::<Vec<_>>();
            return Err(RpcError::Schema(messages.join("; ")));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Failures while applying a client message. Every variant is answered with
/// a refresh instruction; none of them is a server fault.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("could not read request body")]
    Read(#[source] io::Error),

    #[error("malformed UIDL message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UIDL message does not match schema: {0}")]
    Schema(String),

    /// Missing or mismatched per-UI security token.
    #[error("invalid security key")]
    InvalidSecurityKey,

    /// The client is ahead of the server; its view cannot be trusted.
    #[error("unexpected client message id {received}, expected {expected}")]
    Resynchronize { expected: u64, received: u64 },

    #[error("invocation {index} ({kind}) failed")]
    Invocation {
        index: usize,
        kind: String,
        #[source]
        source: anyhow::Error,
    },
}

impl RpcError {
    /// True for unreadable or unparseable message bodies.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Json(_) | Self::Schema(_))
    }
}

/// What happened to a client message that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcOutcome {
    /// Empty body: nothing to apply.
    Empty,
    /// All invocations applied, in order.
    Applied { invocations: usize },
    /// Message id already processed; invocations were not applied again.
    Duplicate { client_id: u64 },
}

/// Applies client messages to UI state.
#[derive(Debug, Clone, Copy)]
pub struct RpcHandler {
    xsrf_protection: bool,
}

impl Default for RpcHandler {
    fn default() -> Self {
        Self {
            xsrf_protection: true,
        }
    }
}

impl RpcHandler {
    pub fn new(xsrf_protection: bool) -> Self {
        Self { xsrf_protection }
    }

    /// Read the message from `body` and apply it to `ui`.
    ///
    /// Checks run before any state changes: parse, schema, security token,
    /// message sequence. The message id is then recorded as processed and the
    /// invocations applied in order; the first failing one stops the batch.
    #[instrument(skip_all, fields(ui_id = %ui.ui_id()))]
    pub fn handle_rpc(
        &self,
        ui: &mut dyn UiState,
        body: &mut dyn Read,
    ) -> Result<RpcOutcome, RpcError> {
        let mut raw = String::new();
        body.read_to_string(&mut raw).map_err(RpcError::Read)?;
        if raw.trim().is_empty() {
            debug!("empty UIDL message");
            return Ok(RpcOutcome::Empty);
        }

        let batch = RpcBatch::parse(&raw)?;

        if self.xsrf_protection && batch.csrf_token.as_deref() != Some(ui.csrf_token()) {
            return Err(RpcError::InvalidSecurityKey);
        }

        if let Some(client_id) = batch.client_id {
            let expected = ui.sync_state().expected_client_id();
            if client_id < expected {
                debug!(client_id, expected, "duplicate UIDL message ignored");
                return Ok(RpcOutcome::Duplicate { client_id });
            }
            if client_id > expected {
                return Err(RpcError::Resynchronize {
                    expected,
                    received: client_id,
                });
            }
        }

        // Recorded before applying: a resend of a batch that failed halfway
        // is a duplicate.
        if let Some(client_id) = batch.client_id {
            ui.sync_state().mark_processed(client_id);
        }

        for (index, invocation) in batch.rpc.iter().enumerate() {
            ui.apply_invocation(invocation)
                .map_err(|source| RpcError::Invocation {
                    index,
                    kind: invocation.kind.clone(),
                    source,
                })?;
        }

        debug!(invocations = batch.rpc.len(), "UIDL message applied");
        Ok(RpcOutcome::Applied {
            invocations: batch.rpc.len(),
        })
    }
}
