//! Test-only helpers: scripted UIs, an in-memory session and a recording log.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use tracing::Level;

use crate::core::types::UiId;
use crate::protocol::log::HandlerLog;
use crate::protocol::rpc::RpcInvocation;
use crate::protocol::session::{SessionUis, SyncState, UiState};

/// UI that records applied invocations and reports each one as a change.
#[derive(Debug, Clone)]
pub struct ScriptedUi {
    id: UiId,
    csrf_token: String,
    sync: SyncState,
    applied: Vec<RpcInvocation>,
    pending: Vec<Value>,
    fail_on: Option<String>,
}

impl ScriptedUi {
    pub fn new(id: u32, csrf_token: &str) -> Self {
        Self {
            id: UiId(id),
            csrf_token: csrf_token.to_string(),
            sync: SyncState::new(),
            applied: Vec::new(),
            pending: Vec::new(),
            fail_on: None,
        }
    }

    /// Fail any invocation whose type is `kind`.
    pub fn failing_on(mut self, kind: &str) -> Self {
        self.fail_on = Some(kind.to_string());
        self
    }

    pub fn push_change(&mut self, change: Value) {
        self.pending.push(change);
    }

    pub fn applied(&self) -> &[RpcInvocation] {
        &self.applied
    }

    pub fn applied_kinds(&self) -> Vec<&str> {
        self.applied
            .iter()
            .map(|invocation| invocation.kind.as_str())
            .collect()
    }
}

impl UiState for ScriptedUi {
    fn ui_id(&self) -> UiId {
        self.id
    }

    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    fn sync_state(&mut self) -> &mut SyncState {
        &mut self.sync
    }

    fn apply_invocation(&mut self, invocation: &RpcInvocation) -> Result<()> {
        if self.fail_on.as_deref() == Some(invocation.kind.as_str()) {
            return Err(anyhow!("scripted failure for '{}'", invocation.kind));
        }
        self.applied.push(invocation.clone());
        self.pending.push(json!({"applied": invocation.kind, "node": invocation.node}));
        Ok(())
    }

    fn collect_changes(&mut self) -> Value {
        Value::Array(std::mem::take(&mut self.pending))
    }
}

/// Session holding scripted UIs by id.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    uis: BTreeMap<UiId, ScriptedUi>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ui: ScriptedUi) {
        self.uis.insert(ui.ui_id(), ui);
    }

    pub fn remove(&mut self, id: u32) -> Option<ScriptedUi> {
        self.uis.remove(&UiId(id))
    }

    pub fn ui(&self, id: u32) -> Option<&ScriptedUi> {
        self.uis.get(&UiId(id))
    }
}

impl SessionUis for MemorySession {
    fn find_ui(&mut self, ui_id: UiId) -> Option<&mut dyn UiState> {
        self.uis.get_mut(&ui_id).map(|ui| ui as &mut dyn UiState)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
}

/// Handler log that keeps every record for assertions.
#[derive(Debug, Default)]
pub struct RecordingLog {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingLog {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn levels(&self) -> Vec<Level> {
        self.records()
            .into_iter()
            .map(|record| record.level)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord {
                level,
                message: message.to_string(),
            });
        }
    }
}

impl HandlerLog for RecordingLog {
    fn error(&self, message: &str) {
        self.push(Level::ERROR, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::WARN, message);
    }
}
