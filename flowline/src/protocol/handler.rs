//! UIDL request handler: applies client RPC to server state and answers with
//! the resulting state delta.
//!
//! Every request gets exactly one response, always wrapped in the
//! `for(;;);[...]` envelope:
//!
//! - the UI is gone: communication-error notification;
//! - the message cannot be trusted or applied: all-null notification, which
//!   makes the client refresh;
//! - otherwise: the UIDL delta.
//!
//! Only failures writing the response escape as errors.

use std::io;

use tracing::{debug, instrument};

use crate::core::notification::{CriticalNotification, SystemMessagesProvider};
use crate::core::types::UiId;
use crate::protocol::log::{HandlerLog, TracingLog};
use crate::protocol::request::{
    ProtocolRequest, ProtocolResponse, UI_ID_PARAMETER, commit_json_response, is_uidl_request,
};
use crate::protocol::rpc::{RpcError, RpcHandler};
use crate::protocol::session::SessionUis;
use crate::protocol::uidl_writer::write_uidl;

pub const DEFAULT_UIDL_PATH: &str = "UIDL/";

/// Handler settings, usually taken from [`crate::io::config::FlowlineConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSettings {
    /// Path prefix identifying UIDL requests.
    pub uidl_path: String,
    /// Require every message to echo the UI's security token.
    pub xsrf_protection: bool,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            uidl_path: DEFAULT_UIDL_PATH.to_string(),
            xsrf_protection: true,
        }
    }
}

/// Which response a request produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    UiNotFound,
    Refresh,
    Uidl,
}

pub struct UidlRequestHandler<L: HandlerLog = TracingLog> {
    settings: HandlerSettings,
    messages: SystemMessagesProvider,
    rpc: RpcHandler,
    log: L,
}

impl UidlRequestHandler<TracingLog> {
    /// Handler with default settings and messages, logging through `tracing`.
    pub fn with_defaults() -> Self {
        Self::new(
            HandlerSettings::default(),
            SystemMessagesProvider::default(),
            TracingLog,
        )
    }
}

impl<L: HandlerLog> UidlRequestHandler<L> {
    pub fn new(settings: HandlerSettings, messages: SystemMessagesProvider, log: L) -> Self {
        let rpc = RpcHandler::new(settings.xsrf_protection);
        Self {
            settings,
            messages,
            rpc,
            log,
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn settings(&self) -> &HandlerSettings {
        &self.settings
    }

    /// True if `request` is addressed to this handler. No side effects.
    pub fn can_handle(&self, request: &dyn ProtocolRequest) -> bool {
        is_uidl_request(request, &self.settings.uidl_path)
    }

    /// Handle one UIDL round trip. Always returns `Ok(true)` unless writing
    /// the response fails.
    pub fn handle<S: SessionUis + ?Sized>(
        &self,
        session: &mut S,
        request: &mut dyn ProtocolRequest,
        response: &mut dyn ProtocolResponse,
    ) -> io::Result<bool> {
        self.handle_request(session, request, response)?;
        Ok(true)
    }

    /// Like [`handle`](Self::handle), reporting which response was written.
    #[instrument(skip_all, fields(path = request.path_info(), ui_id = tracing::field::Empty))]
    pub fn handle_request<S: SessionUis + ?Sized>(
        &self,
        session: &mut S,
        request: &mut dyn ProtocolRequest,
        response: &mut dyn ProtocolResponse,
    ) -> io::Result<ResponseKind> {
        let ui_id = ui_id_from(request);
        if let Some(ui_id) = ui_id {
            tracing::Span::current().record("ui_id", ui_id.0);
        }

        let ui = match ui_id {
            Some(ui_id) => session.find_ui(ui_id),
            None => None,
        };
        let Some(ui) = ui else {
            // The UI was closed or the client is stale. Expected, not a fault.
            debug!("UIDL request for missing UI");
            let payload = self.ui_not_found_payload(request.locale());
            commit_json_response(response, &payload)?;
            return Ok(ResponseKind::UiNotFound);
        };

        let (kind, payload) = match self.rpc.handle_rpc(ui, request.body()) {
            Ok(outcome) => {
                debug!(?outcome, "writing UIDL");
                (ResponseKind::Uidl, write_uidl(ui))
            }
            Err(err) => {
                self.report_rpc_failure(&err, request.remote_host());
                (ResponseKind::Refresh, CriticalNotification::refresh().to_payload())
            }
        };

        commit_json_response(response, &payload)?;
        Ok(kind)
    }

    /// Answer a UIDL request that arrived without a valid session.
    ///
    /// Returns `Ok(false)` without writing anything for requests not
    /// addressed to this handler.
    pub fn handle_session_expired(
        &self,
        request: &dyn ProtocolRequest,
        response: &mut dyn ProtocolResponse,
    ) -> io::Result<bool> {
        if !self.can_handle(request) {
            return Ok(false);
        }
        let payload = self
            .messages
            .messages_for(request.locale())
            .session_expired_notification()
            .to_payload();
        commit_json_response(response, &payload)?;
        Ok(true)
    }

    /// Notification sent when the addressed UI does not exist.
    ///
    /// Uses the communication-error messages: the session is alive, only
    /// the UI is gone.
    pub fn ui_not_found_payload(&self, locale: Option<&str>) -> String {
        self.messages
            .messages_for(locale)
            .communication_error_notification()
            .to_payload()
    }

    fn report_rpc_failure(&self, err: &RpcError, remote_host: &str) {
        match err {
            RpcError::Read(_) | RpcError::Json(_) | RpcError::Schema(_) => {
                self.log.error(&format!("Error reading UIDL message: {}", err));
            }
            RpcError::InvalidSecurityKey => {
                self.log.warn(&format!("Invalid security key received from {}", remote_host));
            }
            RpcError::Resynchronize { .. } => {
                self.log.warn(&format!("{} from {}, forcing refresh", err, remote_host));
            }
            RpcError::Invocation { source, .. } => {
                self.log.error(&format!("{}: {:#}", err, source));
            }
        }
    }
}

fn ui_id_from(request: &dyn ProtocolRequest) -> Option<UiId> {
    request
        .parameter(UI_ID_PARAMETER)
        .and_then(|raw| raw.trim().parse().ok())
        .map(UiId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::envelope::unwrap_from_client;
    use crate::protocol::request::{MemoryRequest, MemoryResponse};
    use crate::test_support::{MemorySession, RecordingLog, ScriptedUi};
    use tracing::Level;

    fn handler() -> UidlRequestHandler<RecordingLog> {
        UidlRequestHandler::new(
            HandlerSettings::default(),
            SystemMessagesProvider::default(),
            RecordingLog::default(),
        )
    }

    fn session_with_ui() -> MemorySession {
        let mut session = MemorySession::new();
        session.insert(ScriptedUi::new(1, "token"));
        session
    }

    #[test]
    fn can_handle_is_a_pure_path_check() {
        let handler = handler();
        assert!(handler.can_handle(&MemoryRequest::uidl(1)));
        assert!(!handler.can_handle(&MemoryRequest::new("/static/app.js")));
    }

    #[test]
    fn missing_ui_gets_communication_error() {
        let handler = handler();
        let mut session = MemorySession::new();
        let mut request = MemoryRequest::uidl(9).with_body("garbage");
        let mut response = MemoryResponse::new();

        let handled = handler
            .handle(&mut session, &mut request, &mut response)
            .expect("handle");

        assert!(handled);
        assert_eq!(response.writes(), 1);
        assert!(response.body().starts_with("for(;;);["));
        assert!(response.body().contains("Communication problem"));
        assert!(!response.body().contains("Session Expired"));
        assert!(handler.log().records().is_empty());
    }

    #[test]
    fn unparseable_ui_id_is_treated_as_missing() {
        let handler = handler();
        let mut session = session_with_ui();
        let mut request = MemoryRequest::new("/UIDL/").with_parameter(UI_ID_PARAMETER, "one");
        let mut response = MemoryResponse::new();
        let kind = handler
            .handle_request(&mut session, &mut request, &mut response)
            .expect("handle");
        assert_eq!(kind, ResponseKind::UiNotFound);
    }

    #[test]
    fn malformed_message_logs_error_and_refreshes() {
        let handler = handler();
        let mut session = session_with_ui();
        let mut request = MemoryRequest::uidl(1).with_body("{\"rpc\": [");
        let mut response = MemoryResponse::new();

        let kind = handler
            .handle_request(&mut session, &mut request, &mut response)
            .expect("handle");

        assert_eq!(kind, ResponseKind::Refresh);
        assert_eq!(response.writes(), 1);
        let json = unwrap_from_client(response.body()).expect("envelope");
        assert!(json["meta"]["appError"]["caption"].is_null());
        assert!(json.get("clientId").is_none());
        assert_eq!(handler.log().levels(), vec![Level::ERROR]);
    }

    #[test]
    fn unreadable_body_logs_error_and_refreshes() {
        let handler = handler();
        let mut session = session_with_ui();
        let mut request = MemoryRequest::uidl(1).with_body(vec![0xff, 0xfe, 0xfd]);
        let mut response = MemoryResponse::new();

        let kind = handler
            .handle_request(&mut session, &mut request, &mut response)
            .expect("handle");

        assert_eq!(kind, ResponseKind::Refresh);
        assert_eq!(response.body(), CriticalNotification::refresh().to_payload());
        let records = handler.log().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::ERROR);
        assert!(records[0].message.starts_with("Error reading UIDL message"));
    }

    #[test]
    fn invalid_security_key_logs_warning_and_refreshes() {
        let handler = handler();
        let mut session = session_with_ui();
        let mut request = MemoryRequest::uidl(1)
            .with_remote_host("10.0.0.7")
            .with_body(r#"{"csrfToken":"forged","rpc":[{"type":"event"}]}"#);
        let mut response = MemoryResponse::new();

        let kind = handler
            .handle_request(&mut session, &mut request, &mut response)
            .expect("handle");

        assert_eq!(kind, ResponseKind::Refresh);
        assert_eq!(response.body(), CriticalNotification::refresh().to_payload());
        assert_eq!(handler.log().levels(), vec![Level::WARN]);
        assert!(handler.log().records()[0].message.contains("10.0.0.7"));
        assert!(session.ui(1).expect("ui").applied_kinds().is_empty());
    }

    #[test]
    fn valid_message_applies_once_and_writes_delta() {
        let handler = handler();
        let mut session = session_with_ui();
        let mut request = MemoryRequest::uidl(1).with_body(
            r#"{"csrfToken":"token","clientId":0,"rpc":[{"type":"event","node":2}]}"#,
        );
        let mut response = MemoryResponse::new();

        let kind = handler
            .handle_request(&mut session, &mut request, &mut response)
            .expect("handle");

        assert_eq!(kind, ResponseKind::Uidl);
        assert_eq!(response.writes(), 1);
        let json = unwrap_from_client(response.body()).expect("envelope");
        assert_eq!(json["syncId"], 1);
        assert_eq!(json["clientId"], 1);
        assert_eq!(json["changes"][0]["applied"], "event");
        let ui = session.ui(1).expect("ui");
        assert_eq!(ui.applied_kinds(), vec!["event"]);
        assert!(handler.log().records().is_empty());
    }

    #[test]
    fn session_expired_only_answers_uidl_requests() {
        let handler = handler();
        let mut response = MemoryResponse::new();
        let handled = handler
            .handle_session_expired(&MemoryRequest::new("/static/app.js"), &mut response)
            .expect("expired");
        assert!(!handled);
        assert_eq!(response.writes(), 0);

        let handled = handler
            .handle_session_expired(&MemoryRequest::uidl(1), &mut response)
            .expect("expired");
        assert!(handled);
        assert!(response.body().starts_with("for(;;);["));
        assert!(response.body().contains("Session Expired"));
    }

    #[test]
    fn response_write_failure_propagates() {
        let handler = handler();
        let mut session = MemorySession::new();
        let mut request = MemoryRequest::uidl(1);
        let mut response = MemoryResponse::failing();
        let err = handler
            .handle(&mut session, &mut request, &mut response)
            .expect_err("write fails");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
