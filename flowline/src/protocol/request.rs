//! Request/response seams between the protocol handler and the transport.
//!
//! The transport adapter (an embedding HTTP server or a test
//! harness) implements [`ProtocolRequest`] and [`ProtocolResponse`]. The
//! in-memory implementations here back the tests and embedders that buffer
//! whole requests.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};

/// Content type of every UIDL response variant.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Request parameter carrying the addressed UI id.
pub const UI_ID_PARAMETER: &str = "v-uiId";

/// Request parameter naming the request type (`v-r=uidl`).
pub const REQUEST_TYPE_PARAMETER: &str = "v-r";
pub const REQUEST_TYPE_UIDL: &str = "uidl";

/// Inbound request as seen by the protocol handler.
pub trait ProtocolRequest {
    /// Path below the service mount point, e.g. `/UIDL/`.
    fn path_info(&self) -> &str;

    fn parameter(&self, name: &str) -> Option<&str>;

    /// Preferred locale tag (`de-DE`), if the transport knows one.
    fn locale(&self) -> Option<&str>;

    fn remote_host(&self) -> &str;

    /// Request body stream carrying the RPC batch.
    fn body(&mut self) -> &mut dyn Read;
}

/// Outbound response. The handler sets the content type and writes the body
/// exactly once per request.
pub trait ProtocolResponse {
    fn set_content_type(&mut self, content_type: &str);

    fn write_body(&mut self, body: &str) -> io::Result<()>;
}

/// Buffered request.
#[derive(Debug, Clone, Default)]
pub struct MemoryRequest {
    path_info: String,
    parameters: BTreeMap<String, String>,
    locale: Option<String>,
    remote_host: String,
    body: Cursor<Vec<u8>>,
}

impl MemoryRequest {
    pub fn new(path_info: impl Into<String>) -> Self {
        Self {
            path_info: path_info.into(),
            remote_host: "127.0.0.1".to_string(),
            ..Self::default()
        }
    }

    /// Request addressed to the UIDL endpoint for `ui_id`.
    pub fn uidl(ui_id: u32) -> Self {
        Self::new("/UIDL/").with_parameter(UI_ID_PARAMETER, ui_id.to_string())
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_remote_host(mut self, host: impl Into<String>) -> Self {
        self.remote_host = host.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Cursor::new(body.into());
        self
    }
}

impl ProtocolRequest for MemoryRequest {
    fn path_info(&self) -> &str {
        &self.path_info
    }

    fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    fn remote_host(&self) -> &str {
        &self.remote_host
    }

    fn body(&mut self) -> &mut dyn Read {
        &mut self.body
    }
}

/// Buffered response that records every write.
#[derive(Debug, Clone, Default)]
pub struct MemoryResponse {
    content_type: Option<String>,
    body: String,
    writes: usize,
    fail_writes: bool,
}

impl MemoryResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response whose writes fail, for exercising transport errors.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ProtocolResponse for MemoryResponse {
    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    fn write_body(&mut self, body: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "client closed connection",
            ));
        }
        self.writes += 1;
        self.body.push_str(body);
        Ok(())
    }
}

/// Write a JSON payload with the UIDL content type.
pub fn commit_json_response(response: &mut dyn ProtocolResponse, payload: &str) -> io::Result<()> {
    response.set_content_type(JSON_CONTENT_TYPE);
    response.write_body(payload)
}

/// True if `request` targets the UIDL endpoint mounted at `uidl_path`.
///
/// Matches a path info equal to or below `uidl_path` (slashes ignored) or the
/// `v-r=uidl` request parameter.
pub fn is_uidl_request(request: &dyn ProtocolRequest, uidl_path: &str) -> bool {
    if request.parameter(REQUEST_TYPE_PARAMETER) == Some(REQUEST_TYPE_UIDL) {
        return true;
    }
    let prefix = uidl_path.trim_matches('/');
    if prefix.is_empty() {
        return false;
    }
    let path = request.path_info().trim_start_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uidl_path_detection() {
        assert!(is_uidl_request(&MemoryRequest::new("/UIDL/"), "UIDL/"));
        assert!(is_uidl_request(&MemoryRequest::new("UIDL"), "UIDL/"));
        assert!(is_uidl_request(&MemoryRequest::new("/UIDL/extra"), "/UIDL"));
        assert!(!is_uidl_request(&MemoryRequest::new("/UIDLX/"), "UIDL/"));
        assert!(!is_uidl_request(&MemoryRequest::new("/app/UIDL/"), "UIDL/"));
        assert!(!is_uidl_request(&MemoryRequest::new("/"), "UIDL/"));
    }

    #[test]
    fn request_type_parameter_marks_uidl() {
        let request = MemoryRequest::new("/").with_parameter(REQUEST_TYPE_PARAMETER, "uidl");
        assert!(is_uidl_request(&request, "UIDL/"));
        let request = MemoryRequest::new("/").with_parameter(REQUEST_TYPE_PARAMETER, "heartbeat");
        assert!(!is_uidl_request(&request, "UIDL/"));
    }

    #[test]
    fn memory_request_body_is_readable_once() {
        let mut request = MemoryRequest::uidl(1).with_body("{\"rpc\":[]}");
        let mut body = String::new();
        request.body().read_to_string(&mut body).expect("read");
        assert_eq!(body, "{\"rpc\":[]}");
        assert_eq!(request.parameter(UI_ID_PARAMETER), Some("1"));
    }

    #[test]
    fn commit_sets_json_content_type() {
        let mut response = MemoryResponse::new();
        commit_json_response(&mut response, "for(;;);[{}]").expect("commit");
        assert_eq!(response.content_type(), Some(JSON_CONTENT_TYPE));
        assert_eq!(response.body(), "for(;;);[{}]");
        assert_eq!(response.writes(), 1);
    }

    #[test]
    fn failing_response_reports_io_error() {
        let mut response = MemoryResponse::failing();
        let err = commit_json_response(&mut response, "x").expect_err("fails");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(response.writes(), 0);
    }
}
