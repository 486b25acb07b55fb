//! Response envelope shared by every UIDL response variant.

use serde_json::Value;

/// Prefix that makes the payload non-executable as top-level script.
pub const ENVELOPE_PREFIX: &str = "for(;;);[";
pub const ENVELOPE_SUFFIX: &str = "]";

/// Wrap a JSON object as `for(;;);[<json>]`.
pub fn wrap_for_client(json: &Value) -> String {
    format!("{ENVELOPE_PREFIX}{json}{ENVELOPE_SUFFIX}")
}

/// Inverse of [`wrap_for_client`]; `None` if the envelope is missing or the
/// inner JSON does not parse.
pub fn unwrap_from_client(payload: &str) -> Option<Value> {
    let inner = payload
        .strip_prefix(ENVELOPE_PREFIX)?
        .strip_suffix(ENVELOPE_SUFFIX)?;
    serde_json::from_str(inner).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wraps_object_in_single_element_array() {
        let wrapped = wrap_for_client(&json!({"syncId": 3}));
        assert_eq!(wrapped, "for(;;);[{\"syncId\":3}]");
        assert_eq!(unwrap_from_client(&wrapped), Some(json!({"syncId": 3})));
    }

    #[test]
    fn unwrap_rejects_bare_json() {
        assert_eq!(unwrap_from_client("{\"syncId\":3}"), None);
        assert_eq!(unwrap_from_client("for(;;);[{]"), None);
    }
}
