//! Critical notifications and the system messages they are built from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::envelope::wrap_for_client;

/// User-facing message describing a terminal client-side condition.
///
/// All fields `None` means "no message, just refresh".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalNotification {
    pub caption: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub url: Option<String>,
}

impl CriticalNotification {
    pub fn refresh() -> Self {
        Self::default()
    }

    pub fn is_refresh(&self) -> bool {
        self == &Self::refresh()
    }

    /// Notification as a UIDL object; absent fields are JSON `null`.
    pub fn to_json(&self) -> Value {
        json!({
            "changes": {},
            "resources": {},
            "locales": {},
            "meta": {
                "appError": {
                    "caption": self.caption,
                    "url": self.url,
                    "message": self.message,
                    "details": self.details,
                }
            },
            "syncId": -1,
        })
    }

    /// Notification wrapped in the response envelope.
    pub fn to_payload(&self) -> String {
        wrap_for_client(&self.to_json())
    }
}

/// Message set for communication errors and session expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemMessages {
    pub communication_error_caption: Option<String>,
    pub communication_error_message: Option<String>,
    pub communication_error_url: Option<String>,
    pub session_expired_caption: Option<String>,
    pub session_expired_message: Option<String>,
    pub session_expired_url: Option<String>,
}

impl Default for SystemMessages {
    fn default() -> Self {
        Self {
            communication_error_caption: Some("Communication problem".to_string()),
            communication_error_message: Some(
                "Take note of any unsaved data, and <u>click here</u> or press ESC to continue."
                    .to_string(),
            ),
            communication_error_url: None,
            session_expired_caption: Some("Session Expired".to_string()),
            session_expired_message: Some(
                "Take note of any unsaved data, and <u>click here</u> or press ESC key to continue."
                    .to_string(),
            ),
            session_expired_url: None,
        }
    }
}

impl SystemMessages {
    pub fn communication_error_notification(&self) -> CriticalNotification {
        CriticalNotification {
            caption: self.communication_error_caption.clone(),
            message: self.communication_error_message.clone(),
            details: None,
            url: self.communication_error_url.clone(),
        }
    }

    pub fn session_expired_notification(&self) -> CriticalNotification {
        CriticalNotification {
            caption: self.session_expired_caption.clone(),
            message: self.session_expired_message.clone(),
            details: None,
            url: self.session_expired_url.clone(),
        }
    }
}

/// Resolves [`SystemMessages`] for a request locale.
///
/// Lookup order for `de-DE`: exact tag, then language `de`, then the default.
/// Tags are compared case-insensitively with `_` treated as `-`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemMessagesProvider {
    default: SystemMessages,
    locales: BTreeMap<String, SystemMessages>,
}

impl SystemMessagesProvider {
    pub fn new(default: SystemMessages) -> Self {
        Self {
            default,
            locales: BTreeMap::new(),
        }
    }

    pub fn with_locale(mut self, tag: &str, messages: SystemMessages) -> Self {
        self.locales.insert(normalize_tag(tag), messages);
        self
    }

    pub fn messages_for(&self, locale: Option<&str>) -> &SystemMessages {
        let Some(tag) = locale.map(normalize_tag) else {
            return &self.default;
        };
        if let Some(messages) = self.locales.get(&tag) {
            return messages;
        }
        let language = tag.split('-').next().unwrap_or_default();
        self.locales.get(language).unwrap_or(&self.default)
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}
