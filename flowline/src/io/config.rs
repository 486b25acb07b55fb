//! Service configuration stored in `flowline.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::notification::{SystemMessages, SystemMessagesProvider};
use crate::protocol::handler::{DEFAULT_UIDL_PATH, HandlerSettings};

/// Flowline configuration (TOML).
///
/// Missing fields default to the values a stock deployment uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FlowlineConfig {
    /// Path prefix of the UIDL endpoint.
    pub uidl_path: String,

    /// Reject RPC batches that do not echo the UI's security token.
    pub xsrf_protection: bool,

    /// Route manifest, relative to the directory of the config file.
    pub routes: Option<PathBuf>,

    pub messages: MessagesConfig,
}

/// User-facing notification texts.
///
/// Each locale table is complete on its own: fields it leaves out take the
/// built-in English defaults, not the values of `[messages.default]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MessagesConfig {
    pub default: SystemMessages,
    /// Keyed by locale tag (`de`, `pt-BR`).
    pub locales: BTreeMap<String, SystemMessages>,
}

impl Default for FlowlineConfig {
    fn default() -> Self {
        Self {
            uidl_path: DEFAULT_UIDL_PATH.to_string(),
            xsrf_protection: true,
            routes: None,
            messages: MessagesConfig::default(),
        }
    }
}

impl FlowlineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.uidl_path.trim().trim_matches('/').is_empty() {
            return Err(anyhow!("uidl_path must name a non-empty path segment"));
        }
        if let Some(tag) = self.messages.locales.keys().find(|tag| tag.trim().is_empty()) {
            return Err(anyhow!("messages.locales has an empty locale tag '{}'", tag));
        }
        Ok(())
    }

    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            uidl_path: self.uidl_path.clone(),
            xsrf_protection: self.xsrf_protection,
        }
    }

    pub fn messages_provider(&self) -> SystemMessagesProvider {
        self.messages.locales.iter().fold(
            SystemMessagesProvider::new(self.messages.default.clone()),
            |provider, (tag, messages)| provider.with_locale(tag, messages.clone()),
        )
    }

    /// Route manifest path resolved against the config file location.
    pub fn routes_path(&self, config_path: &Path) -> Option<PathBuf> {
        let routes = self.routes.as_ref()?;
        if routes.is_absolute() {
            return Some(routes.clone());
        }
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        Some(base.join(routes))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FlowlineConfig::default()`.
pub fn load_config(path: &Path) -> Result<FlowlineConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = FlowlineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FlowlineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    debug!(path = %path.display(), uidl_path = %cfg.uidl_path, "config loaded");
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FlowlineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, FlowlineConfig::default());
        assert_eq!(cfg.handler_settings(), HandlerSettings::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("flowline.toml");
        let mut cfg = FlowlineConfig::default();
        cfg.messages.locales.insert(
            "de".to_string(),
            SystemMessages {
                session_expired_caption: Some("Sitzung abgelaufen".to_string()),
                ..SystemMessages::default()
            },
        );
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_message_tables_keep_builtin_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("flowline.toml");
        fs::write(
            &path,
            r#"
uidl_path = "/rpc/"
xsrf_protection = false

[messages.locales.de]
communication_error_caption = "Kommunikationsproblem"
"#,
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        let settings = cfg.handler_settings();
        assert_eq!(settings.uidl_path, "/rpc/");
        assert!(!settings.xsrf_protection);

        let provider = cfg.messages_provider();
        let german = provider.messages_for(Some("de-AT"));
        assert_eq!(
            german.communication_error_caption.as_deref(),
            Some("Kommunikationsproblem")
        );
        assert_eq!(german.session_expired_caption.as_deref(), Some("Session Expired"));
    }

    #[test]
    fn rejects_empty_uidl_path() {
        let cfg = FlowlineConfig {
            uidl_path: "/".to_string(),
            ..FlowlineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn routes_path_is_relative_to_config() {
        let cfg = FlowlineConfig {
            routes: Some(PathBuf::from("routes.toml")),
            ..FlowlineConfig::default()
        };
        assert_eq!(
            cfg.routes_path(Path::new("/srv/app/flowline.toml")),
            Some(PathBuf::from("/srv/app/routes.toml"))
        );
        assert_eq!(FlowlineConfig::default().routes_path(Path::new("x.toml")), None);
    }
}
