//! Loading overrides from documents and the environment

use super::{NetworkOverrides, PartialSessionConfig, TypingStatusOverrides};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
}

impl PartialSessionConfig {
    /// Parse a JSON override document
    ///
    /// Keys the override types do not know are dropped with a warning; a
    /// known key holding the wrong type still fails the load.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let mut value: Value = serde_json::from_str(document)?;
        drop_unknown_keys(&mut value);
        Ok(serde_json::from_value(value)?)
    }

    /// Read and parse a JSON override document from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&document)
    }

    /// Apply `RWC_*` environment variables on top of these overrides
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Recognized keys: `RWC_URL`, `RWC_AVATAR`, `RWC_CHANNEL_ID`,
    /// `RWC_ADDRESS`, `RWC_TYPING_ACTIVE`.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("RWC_URL") {
            self.url = Some(url);
        }
        if let Some(avatar) = lookup("RWC_AVATAR") {
            self.avatar = Some(avatar);
        }

        let channel_id = lookup("RWC_CHANNEL_ID");
        let address = lookup("RWC_ADDRESS");
        if channel_id.is_some() || address.is_some() {
            let network = self.network.get_or_insert_with(NetworkOverrides::default);
            if channel_id.is_some() {
                network.channel_id = channel_id;
            }
            if address.is_some() {
                network.address = address;
            }
        }

        if let Some(raw) = lookup("RWC_TYPING_ACTIVE") {
            match parse_flag(&raw) {
                Some(active) => {
                    self.typing_status
                        .get_or_insert_with(TypingStatusOverrides::default)
                        .active = Some(active);
                }
                None => tracing::warn!(value = %raw, "Ignoring invalid RWC_TYPING_ACTIVE"),
            }
        }

        self
    }
}

const TOP_LEVEL_KEYS: &[&str] = &["url", "avatar", "typingStatus", "network", "menu", "theme"];
const TYPING_KEYS: &[&str] = &["active", "baseDelay", "variance"];
const NETWORK_KEYS: &[&str] = &[
    "channelId",
    "channel_id",
    "address",
    "startNew",
    "retransmissionTimeout",
    "retransmissionMaxTimeout",
    "retransmissionAttempts",
    "schemaVersion",
];
const THEME_KEYS: &[&str] = &[
    "primaryColor",
    "backgroundColor",
    "textColor",
    "userBubbleColor",
    "peerBubbleColor",
    "fontFamily",
];

/// Prune keys outside the override schema; `menu` stays opaque
fn drop_unknown_keys(document: &mut Value) {
    retain_known(document, "", TOP_LEVEL_KEYS);
    for (section, known) in [
        ("typingStatus", TYPING_KEYS),
        ("network", NETWORK_KEYS),
        ("theme", THEME_KEYS),
    ] {
        if let Some(value) = document.get_mut(section) {
            retain_known(value, section, known);
        }
    }
}

fn retain_known(value: &mut Value, section: &str, known: &[&str]) {
    let Value::Object(fields) = value else {
        return;
    };
    fields.retain(|key, _| {
        let keep = known.contains(&key.as_str());
        if !keep {
            tracing::warn!(section = %section, key = %key, "Ignoring unknown config key");
        }
        keep
    });
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"url": "https://chat.example.com", "network": {{"channelId": "abc"}}}}"#
        )
        .unwrap();

        let overrides = PartialSessionConfig::from_file(file.path()).unwrap();
        assert_eq!(overrides.url.as_deref(), Some("https://chat.example.com"));
        assert_eq!(
            overrides.network.unwrap().channel_id.as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = PartialSessionConfig::from_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_from_invalid_document() {
        let result = PartialSessionConfig::from_json_str("{\"url\": 42}");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_keys_dropped() {
        let overrides = PartialSessionConfig::from_json_str(
            r#"{
                "url": "http://chat",
                "colour": "red",
                "network": {"channelId": "abc", "channelIdd": "typo"},
                "typingStatus": {"active": false, "speed": 3},
                "menu": {"custom": {"anything": true}}
            }"#,
        )
        .unwrap();

        assert_eq!(overrides.url.as_deref(), Some("http://chat"));
        assert_eq!(overrides.network.unwrap().channel_id.as_deref(), Some("abc"));
        assert_eq!(overrides.typing_status.unwrap().active, Some(false));
        assert_eq!(
            overrides.menu,
            Some(serde_json::json!({"custom": {"anything": true}}))
        );
    }

    #[test]
    fn test_every_known_key_loads() {
        let overrides = PartialSessionConfig::from_json_str(
            r##"{
                "url": "http://chat",
                "avatar": "http://avatar",
                "typingStatus": {"active": true, "baseDelay": 10, "variance": 5},
                "network": {
                    "channelId": "abc",
                    "address": "addr",
                    "startNew": true,
                    "retransmissionTimeout": 100,
                    "retransmissionMaxTimeout": 800,
                    "retransmissionAttempts": 2,
                    "schemaVersion": "1.0"
                },
                "menu": {},
                "theme": {
                    "primaryColor": "#000",
                    "backgroundColor": "#111",
                    "textColor": "#222",
                    "userBubbleColor": "#333",
                    "peerBubbleColor": "#444",
                    "fontFamily": "serif"
                }
            }"##,
        )
        .unwrap();

        let network = overrides.network.unwrap();
        assert_eq!(network.retransmission_attempts, Some(2));
        assert_eq!(network.schema_version.as_deref(), Some("1.0"));
        assert_eq!(overrides.typing_status.unwrap().base_delay, Some(10));
        assert_eq!(overrides.theme.unwrap().font_family.as_deref(), Some("serif"));
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let overrides = PartialSessionConfig::from_json_str(
            r#"{"url": "http://file", "network": {"channelId": "file", "schemaVersion": "2"}}"#,
        )
        .unwrap()
        .with_overrides_from(lookup_from(&[
            ("RWC_URL", "http://env"),
            ("RWC_CHANNEL_ID", "env"),
        ]));

        assert_eq!(overrides.url.as_deref(), Some("http://env"));
        let network = overrides.network.unwrap();
        assert_eq!(network.channel_id.as_deref(), Some("env"));
        assert_eq!(network.schema_version.as_deref(), Some("2"));
    }

    #[test]
    fn test_env_typing_flag() {
        let overrides = PartialSessionConfig::default()
            .with_overrides_from(lookup_from(&[("RWC_TYPING_ACTIVE", "off")]));
        assert_eq!(overrides.typing_status.unwrap().active, Some(false));

        let overrides = PartialSessionConfig::default()
            .with_overrides_from(lookup_from(&[("RWC_TYPING_ACTIVE", "maybe")]));
        assert!(overrides.typing_status.is_none());
    }

    #[test]
    fn test_no_env_leaves_overrides_untouched() {
        let overrides = PartialSessionConfig::default().with_overrides_from(|_| None);
        assert_eq!(overrides, PartialSessionConfig::default());
    }
}
