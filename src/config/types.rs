//! Configuration types
//!
//! Every field is enumerated here and every default lives in one place:
//! the `Default` impls of the resolved types.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://localhost:8080/echo";
pub const DEFAULT_AVATAR: &str = "http://i.pravatar.cc/300";
pub const DEFAULT_RETRANSMISSION_TIMEOUT: Duration = Duration::from_millis(500);

// ============================================================================
// Resolved configuration
// ============================================================================

/// Immutable configuration for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub url: String,
    pub avatar: String,
    pub typing_status: TypingStatus,
    pub network: NetworkConfig,
    /// Opaque menu document handed to the transport client
    pub menu: Value,
    pub theme: Theme,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            avatar: DEFAULT_AVATAR.to_string(),
            typing_status: TypingStatus::default(),
            network: NetworkConfig::default(),
            menu: Value::Object(serde_json::Map::new()),
            theme: Theme::default(),
        }
    }
}

/// Typing indicator timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingStatus {
    pub active: bool,
    pub base_delay: Duration,
    /// Inclusive upper bound of the random extra delay
    pub variance: Duration,
}

impl Default for TypingStatus {
    fn default() -> Self {
        Self {
            active: true,
            base_delay: Duration::from_millis(1000),
            variance: Duration::from_millis(500),
        }
    }
}

impl TypingStatus {
    #[must_use]
    pub fn merged(&self, overrides: &TypingStatusOverrides) -> Self {
        Self {
            active: overrides.active.unwrap_or(self.active),
            base_delay: overrides
                .base_delay
                .map_or(self.base_delay, Duration::from_millis),
            variance: overrides
                .variance
                .map_or(self.variance, Duration::from_millis),
        }
    }
}

/// Network parameters passed through to the transport client
///
/// Only `retransmission_timeout` carries a default; everything else stays
/// `None` unless the caller sets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub channel_id: Option<String>,
    pub address: Option<String>,
    pub start_new: Option<bool>,
    pub retransmission_timeout: Duration,
    pub retransmission_max_timeout: Option<Duration>,
    pub retransmission_attempts: Option<u32>,
    pub schema_version: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            channel_id: None,
            address: None,
            start_new: None,
            retransmission_timeout: DEFAULT_RETRANSMISSION_TIMEOUT,
            retransmission_max_timeout: None,
            retransmission_attempts: None,
            schema_version: None,
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub fn merged(&self, overrides: &NetworkOverrides) -> Self {
        Self {
            channel_id: overrides.channel_id.clone().or_else(|| self.channel_id.clone()),
            address: overrides.address.clone().or_else(|| self.address.clone()),
            start_new: overrides.start_new.or(self.start_new),
            // A zero timeout counts as unset
            retransmission_timeout: match overrides.retransmission_timeout {
                Some(ms) if ms > 0 => Duration::from_millis(ms),
                _ => self.retransmission_timeout,
            },
            retransmission_max_timeout: overrides
                .retransmission_max_timeout
                .map(Duration::from_millis)
                .or(self.retransmission_max_timeout),
            retransmission_attempts: overrides
                .retransmission_attempts
                .or(self.retransmission_attempts),
            schema_version: overrides
                .schema_version
                .clone()
                .or_else(|| self.schema_version.clone()),
        }
    }
}

/// Visual theme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub primary_color: String,
    pub background_color: String,
    pub text_color: String,
    pub user_bubble_color: String,
    pub peer_bubble_color: String,
    pub font_family: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: "#2b7de9".to_string(),
            background_color: "#ffffff".to_string(),
            text_color: "#16161d".to_string(),
            user_bubble_color: "#2b7de9".to_string(),
            peer_bubble_color: "#eeeeee".to_string(),
            font_family: "sans-serif".to_string(),
        }
    }
}

impl Theme {
    #[must_use]
    pub fn merged(&self, overrides: &ThemeOverrides) -> Self {
        let pick = |value: &Option<String>, base: &str| {
            value.clone().unwrap_or_else(|| base.to_string())
        };
        Self {
            primary_color: pick(&overrides.primary_color, &self.primary_color),
            background_color: pick(&overrides.background_color, &self.background_color),
            text_color: pick(&overrides.text_color, &self.text_color),
            user_bubble_color: pick(&overrides.user_bubble_color, &self.user_bubble_color),
            peer_bubble_color: pick(&overrides.peer_bubble_color, &self.peer_bubble_color),
            font_family: pick(&overrides.font_family, &self.font_family),
        }
    }
}

// ============================================================================
// Caller overrides
// ============================================================================

/// Caller-supplied configuration; every field optional
///
/// Field names follow the embedding page's camelCase convention.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PartialSessionConfig {
    pub url: Option<String>,
    pub avatar: Option<String>,
    pub typing_status: Option<TypingStatusOverrides>,
    pub network: Option<NetworkOverrides>,
    pub menu: Option<Value>,
    pub theme: Option<ThemeOverrides>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypingStatusOverrides {
    pub active: Option<bool>,
    /// Milliseconds
    pub base_delay: Option<u64>,
    /// Milliseconds
    pub variance: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetworkOverrides {
    #[serde(alias = "channel_id")]
    pub channel_id: Option<String>,
    pub address: Option<String>,
    pub start_new: Option<bool>,
    /// Milliseconds
    pub retransmission_timeout: Option<u64>,
    /// Milliseconds
    pub retransmission_max_timeout: Option<u64>,
    pub retransmission_attempts: Option<u32>,
    pub schema_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ThemeOverrides {
    pub primary_color: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub user_bubble_color: Option<String>,
    pub peer_bubble_color: Option<String>,
    pub font_family: Option<String>,
}

impl PartialSessionConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    #[must_use]
    pub fn with_typing_status(mut self, typing_status: TypingStatusOverrides) -> Self {
        self.typing_status = Some(typing_status);
        self
    }

    #[must_use]
    pub fn with_network(mut self, network: NetworkOverrides) -> Self {
        self.network = Some(network);
        self
    }

    #[must_use]
    pub fn with_menu(mut self, menu: Value) -> Self {
        self.menu = Some(menu);
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: ThemeOverrides) -> Self {
        self.theme = Some(theme);
        self
    }
}
