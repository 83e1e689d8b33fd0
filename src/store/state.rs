//! Store state types

use crate::config::SessionConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything the UI reads
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    pub connection: ConnectionState,
    /// Arrival order; entries are never edited or removed
    pub messages: Vec<Message>,
    pub typing: bool,
    pub config: SessionConfig,
}

impl StoreState {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            connection: ConnectionState::default(),
            messages: Vec::new(),
            typing: false,
            config,
        }
    }
}

/// Connection lifecycle as reported by the transport client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Last channel id the transport reported
    pub channel_id: Option<String>,
    /// Reason for the last `Error` status
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Peer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    Rich { content: Value },
}

impl MessageContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text { text } => Some(text),
            MessageContent::Rich { .. } => None,
        }
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
}
