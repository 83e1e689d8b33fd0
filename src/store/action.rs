//! Actions accepted by the store
//!
//! The set of action kinds is closed. The host event bridge registers one
//! listener per kind and the store rejects anything outside the set.

use super::state::{ConnectionStatus, Sender};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Prefix of host page event names; the action type follows it
pub const EVENT_PREFIX: &str = "rwc-dispatch-";

/// Every action kind the store understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Inbound message from the remote party
    AddMessage,
    /// Outbound text or rich message from the user
    SendMessage,
    /// Outbound button/menu selection
    SendPostback,
    StartTyping,
    StopTyping,
    /// Transport status report
    UpdateConnection,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::AddMessage,
        ActionKind::SendMessage,
        ActionKind::SendPostback,
        ActionKind::StartTyping,
        ActionKind::StopTyping,
        ActionKind::UpdateConnection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::AddMessage => "ADD_MESSAGE",
            ActionKind::SendMessage => "SEND_MESSAGE",
            ActionKind::SendPostback => "SEND_POSTBACK",
            ActionKind::StartTyping => "START_TYPING",
            ActionKind::StopTyping => "STOP_TYPING",
            ActionKind::UpdateConnection => "UPDATE_CONNECTION",
        }
    }

    /// Host page event name for this kind, e.g. `rwc-dispatch-ADD_MESSAGE`
    pub fn event_name(self) -> String {
        format!("{EVENT_PREFIX}{}", self.as_str())
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized action type: {0}")]
pub struct UnrecognizedAction(pub String);

impl FromStr for ActionKind {
    type Err = UnrecognizedAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnrecognizedAction(s.to_string()))
    }
}

/// A typed instruction for the store
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub payload: Value,
}

impl Action {
    pub fn new(kind: ActionKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// Build an action from an untyped type string
    pub fn parse(kind: &str, payload: Value) -> Result<Self, UnrecognizedAction> {
        Ok(Self::new(kind.parse()?, payload))
    }

    pub fn add_message(payload: &MessagePayload) -> Self {
        Self::new(ActionKind::AddMessage, to_payload(payload))
    }

    pub fn send_text(text: impl Into<String>) -> Self {
        Self::new(
            ActionKind::SendMessage,
            serde_json::json!({ "text": text.into() }),
        )
    }

    pub fn send_postback(title: impl Into<String>, payload: Value) -> Self {
        Self::new(
            ActionKind::SendPostback,
            to_payload(&PostbackPayload {
                title: title.into(),
                payload,
            }),
        )
    }

    pub fn start_typing() -> Self {
        Self::new(ActionKind::StartTyping, Value::Null)
    }

    pub fn stop_typing() -> Self {
        Self::new(ActionKind::StopTyping, Value::Null)
    }

    pub fn connection(update: &ConnectionUpdate) -> Self {
        Self::new(ActionKind::UpdateConnection, to_payload(update))
    }
}

fn to_payload<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

// ============================================================================
// Payload shapes
// ============================================================================

/// Payload of `ADD_MESSAGE` and `SEND_MESSAGE`
///
/// Exactly one of `text` / `rich_content` is used; `text` wins if both are
/// present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn rich(content: Value) -> Self {
        Self {
            rich_content: Some(content),
            ..Default::default()
        }
    }
}

/// Payload of `SEND_POSTBACK`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostbackPayload {
    pub title: String,
    #[serde(default)]
    pub payload: Value,
}

/// Payload of `UPDATE_CONNECTION`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionUpdate {
    pub status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionUpdate {
    pub fn status(status: ConnectionStatus) -> Self {
        Self {
            status,
            channel_id: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ConnectionStatus::Error,
            channel_id: None,
            error: Some(message.into()),
        }
    }

    #[must_use]
    pub fn with_channel_id(mut self, channel_id: Option<String>) -> Self {
        self.channel_id = channel_id;
        self
    }
}
