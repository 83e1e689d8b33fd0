//! Pure reducer
//!
//! Given the same state, action and context, `reduce` always returns the
//! same transition. I/O is described as [`Effect`]s for the caller to run.

use super::action::{Action, ActionKind, ConnectionUpdate, MessagePayload, PostbackPayload};
use super::state::{ConnectionState, ConnectionStatus, Message, MessageContent, Sender, StoreState};
use crate::transport::{OutboundBody, OutboundMessage};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Result of applying one action
#[derive(Debug)]
pub struct Transition {
    pub new_state: StoreState,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn new(state: StoreState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Work to run after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Hand a message to the transport client
    Transmit(OutboundMessage),
}

/// Values the store supplies per dispatch so the reducer stays pure
#[derive(Debug, Clone)]
pub struct ReduceContext {
    /// Id for a message that arrives without one
    pub message_id: String,
    pub now: DateTime<Utc>,
}

impl ReduceContext {
    pub fn fresh() -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: ActionKind, reason: String },
}

/// Apply `action` to `state`
pub fn reduce(
    state: &StoreState,
    action: &Action,
    context: &ReduceContext,
) -> Result<Transition, ReduceError> {
    match action.kind {
        ActionKind::AddMessage => {
            let payload: MessagePayload = parse_payload(action)?;
            let sender = payload.sender.unwrap_or(Sender::Peer);
            let message = build_message(action.kind, payload, sender, context)?;
            let mut next = state.clone();
            next.messages.push(message);
            Ok(Transition::new(next))
        }

        ActionKind::SendMessage => {
            let payload: MessagePayload = parse_payload(action)?;
            // Outbound messages are always the user's
            let message = build_message(action.kind, payload, Sender::User, context)?;
            let body = match &message.content {
                MessageContent::Text { text } => OutboundBody::Text { text: text.clone() },
                MessageContent::Rich { content } => OutboundBody::Rich {
                    content: content.clone(),
                },
            };
            let outbound = outbound(state, message.id.clone(), body);

            let mut next = state.clone();
            next.messages.push(message);
            Ok(Transition::new(next).with_effect(Effect::Transmit(outbound)))
        }

        ActionKind::SendPostback => {
            let payload: PostbackPayload = parse_payload(action)?;
            let message = Message {
                id: context.message_id.clone(),
                sender: Sender::User,
                content: MessageContent::Text {
                    text: payload.title.clone(),
                },
                timestamp: context.now,
            };
            let outbound = outbound(
                state,
                message.id.clone(),
                OutboundBody::Postback {
                    title: payload.title,
                    payload: payload.payload,
                },
            );

            let mut next = state.clone();
            next.messages.push(message);
            Ok(Transition::new(next).with_effect(Effect::Transmit(outbound)))
        }

        ActionKind::StartTyping => Ok(Transition::new(StoreState {
            typing: true,
            ..state.clone()
        })),

        ActionKind::StopTyping => Ok(Transition::new(StoreState {
            typing: false,
            ..state.clone()
        })),

        ActionKind::UpdateConnection => {
            let update: ConnectionUpdate = parse_payload(action)?;
            let connection = ConnectionState {
                status: update.status,
                channel_id: update
                    .channel_id
                    .or_else(|| state.connection.channel_id.clone()),
                error: match update.status {
                    ConnectionStatus::Error => update
                        .error
                        .or_else(|| Some("Connection failed".to_string())),
                    _ => None,
                },
            };
            Ok(Transition::new(StoreState {
                connection,
                ..state.clone()
            }))
        }
    }
}

fn parse_payload<T: DeserializeOwned>(action: &Action) -> Result<T, ReduceError> {
    serde_json::from_value(action.payload.clone()).map_err(|e| ReduceError::InvalidPayload {
        kind: action.kind,
        reason: e.to_string(),
    })
}

fn build_message(
    kind: ActionKind,
    payload: MessagePayload,
    sender: Sender,
    context: &ReduceContext,
) -> Result<Message, ReduceError> {
    let content = match (payload.text, payload.rich_content) {
        (Some(text), _) => MessageContent::Text { text },
        (None, Some(content)) if !content.is_null() => MessageContent::Rich { content },
        _ => {
            return Err(ReduceError::InvalidPayload {
                kind,
                reason: "message needs text or richContent".to_string(),
            })
        }
    };

    Ok(Message {
        id: payload
            .id
            .unwrap_or_else(|| context.message_id.clone()),
        sender,
        content,
        timestamp: payload.timestamp.unwrap_or(context.now),
    })
}

fn outbound(state: &StoreState, id: String, body: OutboundBody) -> OutboundMessage {
    let network = &state.config.network;
    OutboundMessage {
        id,
        channel_id: state
            .connection
            .channel_id
            .clone()
            .or_else(|| network.channel_id.clone()),
        address: network.address.clone(),
        body,
    }
}

/// Short rendering of a payload for diagnostics
pub(crate) fn payload_summary(payload: &Value) -> String {
    const LIMIT: usize = 120;
    let rendered = payload.to_string();
    if rendered.chars().count() <= LIMIT {
        rendered
    } else {
        let truncated: String = rendered.chars().take(LIMIT).collect();
        format!("{truncated}...")
    }
}
