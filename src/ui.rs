//! Widget tree rendering
//!
//! The chat surface is a `ChatContainer` holding a message list and an input
//! area. Rendering produces a plain tree that a [`HostElement`] displays;
//! faults are contained by an [`ErrorBoundary`].

mod mount;
#[cfg(test)]
pub mod testing;

pub use mount::{HostElement, MountedView};

use crate::config::Theme;
use crate::store::{ConnectionStatus, MessageContent, Sender, StoreState};
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Widget tree
// ============================================================================

/// Root of a rendered chat surface
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetTree {
    pub theme: Theme,
    pub message_list: MessageList,
    pub input_area: InputArea,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageList {
    pub items: Vec<MessageView>,
    pub typing_indicator: Option<TypingIndicator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub id: String,
    pub sender: Sender,
    /// Shown next to peer messages only
    pub avatar: Option<String>,
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text(String),
    Rich(Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingIndicator {
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputArea {
    /// Accepts input only while connected
    pub enabled: bool,
    pub status: ConnectionStatus,
    pub notice: Option<String>,
}

// ============================================================================
// Rendering
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderFault {
    #[error("Message {message_id} has rich content that is neither an object nor an array")]
    UnsupportedRichContent { message_id: String },
}

/// Build the widget tree for `state`
pub fn render(state: &StoreState) -> Result<WidgetTree, RenderFault> {
    let avatar = &state.config.avatar;

    let items = state
        .messages
        .iter()
        .map(|message| {
            let body = match &message.content {
                MessageContent::Text { text } => MessageBody::Text(text.clone()),
                MessageContent::Rich { content } if content.is_object() || content.is_array() => {
                    MessageBody::Rich(content.clone())
                }
                MessageContent::Rich { .. } => {
                    return Err(RenderFault::UnsupportedRichContent {
                        message_id: message.id.clone(),
                    })
                }
            };
            Ok(MessageView {
                id: message.id.clone(),
                sender: message.sender,
                avatar: (message.sender == Sender::Peer).then(|| avatar.clone()),
                body,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let typing_indicator = state.typing.then(|| TypingIndicator {
        avatar: avatar.clone(),
    });

    let connection = &state.connection;
    let notice = match connection.status {
        ConnectionStatus::Connected => None,
        ConnectionStatus::Connecting => Some("Connecting...".to_string()),
        ConnectionStatus::Disconnected => Some("Disconnected".to_string()),
        ConnectionStatus::Error => Some(
            connection
                .error
                .clone()
                .unwrap_or_else(|| "Connection failed".to_string()),
        ),
    };

    Ok(WidgetTree {
        theme: state.config.theme.clone(),
        message_list: MessageList {
            items,
            typing_indicator,
        },
        input_area: InputArea {
            enabled: connection.status == ConnectionStatus::Connected,
            status: connection.status,
            notice,
        },
    })
}

/// Turns render faults into an empty surface
///
/// Once faulted the boundary renders nothing for the rest of its life.
#[derive(Debug, Default)]
pub struct ErrorBoundary {
    faulted: bool,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, state: &StoreState) -> Option<WidgetTree> {
        if self.faulted {
            return None;
        }
        match render(state) {
            Ok(tree) => Some(tree),
            Err(fault) => {
                tracing::error!(error = %fault, "Chat surface failed to render, hiding it");
                self.faulted = true;
                None
            }
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::store::{ConnectionState, Message};
    use chrono::Utc;
    use serde_json::json;

    fn message(id: &str, sender: Sender, content: MessageContent) -> Message {
        Message {
            id: id.to_string(),
            sender,
            content,
            timestamp: Utc::now(),
        }
    }

    fn text(id: &str, sender: Sender, body: &str) -> Message {
        message(
            id,
            sender,
            MessageContent::Text {
                text: body.to_string(),
            },
        )
    }

    #[test]
    fn test_render_empty_state() {
        let tree = render(&StoreState::new(SessionConfig::default())).unwrap();

        assert!(tree.message_list.items.is_empty());
        assert!(tree.message_list.typing_indicator.is_none());
        assert!(!tree.input_area.enabled);
        assert_eq!(tree.input_area.notice.as_deref(), Some("Disconnected"));
        assert_eq!(tree.theme, SessionConfig::default().theme);
    }

    #[test]
    fn test_render_messages_in_order_with_peer_avatar() {
        let mut state = StoreState::new(SessionConfig::default());
        state.messages.push(text("1", Sender::User, "hello"));
        state.messages.push(text("2", Sender::Peer, "hi there"));

        let tree = render(&state).unwrap();
        let items = &tree.message_list.items;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].body, MessageBody::Text("hello".to_string()));
        assert_eq!(items[0].avatar, None);
        assert_eq!(items[1].avatar.as_deref(), Some("http://i.pravatar.cc/300"));
    }

    #[test]
    fn test_typing_indicator_and_connected_input() {
        let mut state = StoreState::new(SessionConfig::default());
        state.typing = true;
        state.connection = ConnectionState {
            status: ConnectionStatus::Connected,
            channel_id: Some("abc".to_string()),
            error: None,
        };

        let tree = render(&state).unwrap();

        assert!(tree.message_list.typing_indicator.is_some());
        assert!(tree.input_area.enabled);
        assert_eq!(tree.input_area.notice, None);
    }

    #[test]
    fn test_error_notice_carries_reason() {
        let mut state = StoreState::new(SessionConfig::default());
        state.connection.status = ConnectionStatus::Error;
        state.connection.error = Some("handshake rejected".to_string());

        let tree = render(&state).unwrap();
        assert_eq!(tree.input_area.notice.as_deref(), Some("handshake rejected"));
    }

    #[test]
    fn test_scalar_rich_content_faults() {
        let mut state = StoreState::new(SessionConfig::default());
        state.messages.push(message(
            "bad",
            Sender::Peer,
            MessageContent::Rich { content: json!(42) },
        ));

        assert_eq!(
            render(&state),
            Err(RenderFault::UnsupportedRichContent {
                message_id: "bad".to_string()
            })
        );
    }

    #[test]
    fn test_boundary_stays_faulted() {
        let mut boundary = ErrorBoundary::new();
        let mut state = StoreState::new(SessionConfig::default());
        assert!(boundary.render(&state).is_some());

        state.messages.push(message(
            "bad",
            Sender::Peer,
            MessageContent::Rich {
                content: json!("not a card"),
            },
        ));
        assert!(boundary.render(&state).is_none());
        assert!(boundary.is_faulted());

        // A healthy state does not bring the surface back
        let healthy = StoreState::new(SessionConfig::default());
        assert!(boundary.render(&healthy).is_none());
    }
}
