//! Transport client seam
//!
//! The session core talks to the remote chat endpoint only through
//! [`TransportClient`]. Retransmission parameters are handed to the client
//! untouched; how it uses them is its own business.

mod http;
#[cfg(test)]
pub mod testing;

pub use http::{HttpTransport, RetransmissionPolicy};

use crate::config::SessionConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Transport failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
}

impl ConnectionError {
    pub fn new(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::Unreachable, message)
    }

    pub fn handshake_rejected(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::HandshakeRejected, message)
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::SchemaMismatch, message)
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::Closed, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::InvalidConfig, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Network unreachable or timed out - retryable
    Unreachable,
    /// Endpoint refused the session
    HandshakeRejected,
    /// Endpoint speaks a different schema version
    SchemaMismatch,
    /// Client already released
    Closed,
    /// Client could not be built from the given parameters
    InvalidConfig,
}

impl ConnectionErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Unreachable)
    }
}

// ============================================================================
// Wire-facing types
// ============================================================================

/// Connection parameters, taken verbatim from the session config
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    pub url: String,
    pub channel_id: Option<String>,
    pub address: Option<String>,
    pub start_new: Option<bool>,
    pub retransmission_timeout: Duration,
    pub retransmission_max_timeout: Option<Duration>,
    pub retransmission_attempts: Option<u32>,
    pub schema_version: Option<String>,
    pub menu: Value,
}

impl From<&SessionConfig> for TransportConfig {
    fn from(config: &SessionConfig) -> Self {
        let network = &config.network;
        Self {
            url: config.url.clone(),
            channel_id: network.channel_id.clone(),
            address: network.address.clone(),
            start_new: network.start_new,
            retransmission_timeout: network.retransmission_timeout,
            retransmission_max_timeout: network.retransmission_max_timeout,
            retransmission_attempts: network.retransmission_attempts,
            schema_version: network.schema_version.clone(),
            menu: config.menu.clone(),
        }
    }
}

/// Message on its way to the remote party
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(flatten)]
    pub body: OutboundBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundBody {
    Text { text: String },
    Rich { content: Value },
    Postback { title: String, payload: Value },
}

/// Message reported by the transport
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub rich_content: Option<Value>,
}

impl InboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub channel_id: Option<String>,
}

/// Delivery acceptance; says nothing about end-to-end receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOutcome {
    pub attempts: u32,
}

/// Status changes reported by the transport
#[derive(Debug, Clone)]
pub enum TransportStatus {
    Connecting,
    Connected { channel_id: Option<String> },
    Disconnected,
    Failed(ConnectionError),
}

// ============================================================================
// Client contract
// ============================================================================

pub type MessageCallback = Arc<dyn Fn(InboundMessage) + Send + Sync>;
pub type StatusCallback = Arc<dyn Fn(TransportStatus) + Send + Sync>;

/// Network session with the remote chat endpoint
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Open the session
    async fn connect(&self) -> Result<ConnectionHandle, ConnectionError>;

    /// Register a callback for inbound messages
    fn on_message(&self, callback: MessageCallback);

    /// Register a callback for status changes
    fn on_status_change(&self, callback: StatusCallback);

    /// Hand a message to the transport
    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ConnectionError>;

    /// Release the session; completion is reported as `Disconnected`
    async fn close(&self);
}

#[async_trait]
impl<T: TransportClient + ?Sized> TransportClient for Arc<T> {
    async fn connect(&self) -> Result<ConnectionHandle, ConnectionError> {
        (**self).connect().await
    }

    fn on_message(&self, callback: MessageCallback) {
        (**self).on_message(callback);
    }

    fn on_status_change(&self, callback: StatusCallback) {
        (**self).on_status_change(callback);
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ConnectionError> {
        (**self).send(message).await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}

/// Callback registry shared by client implementations
#[derive(Default)]
pub struct TransportCallbacks {
    message: Mutex<Vec<MessageCallback>>,
    status: Mutex<Vec<StatusCallback>>,
}

impl TransportCallbacks {
    pub fn add_message(&self, callback: MessageCallback) {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    pub fn add_status(&self, callback: StatusCallback) {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    pub fn emit_message(&self, message: &InboundMessage) {
        // Snapshot so callbacks can register more callbacks
        let callbacks = self
            .message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in callbacks {
            callback(message.clone());
        }
    }

    pub fn emit_status(&self, status: &TransportStatus) {
        let callbacks = self
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in callbacks {
            callback(status.clone());
        }
    }
}

// ============================================================================
// Logging decorator
// ============================================================================

/// Logs connect and send outcomes of the wrapped client
pub struct LoggingTransport {
    inner: Arc<dyn TransportClient>,
}

impl LoggingTransport {
    pub fn new(inner: Arc<dyn TransportClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl TransportClient for LoggingTransport {
    async fn connect(&self) -> Result<ConnectionHandle, ConnectionError> {
        let start = std::time::Instant::now();
        let result = self.inner.connect().await;
        let duration = start.elapsed();

        match &result {
            Ok(handle) => {
                tracing::info!(
                    channel_id = ?handle.channel_id,
                    duration_ms = %duration.as_millis(),
                    "Transport connected"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Transport connect failed"
                );
            }
        }

        result
    }

    fn on_message(&self, callback: MessageCallback) {
        self.inner.on_message(callback);
    }

    fn on_status_change(&self, callback: StatusCallback) {
        self.inner.on_status_change(callback);
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ConnectionError> {
        let start = std::time::Instant::now();
        let result = self.inner.send(message).await;
        let duration = start.elapsed();

        match &result {
            Ok(outcome) => {
                tracing::debug!(
                    message_id = %message.id,
                    attempts = outcome.attempts,
                    duration_ms = %duration.as_millis(),
                    "Message accepted by transport"
                );
            }
            Err(e) => {
                tracing::warn!(
                    message_id = %message.id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Message send failed"
                );
            }
        }

        result
    }

    async fn close(&self) {
        tracing::debug!("Releasing transport");
        self.inner.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockTransport;
    use super::*;
    use crate::config::{resolve, NetworkOverrides, PartialSessionConfig};
    use serde_json::json;

    #[test]
    fn test_transport_config_passes_network_through() {
        let config = resolve(
            &PartialSessionConfig::default()
                .with_menu(json!({"items": []}))
                .with_network(NetworkOverrides {
                    channel_id: Some("abc".to_string()),
                    retransmission_max_timeout: Some(8000),
                    retransmission_attempts: Some(3),
                    schema_version: Some("1.1".to_string()),
                    ..Default::default()
                }),
        );
        let transport = TransportConfig::from(&config);

        assert_eq!(transport.url, "http://localhost:8080/echo");
        assert_eq!(transport.channel_id.as_deref(), Some("abc"));
        assert_eq!(transport.retransmission_timeout, Duration::from_millis(500));
        assert_eq!(transport.retransmission_max_timeout, Some(Duration::from_millis(8000)));
        assert_eq!(transport.retransmission_attempts, Some(3));
        assert_eq!(transport.schema_version.as_deref(), Some("1.1"));
        assert_eq!(transport.menu, json!({"items": []}));
    }

    #[test]
    fn test_outbound_wire_shape() {
        let message = OutboundMessage {
            id: "m1".to_string(),
            channel_id: Some("abc".to_string()),
            address: None,
            body: OutboundBody::Postback {
                title: "Yes".to_string(),
                payload: json!({"answer": true}),
            },
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "id": "m1",
                "channelId": "abc",
                "type": "postback",
                "title": "Yes",
                "payload": {"answer": true}
            })
        );
    }

    #[test]
    fn test_callbacks_fire_in_registration_order() {
        let callbacks = TransportCallbacks::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = seen.clone();
            callbacks.add_message(Arc::new(move |m: InboundMessage| {
                seen.lock().unwrap().push(format!("{tag}:{}", m.text.unwrap_or_default()));
            }));
        }

        callbacks.emit_message(&InboundMessage::text("hi"));
        assert_eq!(*seen.lock().unwrap(), vec!["first:hi", "second:hi"]);
    }

    #[tokio::test]
    async fn test_logging_transport_delegates() {
        let mock = Arc::new(MockTransport::new());
        mock.queue_send_error(ConnectionError::unreachable("down"));
        let logging = LoggingTransport::new(mock.clone());

        assert!(logging.connect().await.is_ok());
        let message = OutboundMessage {
            id: "m1".to_string(),
            channel_id: None,
            address: None,
            body: OutboundBody::Text {
                text: "hello".to_string(),
            },
        };
        let err = logging.send(&message).await.unwrap_err();
        assert_eq!(err.kind, ConnectionErrorKind::Unreachable);
        assert!(logging.send(&message).await.is_ok());
        assert_eq!(mock.sent().len(), 2);

        logging.close().await;
        assert!(mock.is_closed());
    }
}
