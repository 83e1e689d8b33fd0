//! Default HTTP transport
//!
//! Posts a handshake and JSON message envelopes to the configured URL.
//! Replies found in a response body are delivered as inbound messages.

use super::{
    ConnectionError, ConnectionHandle, InboundMessage, MessageCallback, OutboundMessage,
    SendOutcome, StatusCallback, TransportCallbacks, TransportClient, TransportConfig,
    TransportStatus,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Per-attempt timeouts for one delivery
///
/// The first attempt waits `initial`; each retransmission doubles the wait,
/// capped at `max` when one is configured. `retransmissions` extra attempts
/// follow the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmissionPolicy {
    pub initial: Duration,
    pub max: Option<Duration>,
    pub retransmissions: u32,
}

impl RetransmissionPolicy {
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            initial: config.retransmission_timeout,
            max: config.retransmission_max_timeout,
            retransmissions: config.retransmission_attempts.unwrap_or(0),
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.retransmissions.saturating_add(1)
    }

    /// Timeout for a 1-based attempt number
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let timeout = self.initial.saturating_mul(factor);
        match self.max {
            Some(max) => timeout.min(max),
            None => timeout,
        }
    }
}

/// HTTP implementation of [`TransportClient`]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    config: TransportConfig,
    policy: RetransmissionPolicy,
    callbacks: TransportCallbacks,
    channel_id: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, ConnectionError> {
        let endpoint = Url::parse(&config.url).map_err(|e| {
            ConnectionError::invalid_config(format!("Invalid chat url {}: {e}", config.url))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConnectionError::invalid_config(format!(
                "Unsupported url scheme: {}",
                endpoint.scheme()
            )));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| ConnectionError::invalid_config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            policy: RetransmissionPolicy::from_config(&config),
            channel_id: Mutex::new(config.channel_id.clone()),
            config,
            callbacks: TransportCallbacks::default(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn policy(&self) -> RetransmissionPolicy {
        self.policy
    }

    fn current_channel_id(&self) -> Option<String> {
        self.channel_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// POST `body`, retransmitting on timeouts, connect failures and 5xx
    async fn post_with_retry<T: Serialize + Sync>(
        &self,
        body: &T,
    ) -> Result<(String, u32), ConnectionError> {
        let mut last_error = ConnectionError::unreachable("No delivery attempted");

        for attempt in 1..=self.policy.total_attempts() {
            if self.closed.load(Ordering::SeqCst) {
                return Err(ConnectionError::closed("Transport released"));
            }

            let timeout = self.policy.timeout_for(attempt);
            let result = self
                .client
                .post(self.endpoint.clone())
                .timeout(timeout)
                .json(body)
                .send()
                .await;

            let error = match result {
                Ok(response) => {
                    let status = response.status();
                    match response.text().await {
                        Ok(text) if status.is_success() => return Ok((text, attempt)),
                        Ok(text) => classify_status(status, &text),
                        Err(e) => read_failure(&e),
                    }
                }
                Err(e) if e.is_timeout() => {
                    ConnectionError::unreachable(format!("Request timeout after {timeout:?}: {e}"))
                }
                Err(e) if e.is_connect() => {
                    ConnectionError::unreachable(format!("Connection failed: {e}"))
                }
                Err(e) => ConnectionError::unreachable(format!("Request failed: {e}")),
            };

            if !error.kind.is_retryable() {
                return Err(error);
            }
            tracing::debug!(
                attempt,
                timeout_ms = %timeout.as_millis(),
                error = %error.message,
                "Delivery attempt failed"
            );
            last_error = error;
        }

        Err(last_error)
    }

    fn deliver_replies(&self, replies: Vec<InboundMessage>) {
        for reply in replies {
            self.callbacks.emit_message(&reply);
        }
    }
}

fn classify_status(status: StatusCode, body: &str) -> ConnectionError {
    match status.as_u16() {
        400..=499 => ConnectionError::handshake_rejected(format!("HTTP {status}: {body}")),
        _ => ConnectionError::unreachable(format!("HTTP {status}: {body}")),
    }
}

/// Body lost mid-transfer; worth another attempt
fn read_failure(error: &reqwest::Error) -> ConnectionError {
    ConnectionError::unreachable(format!("Failed to read response: {error}"))
}

/// Replies carried in a response body, if it has any recognizable shape
fn parse_replies(body: &str) -> Vec<InboundMessage> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };
    if value.get("messages").is_some() {
        serde_json::from_value::<ReplyEnvelope>(value)
            .map(|envelope| envelope.messages)
            .unwrap_or_default()
    } else if value.get("text").is_some() || value.get("richContent").is_some() {
        serde_json::from_value::<InboundMessage>(value)
            .map(|message| vec![message])
            .unwrap_or_default()
    } else {
        Vec::new()
    }
}

#[async_trait]
impl TransportClient for HttpTransport {
    async fn connect(&self) -> Result<ConnectionHandle, ConnectionError> {
        self.closed.store(false, Ordering::SeqCst);
        self.callbacks.emit_status(&TransportStatus::Connecting);

        let handshake = Handshake {
            kind: "handshake",
            channel_id: self.current_channel_id(),
            address: self.config.address.clone(),
            start_new: self.config.start_new,
            schema_version: self.config.schema_version.clone(),
            menu: &self.config.menu,
        };

        let result = self.post_with_retry(&handshake).await.and_then(|(body, _)| {
            let response: HandshakeResponse = serde_json::from_str(&body).unwrap_or_default();
            if let (Some(expected), Some(actual)) =
                (&self.config.schema_version, &response.schema_version)
            {
                if expected != actual {
                    return Err(ConnectionError::schema_mismatch(format!(
                        "Endpoint speaks schema {actual}, expected {expected}"
                    )));
                }
            }
            Ok(response)
        });

        match result {
            Ok(response) => {
                let channel_id = response.channel_id.or_else(|| self.current_channel_id());
                *self.channel_id.lock().unwrap_or_else(PoisonError::into_inner) =
                    channel_id.clone();
                self.callbacks.emit_status(&TransportStatus::Connected {
                    channel_id: channel_id.clone(),
                });
                self.deliver_replies(response.messages);
                Ok(ConnectionHandle { channel_id })
            }
            Err(e) => {
                self.callbacks.emit_status(&TransportStatus::Failed(e.clone()));
                Err(e)
            }
        }
    }

    fn on_message(&self, callback: MessageCallback) {
        self.callbacks.add_message(callback);
    }

    fn on_status_change(&self, callback: StatusCallback) {
        self.callbacks.add_status(callback);
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::closed("Transport released"));
        }

        let mut envelope = message.clone();
        if envelope.channel_id.is_none() {
            envelope.channel_id = self.current_channel_id();
        }

        let (body, attempts) = self.post_with_retry(&envelope).await?;
        self.deliver_replies(parse_replies(&body));
        Ok(SendOutcome { attempts })
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.callbacks.emit_status(&TransportStatus::Disconnected);
        }
    }
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Handshake<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_new: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<String>,
    menu: &'a Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandshakeResponse {
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    schema_version: Option<String>,
    #[serde(default)]
    messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyEnvelope {
    messages: Vec<InboundMessage>,
}
