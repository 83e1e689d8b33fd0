//! Mock transport for testing
//!
//! Records outbound traffic and lets tests inject inbound messages and
//! status changes without real I/O.

use super::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Mock transport client with queued failures
#[allow(dead_code)]
pub struct MockTransport {
    callbacks: TransportCallbacks,
    channel_id: Option<String>,
    connect_error: Mutex<Option<ConnectionError>>,
    send_errors: Mutex<VecDeque<ConnectionError>>,
    sent: Mutex<Vec<OutboundMessage>>,
    connects: AtomicU32,
    closed: AtomicBool,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            callbacks: TransportCallbacks::default(),
            channel_id: None,
            connect_error: Mutex::new(None),
            send_errors: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            connects: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Channel id reported on connect
    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    /// Make the next connect fail
    pub fn fail_connect(&self, error: ConnectionError) {
        *self.connect_error.lock().unwrap() = Some(error);
    }

    /// Queue an error for the next send
    pub fn queue_send_error(&self, error: ConnectionError) {
        self.send_errors.lock().unwrap().push_back(error);
    }

    /// Simulate an inbound message
    pub fn deliver(&self, message: InboundMessage) {
        self.callbacks.emit_message(&message);
    }

    /// Simulate a status change
    pub fn report_status(&self, status: TransportStatus) {
        self.callbacks.emit_status(&status);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportClient for MockTransport {
    async fn connect(&self) -> Result<ConnectionHandle, ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.connect_error.lock().unwrap().take() {
            return Err(error);
        }
        self.callbacks.emit_status(&TransportStatus::Connected {
            channel_id: self.channel_id.clone(),
        });
        Ok(ConnectionHandle {
            channel_id: self.channel_id.clone(),
        })
    }

    fn on_message(&self, callback: MessageCallback) {
        self.callbacks.add_message(callback);
    }

    fn on_status_change(&self, callback: StatusCallback) {
        self.callbacks.add_status(callback);
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::closed("mock transport closed"));
        }
        self.sent.lock().unwrap().push(message.clone());
        match self.send_errors.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(SendOutcome { attempts: 1 }),
        }
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.callbacks.emit_status(&TransportStatus::Disconnected);
        }
    }
}
