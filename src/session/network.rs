//! Wiring between the transport client and the store
//!
//! Status changes and inbound messages flow into the store as actions.
//! Outbound effects produced by the reducer are drained by one background
//! task, which connects first and releases the client when the session is
//! cancelled.

use crate::store::{Action, ConnectionStatus, ConnectionUpdate, Effect, MessagePayload, Sender, Store};
use crate::transport::{InboundMessage, TransportClient, TransportStatus};
use crate::typing::TypingSimulator;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(super) struct NetworkManager {
    pub client: Arc<dyn TransportClient>,
    pub store: Arc<Store>,
    pub typing: Arc<TypingSimulator>,
    pub cancel: CancellationToken,
}

impl NetworkManager {
    /// Register callbacks and spawn the connect/send task
    pub fn start(self, runtime: &Handle) -> JoinHandle<()> {
        self.wire_status();
        self.wire_messages();

        let (effect_tx, effect_rx) = mpsc::unbounded_channel();
        self.store.set_effect_sink(Some(effect_tx));

        runtime.spawn(self.run(effect_rx))
    }

    fn wire_status(&self) {
        let store = self.store.clone();
        let cancel = self.cancel.clone();
        self.client.on_status_change(Arc::new(move |status: TransportStatus| {
            if cancel.is_cancelled() {
                return;
            }
            store.dispatch(Action::connection(&connection_update(status)));
        }));
    }

    fn wire_messages(&self) {
        let store = self.store.clone();
        let typing = self.typing.clone();
        let cancel = self.cancel.clone();
        self.client.on_message(Arc::new(move |message: InboundMessage| {
            if cancel.is_cancelled() {
                tracing::debug!(message_id = ?message.id, "Dropping message after teardown");
                return;
            }
            store.dispatch(Action::add_message(&MessagePayload {
                id: message.id.clone(),
                sender: Some(Sender::Peer),
                text: message.text.clone(),
                rich_content: message.rich_content.clone(),
                timestamp: None,
            }));
            typing.observe(&message);
        }));
    }

    async fn run(self, mut effects: mpsc::UnboundedReceiver<Effect>) {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::debug!("Session ended before connect finished");
            }
            result = self.client.connect() => {
                if let Err(e) = result {
                    self.store.dispatch(Action::connection(&ConnectionUpdate::error(e.message)));
                }
            }
        }

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                effect = effects.recv() => match effect {
                    Some(Effect::Transmit(message)) => {
                        if let Err(e) = self.client.send(&message).await {
                            if self.cancel.is_cancelled() {
                                break;
                            }
                            self.store.dispatch(Action::connection(
                                &ConnectionUpdate::error(e.message),
                            ));
                        }
                    }
                    None => break,
                },
            }
        }

        self.client.close().await;
        tracing::debug!("Network manager stopped");
    }
}

fn connection_update(status: TransportStatus) -> ConnectionUpdate {
    match status {
        TransportStatus::Connecting => ConnectionUpdate::status(ConnectionStatus::Connecting),
        TransportStatus::Connected { channel_id } => {
            ConnectionUpdate::status(ConnectionStatus::Connected).with_channel_id(channel_id)
        }
        TransportStatus::Disconnected => ConnectionUpdate::status(ConnectionStatus::Disconnected),
        TransportStatus::Failed(e) => ConnectionUpdate::error(e.message),
    }
}
