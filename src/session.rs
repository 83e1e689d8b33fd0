//! Session lifecycle
//!
//! [`SessionOrchestrator::init`] turns a host element and caller overrides
//! into a running chat session: config resolved, store seeded, transport
//! connecting, host events bridged, typing simulated and the surface
//! mounted. [`SessionHandle::teardown`] undoes all of it.

mod network;

use crate::bridge::{EventBridge, HostEvents};
use crate::config::{resolve, PartialSessionConfig, SessionConfig};
use crate::store::{Action, ConnectionStatus, ConnectionUpdate, Store, StoreState};
use crate::transport::{
    ConnectionError, HttpTransport, LoggingTransport, TransportClient, TransportConfig,
};
use crate::typing::{DelaySource, RandomDelay, TypingSimulator};
use crate::ui::{HostElement, MountedView};
use network::NetworkManager;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Host element is missing or cannot be mounted on")]
    InvalidHost,
    #[error("Transport client could not be created: {0}")]
    Transport(#[from] ConnectionError),
    #[error("Session must be started from within a tokio runtime")]
    NoRuntime,
}

/// Inputs to [`SessionOrchestrator::init`]
#[derive(Default)]
pub struct InitOptions {
    pub overrides: PartialSessionConfig,
    /// Replaces the default HTTP client
    pub client: Option<Arc<dyn TransportClient>>,
    pub delay_source: Option<Arc<dyn DelaySource>>,
}

impl InitOptions {
    pub fn new(overrides: PartialSessionConfig) -> Self {
        Self {
            overrides,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn TransportClient>) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn with_delay_source(mut self, delay: Arc<dyn DelaySource>) -> Self {
        self.delay_source = Some(delay);
        self
    }
}

impl From<PartialSessionConfig> for InitOptions {
    fn from(overrides: PartialSessionConfig) -> Self {
        Self::new(overrides)
    }
}

/// Starts chat sessions on one host page
pub struct SessionOrchestrator {
    events: Arc<HostEvents>,
}

impl SessionOrchestrator {
    pub fn new(events: Arc<HostEvents>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &Arc<HostEvents> {
        &self.events
    }

    pub fn init(
        &self,
        host: Option<Arc<dyn HostElement>>,
        options: InitOptions,
    ) -> Result<SessionHandle, InitError> {
        let Some(host) = host.filter(|host| host.is_mountable()) else {
            tracing::error!("Chat session not started: host element is not a valid element");
            return Err(InitError::InvalidHost);
        };

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            tracing::error!("Chat session not started: no async runtime");
            InitError::NoRuntime
        })?;

        let config = resolve(&options.overrides);

        let client: Arc<dyn TransportClient> = match options.client {
            Some(client) => client,
            None => {
                let http = HttpTransport::new(TransportConfig::from(&config)).map_err(|e| {
                    tracing::error!(error = %e, url = %config.url, "Chat session not started");
                    InitError::Transport(e)
                })?;
                Arc::new(LoggingTransport::new(Arc::new(http)))
            }
        };

        let store = Store::new(StoreState::new(config.clone()));
        store.dispatch(Action::connection(&ConnectionUpdate::status(
            ConnectionStatus::Connecting,
        )));

        let typing = Arc::new(TypingSimulator::with_delay_source(
            store.clone(),
            config.typing_status,
            options.delay_source.unwrap_or_else(|| Arc::new(RandomDelay)),
        ));

        let cancel = CancellationToken::new();
        let network = NetworkManager {
            client,
            store: store.clone(),
            typing: typing.clone(),
            cancel: cancel.clone(),
        }
        .start(&runtime);

        let mut bridge = EventBridge::new(self.events.clone());
        bridge.attach(&store);

        let view = MountedView::mount(host, &store);

        tracing::info!(
            url = %config.url,
            channel_id = ?config.network.channel_id,
            typing = config.typing_status.active,
            "Chat session started"
        );

        Ok(SessionHandle {
            config,
            store,
            bridge,
            typing,
            view,
            cancel,
            network: Some(network),
            torn_down: false,
        })
    }
}

/// A running session
pub struct SessionHandle {
    config: SessionConfig,
    store: Arc<Store>,
    bridge: EventBridge,
    typing: Arc<TypingSimulator>,
    view: MountedView,
    cancel: CancellationToken,
    network: Option<JoinHandle<()>>,
    torn_down: bool,
}

impl SessionHandle {
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        !self.torn_down
    }

    /// Send a text message as the user
    pub fn send_text(&self, text: impl Into<String>) {
        if self.torn_down {
            tracing::warn!("Ignoring send on a torn down session");
            return;
        }
        self.store.dispatch(Action::send_text(text));
    }

    /// Stop the session; calling it again does nothing
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.bridge.detach();
        self.typing.cancel();
        self.store.set_effect_sink(None);
        self.cancel.cancel();
        self.view.unmount();

        tracing::info!("Chat session torn down");
    }

    /// Tear down and wait until the transport client is released
    pub async fn shutdown(&mut self) {
        self.teardown();
        if let Some(network) = self.network.take() {
            if let Err(e) = network.await {
                tracing::warn!(error = %e, "Network task ended abnormally");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}
