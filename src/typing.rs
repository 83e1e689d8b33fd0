//! Simulated typing presence
//!
//! Every inbound message turns the typing flag on and schedules it off again
//! after `base_delay` plus a random share of `variance`. A newer message
//! replaces the pending reset.

use crate::config::TypingStatus;
use crate::store::{Action, Store};
use crate::transport::InboundMessage;
use rand::Rng;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Picks how long the typing flag stays on
pub trait DelaySource: Send + Sync {
    fn delay(&self, base: Duration, variance: Duration) -> Duration;
}

impl<F> DelaySource for F
where
    F: Fn(Duration, Duration) -> Duration + Send + Sync,
{
    fn delay(&self, base: Duration, variance: Duration) -> Duration {
        self(base, variance)
    }
}

/// `base + uniform(0..=variance)`
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomDelay;

impl DelaySource for RandomDelay {
    fn delay(&self, base: Duration, variance: Duration) -> Duration {
        let variance_ms = u64::try_from(variance.as_millis()).unwrap_or(u64::MAX);
        let jitter = rand::thread_rng().gen_range(0..=variance_ms);
        base.saturating_add(Duration::from_millis(jitter))
    }
}

#[derive(Default)]
struct PendingReset {
    generation: u64,
    token: Option<CancellationToken>,
}

pub struct TypingSimulator {
    store: Arc<Store>,
    settings: TypingStatus,
    delay: Arc<dyn DelaySource>,
    pending: Arc<Mutex<PendingReset>>,
}

impl TypingSimulator {
    pub fn new(store: Arc<Store>, settings: TypingStatus) -> Self {
        Self::with_delay_source(store, settings, Arc::new(RandomDelay))
    }

    pub fn with_delay_source(
        store: Arc<Store>,
        settings: TypingStatus,
        delay: Arc<dyn DelaySource>,
    ) -> Self {
        Self {
            store,
            settings,
            delay,
            pending: Arc::new(Mutex::new(PendingReset::default())),
        }
    }

    pub fn is_active(&self) -> bool {
        self.settings.active
    }

    /// React to an inbound message
    pub fn observe(&self, message: &InboundMessage) {
        if !self.settings.active {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, typing indicator not shown");
            return;
        };

        let delay = self
            .delay
            .delay(self.settings.base_delay, self.settings.variance);
        let token = CancellationToken::new();

        let generation = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = pending.token.replace(token.clone()) {
                previous.cancel();
            }
            pending.generation += 1;
            pending.generation
        };

        tracing::debug!(
            message_id = ?message.id,
            delay_ms = %delay.as_millis(),
            "Peer typing"
        );
        self.store.dispatch(Action::start_typing());

        let store = self.store.clone();
        let pending = self.pending.clone();
        runtime.spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    {
                        let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
                        if pending.generation != generation {
                            return;
                        }
                        pending.token = None;
                    }
                    store.dispatch(Action::stop_typing());

                    // A message that arrived between the check and the reset
                    // keeps the indicator on until its own reset fires
                    let newer_pending = {
                        let pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
                        pending.generation != generation && pending.token.is_some()
                    };
                    if newer_pending {
                        store.dispatch(Action::start_typing());
                    }
                }
            }
        });
    }

    /// Drop the pending reset, if any
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.generation += 1;
        if let Some(token) = pending.token.take() {
            token.cancel();
            tracing::debug!("Pending typing reset cancelled");
        }
    }
}

impl Drop for TypingSimulator {
    fn drop(&mut self) {
        self.cancel();
    }
}
