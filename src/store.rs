//! Shared session state
//!
//! The store is the only place session state changes. Every change goes
//! through [`Store::dispatch`], which runs the pure reducer, swaps in the new
//! snapshot and then notifies listeners in subscription order.

pub mod action;
mod reduce;
pub mod state;

#[cfg(test)]
mod proptests;

pub use action::{
    Action, ActionKind, ConnectionUpdate, MessagePayload, PostbackPayload, UnrecognizedAction,
    EVENT_PREFIX,
};
pub use reduce::{reduce, Effect, ReduceContext, ReduceError, Transition};
pub use state::{ConnectionState, ConnectionStatus, Message, MessageContent, Sender, StoreState};

use futures::stream::Stream;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

pub type Listener = Arc<dyn Fn(&StoreState) + Send + Sync>;

/// Observable state container
pub struct Store {
    state: Mutex<Arc<StoreState>>,
    queue: Mutex<DispatchQueue>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    effect_tx: Mutex<Option<mpsc::UnboundedSender<Effect>>>,
    changes_tx: broadcast::Sender<Arc<StoreState>>,
}

impl Store {
    pub fn new(initial: StoreState) -> Arc<Self> {
        let (changes_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            state: Mutex::new(Arc::new(initial)),
            queue: Mutex::new(DispatchQueue::default()),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            effect_tx: Mutex::new(None),
            changes_tx,
        })
    }

    /// Current snapshot
    pub fn state(&self) -> Arc<StoreState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply a typed action
    ///
    /// Actions are applied one at a time in arrival order. An action
    /// dispatched while another dispatch is running (from a listener or
    /// another thread) is queued and applied by the running dispatcher, so
    /// every listener sees snapshots in commit order. An action whose
    /// payload does not fit its kind leaves the state as it was and is
    /// reported as a warning.
    pub fn dispatch(&self, action: Action) {
        {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            queue.pending.push_back(action);
            if queue.draining {
                tracing::trace!(queued = queue.pending.len(), "Dispatch queued");
                return;
            }
            queue.draining = true;
        }

        let _guard = DrainGuard(&self.queue);
        loop {
            let next = {
                let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
                match queue.pending.pop_front() {
                    Some(action) => action,
                    None => {
                        // Cleared under the same lock that saw the queue empty
                        queue.draining = false;
                        break;
                    }
                }
            };
            self.apply(next);
        }
    }

    fn apply(&self, action: Action) {
        let context = ReduceContext::fresh();

        let (snapshot, effects) = {
            let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match reduce(&current, &action, &context) {
                Ok(transition) => {
                    let snapshot = Arc::new(transition.new_state);
                    *current = snapshot.clone();
                    (snapshot, transition.effects)
                }
                Err(e) => {
                    tracing::warn!(
                        kind = %action.kind,
                        payload = %reduce::payload_summary(&action.payload),
                        error = %e,
                        "Ignoring action"
                    );
                    return;
                }
            }
        };

        tracing::trace!(kind = %action.kind, "Action applied");

        // State lock released: listeners may read the store; their dispatches are queued
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }

        // No receivers is fine
        let _ = self.changes_tx.send(snapshot);

        self.run_effects(effects);
    }

    /// Apply an action named by an untyped string
    ///
    /// Types outside [`ActionKind`] are rejected with a warning and the
    /// state is left untouched.
    pub fn dispatch_raw(&self, kind: &str, payload: Value) {
        match Action::parse(kind, payload) {
            Ok(action) => self.dispatch(action),
            Err(e) => tracing::warn!(error = %e, "Rejected dispatch"),
        }
    }

    /// Register a listener; it runs after every applied action
    pub fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(&StoreState) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        Subscription {
            id,
            store: Arc::downgrade(self),
        }
    }

    /// Stream of snapshots, one per applied action
    ///
    /// Slow consumers skip snapshots they lagged behind on.
    pub fn changes(&self) -> impl Stream<Item = Arc<StoreState>> {
        BroadcastStream::new(self.changes_tx.subscribe()).filter_map(Result::ok)
    }

    /// Route reducer effects to `tx`; `None` drops them
    pub fn set_effect_sink(&self, tx: Option<mpsc::UnboundedSender<Effect>>) {
        *self.effect_tx.lock().unwrap_or_else(PoisonError::into_inner) = tx;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn run_effects(&self, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }
        let sink = self.effect_tx.lock().unwrap_or_else(PoisonError::into_inner);
        for effect in effects {
            match sink.as_ref() {
                Some(tx) if tx.send(effect.clone()).is_ok() => {}
                _ => tracing::debug!(?effect, "No effect handler, dropping effect"),
            }
        }
    }
}

/// Actions waiting for the running dispatcher
#[derive(Default)]
struct DispatchQueue {
    draining: bool,
    pending: VecDeque<Action>,
}

/// Releases the dispatcher role if a listener panics mid-drain
struct DrainGuard<'a>(&'a Mutex<DispatchQueue>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .draining = false;
        }
    }
}

/// Handle returned by [`Store::subscribe`]
#[must_use = "dropping the handle keeps the listener registered"]
pub struct Subscription {
    id: u64,
    store: Weak<Store>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}
