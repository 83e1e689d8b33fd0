//! Host page event bridge
//!
//! The embedding page talks to a session by dispatching named events such as
//! `rwc-dispatch-SEND_MESSAGE` with a `{"payload": ...}` detail. The bridge
//! listens for exactly one event name per [`ActionKind`] and forwards each
//! event to the store it was attached to.

use crate::store::{Action, ActionKind, Store};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Event as seen by listeners
#[derive(Debug, Clone, PartialEq)]
pub struct HostEvent {
    pub name: String,
    pub detail: Value,
}

pub type HostListener = Arc<dyn Fn(&HostEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Named event channel of the host page
#[derive(Default)]
pub struct HostEvents {
    listeners: Mutex<HashMap<String, Vec<(ListenerId, HostListener)>>>,
    next_id: AtomicU64,
}

impl HostEvents {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_listener(&self, name: impl Into<String>, listener: HostListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.into())
            .or_default()
            .push((id, listener));
        id
    }

    /// Returns whether a listener was removed
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        for entries in listeners.values_mut() {
            let before = entries.len();
            entries.retain(|(listener_id, _)| *listener_id != id);
            removed |= entries.len() != before;
        }
        listeners.retain(|_, entries| !entries.is_empty());
        removed
    }

    /// Deliver an event; returns how many listeners ran
    pub fn dispatch(&self, name: &str, detail: Value) -> usize {
        let listeners: Vec<HostListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        if listeners.is_empty() {
            tracing::trace!(event = %name, "No listeners for host event");
            return 0;
        }

        let event = HostEvent {
            name: name.to_string(),
            detail,
        };
        for listener in &listeners {
            listener(&event);
        }
        listeners.len()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }
}

/// Forwards host events to one store
pub struct EventBridge {
    events: Arc<HostEvents>,
    attached: Option<Attachment>,
}

struct Attachment {
    store: Arc<Store>,
    listeners: Vec<ListenerId>,
}

impl EventBridge {
    pub fn new(events: Arc<HostEvents>) -> Self {
        Self {
            events,
            attached: None,
        }
    }

    /// Start forwarding to `store`
    ///
    /// Attaching again to the same store does nothing; attaching to another
    /// store detaches from the previous one first.
    pub fn attach(&mut self, store: &Arc<Store>) {
        if let Some(attachment) = &self.attached {
            if Arc::ptr_eq(&attachment.store, store) {
                tracing::debug!("Event bridge already attached");
                return;
            }
            self.detach();
        }

        let listeners = ActionKind::ALL
            .into_iter()
            .map(|kind| {
                // Each handler owns its own store reference
                let store = store.clone();
                let handler: HostListener = Arc::new(move |event: &HostEvent| {
                    let payload = event.detail.get("payload").cloned().unwrap_or(Value::Null);
                    store.dispatch(Action::new(kind, payload));
                });
                self.events.add_listener(kind.event_name(), handler)
            })
            .collect();

        tracing::debug!(kinds = ActionKind::ALL.len(), "Event bridge attached");
        self.attached = Some(Attachment {
            store: store.clone(),
            listeners,
        });
    }

    /// Stop forwarding; no-op when not attached
    pub fn detach(&mut self) {
        if let Some(attachment) = self.attached.take() {
            for id in attachment.listeners {
                self.events.remove_listener(id);
            }
            tracing::debug!("Event bridge detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.detach();
    }
}
