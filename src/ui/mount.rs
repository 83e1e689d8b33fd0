//! Mounting the chat surface on a host element

use super::{ErrorBoundary, WidgetTree};
use crate::store::{Store, StoreState, Subscription};
use std::sync::{Arc, Mutex, PoisonError};

/// Surface the widget tree is displayed on
pub trait HostElement: Send + Sync {
    /// Element kind; `None` means the element cannot host anything
    fn node_name(&self) -> Option<&str>;

    fn render(&self, tree: &WidgetTree);

    fn clear(&self);

    fn is_mountable(&self) -> bool {
        self.node_name().is_some_and(|name| !name.is_empty())
    }
}

/// Chat surface bound to a store
///
/// Re-renders after every applied action until unmounted.
pub struct MountedView {
    host: Arc<dyn HostElement>,
    subscription: Option<Subscription>,
    boundary: Arc<Mutex<ErrorBoundary>>,
}

impl MountedView {
    pub fn mount(host: Arc<dyn HostElement>, store: &Arc<Store>) -> Self {
        let boundary = Arc::new(Mutex::new(ErrorBoundary::new()));

        paint(host.as_ref(), &boundary, &store.state());

        let listener_host = host.clone();
        let listener_boundary = boundary.clone();
        let subscription = store.subscribe(move |state: &StoreState| {
            paint(listener_host.as_ref(), &listener_boundary, state);
        });

        tracing::debug!(node = ?host.node_name(), "Chat surface mounted");
        Self {
            host,
            subscription: Some(subscription),
            boundary,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn is_faulted(&self) -> bool {
        self.boundary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_faulted()
    }

    /// Stop rendering and clear the host; no-op when already unmounted
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            self.host.clear();
            tracing::debug!("Chat surface unmounted");
        }
    }
}

impl Drop for MountedView {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn paint(host: &dyn HostElement, boundary: &Mutex<ErrorBoundary>, state: &StoreState) {
    let mut boundary = boundary.lock().unwrap_or_else(PoisonError::into_inner);
    let was_faulted = boundary.is_faulted();
    match boundary.render(state) {
        Some(tree) => host.render(&tree),
        // Clear once when the fault happens, then stay empty
        None if !was_faulted => host.clear(),
        None => {}
    }
}
