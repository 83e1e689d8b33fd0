//! Recording host element for testing

use super::{HostElement, WidgetTree};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Host element that remembers what it was asked to show
#[allow(dead_code)]
pub struct RecordingHost {
    node_name: Option<String>,
    trees: Mutex<Vec<WidgetTree>>,
    clears: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingHost {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: Some(node_name.into()),
            trees: Mutex::new(Vec::new()),
            clears: AtomicUsize::new(0),
        }
    }

    /// Element without a node name
    pub fn detached() -> Self {
        Self {
            node_name: None,
            trees: Mutex::new(Vec::new()),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn render_count(&self) -> usize {
        self.trees.lock().unwrap().len()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn last_tree(&self) -> Option<WidgetTree> {
        self.trees.lock().unwrap().last().cloned()
    }
}

impl HostElement for RecordingHost {
    fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    fn render(&self, tree: &WidgetTree) {
        self.trees.lock().unwrap().push(tree.clone());
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}
