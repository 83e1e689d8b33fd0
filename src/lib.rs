//! Embeddable chat session core
//!
//! Keeps the state of a chat surface, relays messages to a remote chat
//! endpoint through a pluggable transport client, bridges host page events
//! into store actions and simulates the peer's typing indicator.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)] // error enums document their variants

pub mod bridge;
pub mod config;
pub mod session;
pub mod store;
pub mod transport;
pub mod typing;
pub mod ui;

pub use bridge::{EventBridge, HostEvents};
pub use config::{resolve, PartialSessionConfig, SessionConfig};
pub use session::{InitError, InitOptions, SessionHandle, SessionOrchestrator};
pub use store::{Action, ActionKind, Store, StoreState};
pub use transport::{ConnectionError, TransportClient};
pub use ui::{HostElement, WidgetTree};
