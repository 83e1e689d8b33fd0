//! Terminal chat demo
//!
//! Mounts a chat session on the terminal: lines read from stdin are sent as
//! user messages through the host event channel, and the rendered widget
//! tree is printed as it changes.

use rwc_session::config::TypingStatusOverrides;
use rwc_session::store::{ActionKind, Sender};
use rwc_session::ui::MessageBody;
use rwc_session::{
    HostElement, HostEvents, InitOptions, PartialSessionConfig, SessionOrchestrator, WidgetTree,
};
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they do not interleave with the chat
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rwc_session=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let overrides = match std::env::var("RWC_CONFIG") {
        Ok(path) => {
            tracing::info!(path = %path, "Loading config file");
            PartialSessionConfig::from_file(&path)?
        }
        Err(_) => PartialSessionConfig::default().with_typing_status(TypingStatusOverrides {
            active: Some(true),
            base_delay: Some(1000),
            variance: Some(500),
        }),
    }
    .with_env_overrides();

    let events = HostEvents::new();
    let orchestrator = SessionOrchestrator::new(events.clone());
    let host: Arc<dyn HostElement> = Arc::new(TerminalHost::default());
    let mut session = orchestrator.init(Some(host), InitOptions::new(overrides))?;

    println!("Connected to {}. Type a message, /quit to leave.", session.config().url);

    let send_event = ActionKind::SendMessage.event_name();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let text = line.trim();
                if text == "/quit" {
                    break;
                }
                if !text.is_empty() {
                    events.dispatch(&send_event, json!({ "payload": { "text": text } }));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.shutdown().await;
    Ok(())
}

/// Prints what changed since the previous render
#[derive(Default)]
struct TerminalHost {
    shown: Mutex<Shown>,
}

#[derive(Default)]
struct Shown {
    messages: usize,
    typing: bool,
    notice: Option<String>,
}

impl HostElement for TerminalHost {
    fn node_name(&self) -> Option<&str> {
        Some("terminal")
    }

    fn render(&self, tree: &WidgetTree) {
        let mut shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);

        if tree.input_area.notice != shown.notice {
            if let Some(notice) = &tree.input_area.notice {
                println!("[{notice}]");
            }
            shown.notice.clone_from(&tree.input_area.notice);
        }

        for item in tree.message_list.items.iter().skip(shown.messages) {
            let who = match item.sender {
                Sender::User => "you",
                Sender::Peer => "peer",
            };
            match &item.body {
                MessageBody::Text(text) => println!("{who}> {text}"),
                MessageBody::Rich(content) => println!("{who}> {content}"),
            }
        }
        shown.messages = tree.message_list.items.len();

        let typing = tree.message_list.typing_indicator.is_some();
        if typing && !shown.typing {
            println!("peer is typing...");
        }
        shown.typing = typing;
    }

    fn clear(&self) {
        println!("[chat closed]");
    }
}
