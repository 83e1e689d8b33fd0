//! Property-based tests for the store
//!
//! These tests verify key invariants hold across arbitrary action sequences.

use super::*;
use crate::config::SessionConfig;
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_known_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        "[a-zA-Z ]{0,20}".prop_map(|text| Action::add_message(&MessagePayload::text(text))),
        "[a-zA-Z ]{0,20}".prop_map(|text| Action::send_text(text)),
        "[a-zA-Z]{1,10}".prop_map(|title| Action::send_postback(title, json!({}))),
        Just(Action::start_typing()),
        Just(Action::stop_typing()),
        prop_oneof![
            Just(ConnectionStatus::Disconnected),
            Just(ConnectionStatus::Connecting),
            Just(ConnectionStatus::Connected),
            Just(ConnectionStatus::Error),
        ]
        .prop_map(|status| Action::connection(&ConnectionUpdate::status(status))),
        // Malformed payloads for known kinds
        Just(Action::new(ActionKind::AddMessage, json!(null))),
        Just(Action::new(ActionKind::UpdateConnection, json!({"status": 7}))),
    ]
}

fn arb_unknown_type() -> impl Strategy<Value = String> {
    "[A-Z_]{1,16}".prop_filter("must not name a known kind", |s| {
        s.parse::<ActionKind>().is_err()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Messages are only ever appended: every earlier snapshot is a prefix
    /// of every later one.
    #[test]
    fn prop_messages_append_only(actions in proptest::collection::vec(arb_known_action(), 0..30)) {
        let store = Store::new(StoreState::new(SessionConfig::default()));
        let mut previous = store.state();

        for action in actions {
            store.dispatch(action);
            let current = store.state();
            prop_assert!(current.messages.len() >= previous.messages.len());
            prop_assert_eq!(&current.messages[..previous.messages.len()], &previous.messages[..]);
            previous = current;
        }
    }

    /// Unrecognized types never change state, wherever they land in a sequence.
    #[test]
    fn prop_unrecognized_is_noop(
        prefix in proptest::collection::vec(arb_known_action(), 0..10),
        unknown in arb_unknown_type(),
    ) {
        let store = Store::new(StoreState::new(SessionConfig::default()));
        for action in prefix {
            store.dispatch(action);
        }
        let before = store.state();

        store.dispatch_raw(&unknown, json!({"text": "x"}));

        prop_assert_eq!(&*store.state(), &*before);
    }

    /// The config seeded at creation survives any action sequence.
    #[test]
    fn prop_config_never_changes(actions in proptest::collection::vec(arb_known_action(), 0..30)) {
        let store = Store::new(StoreState::new(SessionConfig::default()));
        for action in actions {
            store.dispatch(action);
        }
        prop_assert_eq!(&store.state().config, &SessionConfig::default());
    }
}
