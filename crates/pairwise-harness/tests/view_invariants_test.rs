//! View invariants across arbitrary sequences of coordination rounds.

use std::time::Duration;

use pairwise_coordinator::{
    Coordinator, CoordinatorConfig, PairState, UpdateDocument, Views, merge_round,
};
use pairwise_harness::{InvariantRegistry, ViewHistory};
use pairwise_proto::Role;
use proptest::prelude::*;
use serde_json::{Value, json};

fn state_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["INIT", "CLAIMED", "PARAMS_BOUND", "BOTH_RTS", "READY"])
}

/// One peer's update document: a few queues and a few pairs over a small
/// id space, with the occasional garbage entry.
fn update_document() -> impl Strategy<Value = Value> {
    let pair = (0u8..5, state_name(), any::<bool>()).prop_map(|(id, state, numeric)| {
        let id = if numeric { json!(id) } else { json!(format!("p{id}")) };
        json!({"id": id, "state": state})
    });
    let entry = prop_oneof![9 => pair, 1 => Just(json!({"state": "BOGUS"}))];

    (prop::collection::vec(entry, 0..6), prop::collection::btree_set(0u8..4, 0..4)).prop_map(
        |(pairs, queues)| {
            let queues: serde_json::Map<String, Value> =
                queues.into_iter().map(|q| (format!("qp{q}"), json!({"qpn": q}))).collect();
            json!({"local": {"resources": {"QP": queues}, "pairs": pairs}})
        },
    )
}

fn run_rounds(rounds: &[(Value, Value)]) -> ViewHistory {
    let mut history = ViewHistory::default();
    let mut previous: Option<Views> = None;

    for (i, (server, client)) in rounds.iter().enumerate() {
        let server = UpdateDocument::from_value(server);
        let client = UpdateDocument::from_value(client);
        let (server_prev, client_prev) = previous
            .as_ref()
            .map(|v| (v.server.published(), v.client.published()))
            .unwrap_or_default();

        let views = merge_round(&server, &client, &server_prev, &client_prev, i as u64);
        history.record(Role::Server, views.server.clone());
        history.record(Role::Client, views.client.clone());
        previous = Some(views);
    }

    history
}

proptest! {
    #[test]
    fn invariants_hold_over_any_round_sequence(
        rounds in prop::collection::vec((update_document(), update_document()), 1..10),
    ) {
        let history = run_rounds(&rounds);
        prop_assert_eq!(history.len(), rounds.len() * 2);

        if let Err(violations) = InvariantRegistry::standard().check_all(&history) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            prop_assert!(false, "violations: {}", messages.join("; "));
        }
    }

    #[test]
    fn both_views_agree_on_state_from_a_clean_start(
        rounds in prop::collection::vec((update_document(), update_document()), 1..10),
    ) {
        let history = run_rounds(&rounds);
        let [server, client] = &history.lineages[..] else {
            return Err(TestCaseError::fail("expected two lineages"));
        };

        for (s, c) in server.views.iter().zip(&client.views) {
            prop_assert_eq!(&s.pairs, &c.pairs);
        }
    }
}

#[test]
fn file_backed_rounds_satisfy_invariants() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoordinatorConfig {
        server_update: dir.path().join("server_update.json"),
        client_update: dir.path().join("client_update.json"),
        server_view: dir.path().join("server_view.json"),
        client_view: dir.path().join("client_view.json"),
        interval: Duration::from_millis(10),
    };
    let mut coordinator = Coordinator::new(config.clone());
    let mut history = ViewHistory::default();

    let script = [
        (None, Some("CLAIMED")),
        (Some("CLAIMED"), Some("CLAIMED")),
        (Some("PARAMS_BOUND"), Some("CLAIMED")),
        (Some("PARAMS_BOUND"), None),
        (Some("BOTH_RTS"), Some("BOTH_RTS")),
        (Some("READY"), Some("BOTH_RTS")),
    ];

    for (round, (server, client)) in script.into_iter().enumerate() {
        for (path, state) in [(&config.server_update, server), (&config.client_update, client)] {
            let pairs: Vec<Value> =
                state.map(|s| json!({"id": "p0", "state": s})).into_iter().collect();
            std::fs::write(path, json!({"local": {"pairs": pairs}}).to_string()).unwrap();
        }

        let views = coordinator.round(round as u64).unwrap();
        history.record(Role::Server, views.server);
        history.record(Role::Client, views.client);
    }

    InvariantRegistry::standard().assert_all(&history, "after scripted rounds");

    let last = &history.lineages[1].views[script.len() - 1];
    assert_eq!(last.pairs[0].state, PairState::Ready);
    assert_eq!(last.pairs[0].epoch, 4, "CLAIMED, PARAMS_BOUND, BOTH_RTS, READY");
}
