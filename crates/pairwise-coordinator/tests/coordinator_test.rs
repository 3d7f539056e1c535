//! File-backed coordination rounds.

use std::{
    fs,
    path::Path,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::{Duration, SystemTime},
};

use pairwise_coordinator::{Coordinator, CoordinatorConfig, PairState, ViewDocument};
use serde_json::{Value, json};
use tempfile::TempDir;

fn config(dir: &TempDir) -> CoordinatorConfig {
    CoordinatorConfig {
        server_update: dir.path().join("server_update.json"),
        client_update: dir.path().join("client_update.json"),
        server_view: dir.path().join("server_view.json"),
        client_view: dir.path().join("client_view.json"),
        interval: Duration::from_millis(10),
    }
}

/// Write `doc` and pin its mtime so change detection is deterministic.
fn write_update(path: &Path, doc: &Value, mtime_secs: u64) {
    fs::write(path, serde_json::to_vec(doc).unwrap()).unwrap();
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs)).unwrap();
}

fn read_view(path: &Path) -> ViewDocument {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn pairs_doc(state: &str) -> Value {
    json!({"local": {"pairs": [{"id": "p0", "state": state, "ts": 1.0}]}})
}

#[test]
fn epochs_advance_only_when_state_changes() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let mut coordinator = Coordinator::new(config.clone());

    write_update(&config.client_update, &pairs_doc("CLAIMED"), 100);
    coordinator.round(1).unwrap();
    let view = read_view(&config.client_view);
    assert_eq!((view.pairs[0].state, view.pairs[0].epoch), (PairState::Claimed, 1));

    coordinator.round(2).unwrap();
    let view = read_view(&config.client_view);
    assert_eq!((view.pairs[0].state, view.pairs[0].epoch), (PairState::Claimed, 1));

    write_update(&config.server_update, &pairs_doc("BOTH_RTS"), 101);
    coordinator.round(3).unwrap();
    for path in [&config.client_view, &config.server_view] {
        let view = read_view(path);
        assert_eq!(view.pairs[0].state, PairState::BothRts);
        assert_eq!(view.metadata.generated_at_ms, 3);
    }
    assert_eq!(read_view(&config.client_view).pairs[0].epoch, 2);
    assert_eq!(read_view(&config.server_view).pairs[0].epoch, 2);
}

#[test]
fn missing_inputs_still_publish_empty_views() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);

    Coordinator::new(config.clone()).round(0).unwrap();

    let view = read_view(&config.server_view);
    assert!(view.pairs.is_empty());
    assert_eq!(view.local, json!({}));
    assert_eq!(view.remote, json!({"ids": {"QP": []}}));
}

#[test]
fn malformed_input_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    fs::write(&config.server_update, "{\"local\": ").unwrap();
    write_update(&config.client_update, &pairs_doc("CLAIMED"), 100);

    let views = Coordinator::new(config).round(0).unwrap();

    assert_eq!(views.server.pairs.len(), 1);
    assert_eq!(views.server.local, json!({}));
}

#[test]
fn epochs_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);

    write_update(&config.client_update, &pairs_doc("CLAIMED"), 100);
    Coordinator::new(config.clone()).round(0).unwrap();

    write_update(&config.client_update, &pairs_doc("PARAMS_BOUND"), 101);
    let views = Coordinator::new(config.clone()).round(1).unwrap();

    assert_eq!(views.client.pairs[0].epoch, 2);
}

#[test]
fn poll_runs_only_on_change() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let mut coordinator = Coordinator::new(config.clone());

    assert!(coordinator.poll(0).unwrap(), "first poll always runs");
    assert!(!coordinator.poll(1).unwrap());

    write_update(&config.server_update, &json!({}), 100);
    assert!(coordinator.poll(2).unwrap(), "file appeared");
    assert!(!coordinator.poll(3).unwrap());

    write_update(&config.server_update, &json!({}), 200);
    assert!(coordinator.poll(4).unwrap(), "mtime changed");

    fs::remove_file(&config.server_update).unwrap();
    assert!(coordinator.poll(5).unwrap(), "file disappeared");
    assert!(!coordinator.poll(6).unwrap());
}

#[test]
fn readers_never_observe_a_partial_view() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let mut coordinator = Coordinator::new(config.clone());

    let large = |state: &str| {
        let pairs: Vec<Value> =
            (0..2000).map(|i| json!({"id": format!("p{i}"), "state": state})).collect();
        json!({"local": {"pairs": pairs}})
    };
    write_update(&config.client_update, &large("CLAIMED"), 100);
    coordinator.round(0).unwrap();

    let done = AtomicBool::new(false);
    let reads = AtomicUsize::new(0);

    thread::scope(|scope| {
        scope.spawn(|| {
            loop {
                let finished = done.load(Ordering::Acquire);
                let bytes = fs::read(&config.server_view).unwrap();
                let doc: Value = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(doc["pairs"].as_array().map(Vec::len), Some(2000));
                assert_eq!(doc["_coordinator"]["pair_count"], 2000);
                reads.fetch_add(1, Ordering::Relaxed);
                if finished {
                    break;
                }
            }
        });

        for round in 1..40u64 {
            let state = if round % 2 == 0 { "CLAIMED" } else { "PARAMS_BOUND" };
            write_update(&config.client_update, &large(state), 100 + round);
            coordinator.round(round).unwrap();
        }
        done.store(true, Ordering::Release);
    });

    assert!(reads.load(Ordering::Relaxed) > 0);
}

#[test]
fn publish_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir);
    config.client_view = dir.path().join("missing-dir").join("client_view.json");

    let result = Coordinator::new(config).round(0);
    assert!(result.is_err());
}

#[tokio::test]
async fn run_polls_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    write_update(&config.client_update, &pairs_doc("READY"), 100);

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(Coordinator::new(config.clone()).run(async move {
        let _ = rx.await;
    }));

    tokio::time::timeout(Duration::from_secs(5), async {
        while !config.client_view.exists() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap().unwrap();

    assert_eq!(read_view(&config.client_view).pairs[0].state, PairState::Ready);
}
