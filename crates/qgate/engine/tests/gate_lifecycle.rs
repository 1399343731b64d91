//! End-to-end behavior of a running gate: routing, queue policy, commands,
//! expiry and status publication.

use std::time::Duration;

use qgate_engine::{GateBuilder, GateHandle};
use qgate_types::{Emission, GateConfig, Message, Mode, StatusFill, StatusShape, ToggleMode};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn queueing(max_queue_length: i64, keep_newest: bool) -> GateConfig {
    GateConfig {
        name: "line".into(),
        default_mode: Mode::Queueing,
        max_queue_length,
        keep_newest,
        ..GateConfig::default()
    }
}

async fn spawn(config: GateConfig) -> GateHandle {
    GateBuilder::new(config).spawn().await.unwrap()
}

fn data(n: u64) -> Message {
    Message::new().with("payload", n)
}

fn control(token: &str) -> Message {
    Message::new().with("topic", "control").with("payload", token)
}

fn payloads(emission: Option<Emission>) -> Vec<u64> {
    match emission {
        Some(Emission::Batch(batch)) => batch
            .iter()
            .map(|m| m.get("payload").and_then(|v| v.as_u64()).unwrap())
            .collect(),
        other => panic!("expected a batch, got {:?}", other),
    }
}

fn single_payload(emission: Option<Emission>) -> u64 {
    match emission {
        Some(Emission::Single(message)) => {
            message.get("payload").and_then(|v| v.as_u64()).unwrap()
        }
        other => panic!("expected a single message, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn open_gate_forwards_data_unchanged() {
    let gate = spawn(GateConfig::default()).await;
    let message = Message::new().with("_msgid", "m1").with("payload", json!({"a": 1}));

    let emitted = gate.dispatch(message.clone()).await.unwrap();
    assert_eq!(emitted, Some(Emission::Single(message)));
}

#[tokio::test]
async fn closed_gate_discards_data() {
    let gate = spawn(GateConfig::default()).await;
    assert_eq!(gate.dispatch(control("close")).await.unwrap(), None);
    assert_eq!(gate.dispatch(data(1)).await.unwrap(), None);

    let snapshot = gate.snapshot().await.unwrap();
    assert_eq!(snapshot.mode, Mode::Closed);
    assert!(snapshot.queue.is_empty());
}

#[tokio::test]
async fn queued_messages_are_released_in_arrival_order() {
    let gate = spawn(queueing(0, false)).await;
    for n in 1..=5 {
        assert_eq!(gate.dispatch(data(n)).await.unwrap(), None);
    }

    let released = gate.dispatch(control("open")).await.unwrap();
    assert_eq!(payloads(released), vec![1, 2, 3, 4, 5]);
    assert_eq!(gate.snapshot().await.unwrap().mode, Mode::Open);
}

#[tokio::test]
async fn dispatch_assigns_missing_identifiers() {
    let gate = spawn(queueing(0, false)).await;
    gate.dispatch(data(1)).await.unwrap();

    let snapshot = gate.snapshot().await.unwrap();
    assert!(snapshot.queue[0].id("_msgid").is_some());
}

// ---------------------------------------------------------------------------
// Queue policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_queue_drops_the_newest_message() {
    let gate = spawn(queueing(2, false)).await;
    for n in 1..=3 {
        gate.dispatch(data(n)).await.unwrap();
    }
    assert_eq!(payloads(gate.dispatch(control("open")).await.unwrap()), vec![1, 2]);
}

#[tokio::test]
async fn full_queue_keeps_the_newest_when_configured() {
    let gate = spawn(queueing(2, true)).await;
    for n in 1..=3 {
        gate.dispatch(data(n)).await.unwrap();
    }
    assert_eq!(payloads(gate.dispatch(control("open")).await.unwrap()), vec![2, 3]);
}

#[tokio::test]
async fn opening_twice_emits_an_empty_batch() {
    let gate = spawn(queueing(0, false)).await;
    gate.dispatch(data(1)).await.unwrap();

    assert_eq!(payloads(gate.dispatch(control("open")).await.unwrap()), vec![1]);
    assert!(payloads(gate.dispatch(control("open")).await.unwrap()).is_empty());
    assert!(gate.snapshot().await.unwrap().queue.is_empty());
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn peek_copies_the_head_without_removing_it() {
    let gate = spawn(queueing(0, false)).await;
    gate.dispatch(data(1)).await.unwrap();
    gate.dispatch(data(2)).await.unwrap();

    assert_eq!(single_payload(gate.dispatch(control("peek")).await.unwrap()), 1);
    assert_eq!(gate.snapshot().await.unwrap().queue.len(), 2);

    assert_eq!(single_payload(gate.dispatch(control("trigger")).await.unwrap()), 1);
    assert_eq!(gate.snapshot().await.unwrap().queue.len(), 1);
}

#[tokio::test]
async fn drop_and_reset_emit_nothing() {
    let gate = spawn(queueing(0, false)).await;
    for n in 1..=3 {
        gate.dispatch(data(n)).await.unwrap();
    }

    assert_eq!(gate.dispatch(control("drop")).await.unwrap(), None);
    assert_eq!(gate.snapshot().await.unwrap().queue.len(), 2);

    assert_eq!(gate.dispatch(control("reset")).await.unwrap(), None);
    let snapshot = gate.snapshot().await.unwrap();
    assert!(snapshot.queue.is_empty());
    assert_eq!(snapshot.mode, Mode::Queueing);
}

#[tokio::test]
async fn flush_emits_the_queue_then_clears_it() {
    let gate = spawn(queueing(0, false)).await;
    gate.dispatch(data(1)).await.unwrap();
    gate.dispatch(data(2)).await.unwrap();

    assert_eq!(payloads(gate.dispatch(control("flush")).await.unwrap()), vec![1, 2]);
    let snapshot = gate.snapshot().await.unwrap();
    assert!(snapshot.queue.is_empty());
    assert_eq!(snapshot.mode, Mode::Queueing);
}

#[tokio::test]
async fn unknown_command_changes_nothing() {
    let gate = spawn(queueing(0, false)).await;
    gate.dispatch(data(1)).await.unwrap();

    assert_eq!(gate.dispatch(control("launch")).await.unwrap(), None);
    let snapshot = gate.snapshot().await.unwrap();
    assert_eq!(snapshot.mode, Mode::Queueing);
    assert_eq!(snapshot.queue.len(), 1);
}

#[tokio::test]
async fn custom_tokens_are_matched_case_insensitively() {
    let mut config = queueing(0, false);
    config.control_topic = "Gate-Control".into();
    config.commands.open = "Release".into();
    let gate = spawn(config).await;
    gate.dispatch(data(7)).await.unwrap();

    let command = Message::new()
        .with("topic", "GATE-CONTROL")
        .with("payload", "RELEASE");
    assert_eq!(payloads(gate.dispatch(command).await.unwrap()), vec![7]);
}

#[tokio::test]
async fn queue_toggle_cycles_between_open_and_queueing() {
    let config = GateConfig {
        toggle: ToggleMode::Queue,
        ..GateConfig::default()
    };
    let gate = spawn(config).await;

    gate.dispatch(control("toggle")).await.unwrap();
    assert_eq!(gate.snapshot().await.unwrap().mode, Mode::Queueing);
    gate.dispatch(data(1)).await.unwrap();

    let released = gate.dispatch(control("toggle")).await.unwrap();
    assert_eq!(payloads(released), vec![1]);
    assert_eq!(gate.snapshot().await.unwrap().mode, Mode::Open);
}

#[tokio::test]
async fn renege_removes_every_matching_message() {
    let gate = spawn(queueing(0, false)).await;
    for (n, order) in [(1, "a"), (2, "b"), (3, "a")] {
        let message = data(n).with("order", json!({ "id": order }));
        gate.dispatch(message).await.unwrap();
    }

    let renege = control("renege").with("filter", json!({ "order": { "id": "a" } }));
    assert_eq!(gate.dispatch(renege).await.unwrap(), None);

    let released = gate.dispatch(control("open")).await.unwrap();
    assert_eq!(payloads(released), vec![2]);
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn queued_message_expires_after_its_ttl() {
    let mut config = queueing(0, false);
    config.ttl_ms = 100;
    let gate = spawn(config).await;

    gate.dispatch(data(1)).await.unwrap();
    assert_eq!(gate.snapshot().await.unwrap().pending_expiry, 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(gate.snapshot().await.unwrap().queue.len(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = gate.snapshot().await.unwrap();
    assert!(snapshot.queue.is_empty());
    assert_eq!(snapshot.pending_expiry, 0);
    assert_eq!(gate.current_status().text, "queuing: 0");
}

#[tokio::test(start_paused = true)]
async fn each_message_expires_on_its_own_schedule() {
    let mut config = queueing(0, false);
    config.ttl_ms = 100;
    let gate = spawn(config).await;

    gate.dispatch(data(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    gate.dispatch(data(2)).await.unwrap();
    gate.dispatch(control("trigger")).await.unwrap();
    assert_eq!(gate.snapshot().await.unwrap().pending_expiry, 1);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(gate.snapshot().await.unwrap().queue.len(), 1);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(gate.snapshot().await.unwrap().queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn leaving_the_queue_cancels_the_timer() {
    let mut config = queueing(0, false);
    config.ttl_ms = 100;
    let gate = spawn(config).await;

    gate.dispatch(data(1)).await.unwrap();
    gate.dispatch(control("open")).await.unwrap();
    assert_eq!(gate.snapshot().await.unwrap().pending_expiry, 0);

    gate.dispatch(control("queue")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(gate.snapshot().await.unwrap().mode, Mode::Queueing);
}

#[tokio::test(start_paused = true)]
async fn messages_sharing_an_id_expire_independently() {
    let mut config = queueing(0, false);
    config.ttl_ms = 100;
    let gate = spawn(config).await;
    let twin = |n: u64| data(n).with("_msgid", "x");

    gate.dispatch(twin(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    gate.dispatch(twin(2)).await.unwrap();
    assert_eq!(gate.snapshot().await.unwrap().pending_expiry, 2);

    tokio::time::sleep(Duration::from_millis(60)).await;
    let snapshot = gate.snapshot().await.unwrap();
    assert_eq!(snapshot.queue, vec![twin(2)]);

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snapshot = gate.snapshot().await.unwrap();
    assert!(snapshot.queue.is_empty());
    assert_eq!(snapshot.pending_expiry, 0);
    assert_eq!(gate.current_status().text, "queuing: 0");
}

#[tokio::test(start_paused = true)]
async fn trigger_keeps_the_timer_of_a_same_id_survivor() {
    let mut config = queueing(0, false);
    config.ttl_ms = 100;
    let gate = spawn(config).await;
    let twin = |n: u64| data(n).with("_msgid", "x");

    gate.dispatch(twin(1)).await.unwrap();
    gate.dispatch(twin(2)).await.unwrap();
    assert_eq!(single_payload(gate.dispatch(control("trigger")).await.unwrap()), 1);
    assert_eq!(gate.snapshot().await.unwrap().pending_expiry, 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let snapshot = gate.snapshot().await.unwrap();
    assert!(snapshot.queue.is_empty());
    assert_eq!(snapshot.pending_expiry, 0);
}

#[tokio::test(start_paused = true)]
async fn evicted_message_gives_up_its_timer() {
    let mut config = queueing(2, true);
    config.ttl_ms = 100;
    let gate = spawn(config).await;

    for n in 1..=3 {
        gate.dispatch(data(n)).await.unwrap();
    }
    let snapshot = gate.snapshot().await.unwrap();
    assert_eq!(snapshot.queue.len(), 2);
    assert_eq!(snapshot.pending_expiry, 2);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(gate.snapshot().await.unwrap().pending_expiry, 0);
}

#[tokio::test(start_paused = true)]
async fn timers_after_shutdown_do_nothing() {
    let mut config = queueing(0, false);
    config.ttl_ms = 100;
    let gate = spawn(config).await;

    gate.dispatch(data(1)).await.unwrap();
    gate.shutdown().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(gate.is_closed());
    assert!(gate.dispatch(data(2)).await.is_err());
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_follows_mode_and_queue_length() {
    let gate = spawn(queueing(2, false)).await;
    let mut status = gate.status();
    assert_eq!(status.borrow().text, "queuing: 0");
    assert_eq!(status.borrow().shape, StatusShape::Ring);

    gate.dispatch(data(1)).await.unwrap();
    gate.dispatch(data(2)).await.unwrap();
    status.changed().await.unwrap();
    let current = status.borrow_and_update().clone();
    assert_eq!(current.text, "queuing: 2");
    assert_eq!(current.fill, StatusFill::Yellow);
    assert_eq!(current.shape, StatusShape::Dot);

    gate.dispatch(control("close")).await.unwrap();
    status.changed().await.unwrap();
    assert_eq!(status.borrow().text, "closed");
    assert_eq!(status.borrow().fill, StatusFill::Red);
}

#[tokio::test]
async fn status_command_leaves_everything_unchanged() {
    let gate = spawn(queueing(0, false)).await;
    gate.dispatch(data(1)).await.unwrap();
    let before = gate.current_status();

    assert_eq!(gate.dispatch(control("status")).await.unwrap(), None);
    assert_eq!(gate.current_status(), before);
}
