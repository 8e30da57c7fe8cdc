// Broadcaster contract tests: set semantics, empty-set short-circuit,
// fault isolation, producer failure, inbound request handling.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use hostmon::broadcaster::Broadcaster;
use tokio::sync::mpsc;

use common::{StubSource, sample_flow};

const SEND_TIMEOUT: Duration = Duration::from_millis(100);

fn test_broadcaster(stub: Arc<StubSource>) -> Broadcaster<Arc<StubSource>> {
    Broadcaster::new(stub, SEND_TIMEOUT)
}

fn client() -> (mpsc::Sender<Utf8Bytes>, mpsc::Receiver<Utf8Bytes>) {
    mpsc::channel(8)
}

fn envelope(text: &Utf8Bytes) -> serde_json::Value {
    serde_json::from_str(text.as_str()).expect("envelope is JSON")
}

#[tokio::test]
async fn register_unregister_follows_set_semantics() {
    let broadcaster = test_broadcaster(Arc::new(StubSource::default()));
    let (tx_a, _rx_a) = client();
    let (tx_b, _rx_b) = client();

    let a = broadcaster.register(tx_a);
    let b = broadcaster.register(tx_b);
    assert_ne!(a, b, "each registration gets a distinct identity");
    assert_eq!(broadcaster.client_count(), 2);

    // Unregister of an absent id is a no-op
    broadcaster.unregister(9999);
    assert_eq!(broadcaster.client_count(), 2);

    broadcaster.unregister(a);
    assert_eq!(broadcaster.client_count(), 1);
    broadcaster.unregister(a);
    assert_eq!(broadcaster.client_count(), 1);
}

#[tokio::test]
async fn empty_set_never_invokes_producer() {
    let stub = Arc::new(StubSource::default());
    let broadcaster = test_broadcaster(stub.clone());

    broadcaster.broadcast_metrics().await;
    broadcaster.broadcast_flows().await;

    assert_eq!(stub.metrics_calls(), 0);
    assert_eq!(stub.flows_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_client_is_removed_without_aborting_delivery() {
    let broadcaster = test_broadcaster(Arc::new(StubSource::default()));
    let (tx_a, mut rx_a) = client();
    let (tx_b, mut rx_b) = client();
    let (tx_dead, rx_dead) = client();

    broadcaster.register(tx_a);
    broadcaster.register(tx_b);
    broadcaster.register(tx_dead);
    drop(rx_dead); // sends to this client fail immediately

    broadcaster.broadcast_metrics().await;

    for rx in [&mut rx_a, &mut rx_b] {
        let msg = rx.try_recv().expect("healthy client receives the broadcast");
        assert_eq!(envelope(&msg)["type"], "metrics");
        assert!(rx.try_recv().is_err(), "exactly one message per tick");
    }
    assert_eq!(broadcaster.client_count(), 2, "dead client pruned");
}

#[tokio::test]
async fn stalled_client_is_dropped_after_send_deadline() {
    let broadcaster = test_broadcaster(Arc::new(StubSource::default()));
    let (tx_ok, mut rx_ok) = client();
    // Capacity-1 queue, pre-filled and never drained.
    let (tx_full, _rx_full) = mpsc::channel(1);
    tx_full.try_send(Utf8Bytes::from_static("stuffed")).unwrap();

    broadcaster.register(tx_ok);
    broadcaster.register(tx_full);

    broadcaster.broadcast_metrics().await;

    assert!(rx_ok.try_recv().is_ok());
    assert_eq!(broadcaster.client_count(), 1, "stalled client removed");
}

#[tokio::test]
async fn producer_failure_skips_tick_and_keeps_set() {
    let stub = Arc::new(StubSource::default());
    stub.fail_metrics.store(true, Ordering::SeqCst);
    let broadcaster = test_broadcaster(stub.clone());
    let (tx_a, mut rx_a) = client();
    let (tx_b, mut rx_b) = client();
    broadcaster.register(tx_a);
    broadcaster.register(tx_b);

    broadcaster.broadcast_metrics().await;

    assert_eq!(stub.metrics_calls(), 1);
    assert!(rx_a.try_recv().is_err(), "no message sent that tick");
    assert!(rx_b.try_recv().is_err());
    assert_eq!(broadcaster.client_count(), 2, "set unchanged");
}

#[tokio::test]
async fn empty_flow_list_skips_tick() {
    let stub = Arc::new(StubSource::default());
    let broadcaster = test_broadcaster(stub.clone());
    let (tx, mut rx) = client();
    broadcaster.register(tx);

    broadcaster.broadcast_flows().await;

    assert_eq!(stub.flows_calls.load(Ordering::SeqCst), 1);
    assert!(rx.try_recv().is_err());
    assert_eq!(broadcaster.client_count(), 1);
}

#[tokio::test]
async fn inbound_get_metrics_triggers_one_broadcast_to_all() {
    let stub = Arc::new(StubSource::default());
    let broadcaster = test_broadcaster(stub.clone());
    let (tx_a, mut rx_a) = client();
    let (tx_b, mut rx_b) = client();
    broadcaster.register(tx_a);
    broadcaster.register(tx_b);

    broadcaster.handle_inbound(r#"{"type":"get_metrics"}"#).await;

    assert_eq!(stub.metrics_calls(), 1);
    // Replies go to every client, not just the requester (original behavior).
    for rx in [&mut rx_a, &mut rx_b] {
        let msg = rx.try_recv().expect("broadcast reaches every client");
        assert_eq!(envelope(&msg)["type"], "metrics");
        assert!(rx.try_recv().is_err());
    }
}

#[tokio::test]
async fn inbound_get_flows_broadcasts_flow_list() {
    let stub = Arc::new(StubSource::with_flows(vec![sample_flow()]));
    let broadcaster = test_broadcaster(stub.clone());
    let (tx, mut rx) = client();
    broadcaster.register(tx);

    broadcaster.handle_inbound(r#"{"type":"get_flows"}"#).await;

    let msg = rx.try_recv().unwrap();
    let value = envelope(&msg);
    assert_eq!(value["type"], "network_flows");
    assert_eq!(value["payload"][0]["sourceIP"], "127.0.0.1");
    assert_eq!(value["payload"][0]["destPort"], 443);
}

#[tokio::test]
async fn malformed_inbound_is_ignored_and_client_stays() {
    let stub = Arc::new(StubSource::default());
    let broadcaster = test_broadcaster(stub.clone());
    let (tx, mut rx) = client();
    broadcaster.register(tx);

    broadcaster.handle_inbound("this is not json").await;
    broadcaster.handle_inbound(r#"{"type":"reboot"}"#).await;
    broadcaster.handle_inbound(r#"{"kind":"get_metrics"}"#).await;

    assert_eq!(stub.metrics_calls(), 0);
    assert!(rx.try_recv().is_err(), "no broadcast triggered");
    assert_eq!(broadcaster.client_count(), 1, "connection stays open");
}

#[tokio::test]
async fn two_clients_receive_stub_snapshot_exactly_once() {
    let broadcaster = test_broadcaster(Arc::new(StubSource::default()));
    let (tx_a, mut rx_a) = client();
    let (tx_b, mut rx_b) = client();
    broadcaster.register(tx_a);
    broadcaster.register(tx_b);

    broadcaster.broadcast_metrics().await;

    for rx in [&mut rx_a, &mut rx_b] {
        let msg = rx.try_recv().unwrap();
        let value = envelope(&msg);
        assert_eq!(value["type"], "metrics");
        assert_eq!(value["payload"]["cpu"]["usage"], 10.0);
        assert!(rx.try_recv().is_err(), "exactly one envelope per tick");
    }
}
