// Client registry and timed fan-out for the metrics stream.
// All set mutation goes through the mutex; the lock is never held across an await.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::{MetricsSnapshot, NetworkFlow};

pub type ClientId = u64;

/// Producer side of the broadcast loop. `SysinfoRepo` is the production
/// implementation; tests plug in stubs.
pub trait MetricsSource: Send + Sync + 'static {
    fn collect_metrics(&self) -> impl Future<Output = anyhow::Result<MetricsSnapshot>> + Send;
    fn collect_flows(&self) -> impl Future<Output = anyhow::Result<Vec<NetworkFlow>>> + Send;
}

impl<S: MetricsSource> MetricsSource for std::sync::Arc<S> {
    fn collect_metrics(&self) -> impl Future<Output = anyhow::Result<MetricsSnapshot>> + Send {
        (**self).collect_metrics()
    }

    fn collect_flows(&self) -> impl Future<Output = anyhow::Result<Vec<NetworkFlow>>> + Send {
        (**self).collect_flows()
    }
}

/// Requests a client may send over the socket. Anything else is ignored.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundRequest {
    GetMetrics,
    GetFlows,
}

pub struct Broadcaster<S> {
    source: S,
    clients: Mutex<HashMap<ClientId, mpsc::Sender<Utf8Bytes>>>,
    next_id: AtomicU64,
    send_timeout: Duration,
}

impl<S: MetricsSource> Broadcaster<S> {
    pub fn new(source: S, send_timeout: Duration) -> Self {
        Self {
            source,
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            send_timeout,
        }
    }

    /// Adds a client queue to the set and returns its id.
    pub fn register(&self, tx: mpsc::Sender<Utf8Bytes>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
            clients.insert(id, tx);
            clients.len()
        };
        tracing::info!(client_id = id, clients = count, "Client connected");
        id
    }

    /// Removes a client if present; no-op otherwise.
    pub fn unregister(&self, id: ClientId) {
        let removed = {
            let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
            clients.remove(&id).map(|_| clients.len())
        };
        if let Some(count) = removed {
            tracing::info!(client_id = id, clients = count, "Client disconnected");
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Collects a fresh snapshot and pushes it to every client. Skips the
    /// collection entirely when no client is connected; a collection failure
    /// skips the tick and leaves the set unchanged.
    pub async fn broadcast_metrics(&self) {
        let targets = self.stable_copy();
        if targets.is_empty() {
            return;
        }
        let snapshot = match self.source.collect_metrics().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, operation = "collect_metrics", "metrics collection failed");
                return;
            }
        };
        self.deliver("metrics", &snapshot, targets).await;
    }

    /// Same as [`broadcast_metrics`] for the flow table; an empty flow list
    /// skips the tick without an error.
    pub async fn broadcast_flows(&self) {
        let targets = self.stable_copy();
        if targets.is_empty() {
            return;
        }
        let flows = match self.source.collect_flows().await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(error = %e, operation = "collect_flows", "flow collection failed");
                return;
            }
        };
        if flows.is_empty() {
            return;
        }
        self.deliver("network_flows", &flows, targets).await;
    }

    /// Handles one inbound client message. `get_metrics` and `get_flows`
    /// trigger an immediate broadcast to all clients (the original agent
    /// replied to everyone, not just the requester; behavior kept as-is).
    /// Malformed or unrecognized messages are logged and dropped, never fatal.
    pub async fn handle_inbound(&self, text: &str) {
        match serde_json::from_str::<InboundRequest>(text) {
            Ok(InboundRequest::GetMetrics) => self.broadcast_metrics().await,
            Ok(InboundRequest::GetFlows) => self.broadcast_flows().await,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unrecognized client message");
            }
        }
    }

    /// Snapshot of the set at the start of a tick, so unregistration during
    /// delivery cannot corrupt iteration.
    fn stable_copy(&self) -> Vec<(ClientId, mpsc::Sender<Utf8Bytes>)> {
        self.clients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }

    /// Serializes the envelope once and sends it to every target, each send
    /// bounded by the configured deadline. Failing clients are pruned after
    /// the pass; one failing client never aborts delivery to the others.
    async fn deliver<T: Serialize>(
        &self,
        kind: &'static str,
        payload: &T,
        targets: Vec<(ClientId, mpsc::Sender<Utf8Bytes>)>,
    ) {
        let envelope = serde_json::json!({ "type": kind, "payload": payload });
        let text: Utf8Bytes = match serde_json::to_string(&envelope) {
            Ok(s) => s.into(),
            Err(e) => {
                tracing::warn!(error = %e, kind, "envelope serialization failed");
                return;
            }
        };

        let sends = targets.iter().map(|(id, tx)| {
            let text = text.clone();
            async move {
                match tx.send_timeout(text, self.send_timeout).await {
                    Ok(()) => None,
                    Err(_) => Some(*id),
                }
            }
        });
        let dead: Vec<ClientId> = join_all(sends).await.into_iter().flatten().collect();
        for id in dead {
            tracing::warn!(client_id = id, kind, "send failed, dropping client");
            self.unregister(id);
        }
    }
}
