// WebSocket handler: register with the broadcaster, drain the outbound
// queue into the socket, feed inbound requests back to the broadcaster.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::broadcaster::{Broadcaster, MetricsSource};

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_stream<S: MetricsSource>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    let broadcaster = state.broadcaster.clone();
    let queue_capacity = state.config.publishing.client_queue_capacity;
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_client(socket, broadcaster, queue_capacity).await {
            tracing::info!("Client stream error: {}", e);
        }
    })
}

async fn stream_client<S: MetricsSource>(
    socket: WebSocket,
    broadcaster: Arc<Broadcaster<S>>,
    queue_capacity: usize,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel(queue_capacity);
    let id = broadcaster.register(tx);

    // Initial push so the dashboard renders without waiting for a tick.
    broadcaster.broadcast_metrics().await;
    broadcaster.broadcast_flows().await;

    let (mut sink, mut stream) = socket.split();
    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            queued = rx.recv() => {
                match queued {
                    Some(text) => {
                        let r = timeout(WS_SEND_TIMEOUT, sink.send(Message::Text(text))).await;
                        if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                            break Ok(());
                        }
                    }
                    // Queue closed: the broadcaster pruned this client.
                    None => break Ok(()),
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        broadcaster.handle_inbound(text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, sink.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break Ok(());
                }
            }
        }
    };
    broadcaster.unregister(id);
    result
}
