// Background broadcast worker (port of the Python monitoring loop).
// Metrics go out every tick; flows on even wall-clock seconds.

use std::sync::Arc;

use tokio::time::{Duration, interval};

use crate::broadcaster::{Broadcaster, MetricsSource};

/// Channels and shutdown for the worker.
pub struct WorkerDeps<S> {
    pub broadcaster: Arc<Broadcaster<S>>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing and logging config.
pub struct WorkerConfig {
    pub metrics_interval_ms: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

pub fn spawn<S: MetricsSource>(deps: WorkerDeps<S>, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        broadcaster,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        metrics_interval_ms,
        stats_log_interval_secs,
    } = config;

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(metrics_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", metrics_interval_ms);
        let _guard = worker_span.enter();

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    broadcaster.broadcast_metrics().await;
                    // The original agent gated flows on second parity rather
                    // than a second timer; the two cadences may coincide.
                    let now_secs = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or(0);
                    if now_secs % 2 == 0 {
                        broadcaster.broadcast_flows().await;
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        ws_clients = broadcaster.client_count(),
                        "app stats"
                    );
                }
            }
        }
    })
}
