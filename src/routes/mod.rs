// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::broadcaster::{Broadcaster, MetricsSource};
use crate::config::AppConfig;
use crate::executor::CommandExecutor;

pub(crate) struct AppState<S> {
    pub(crate) broadcaster: Arc<Broadcaster<S>>,
    pub(crate) executor: Arc<CommandExecutor>,
    pub(crate) config: AppConfig,
}

// Manual impl: S itself need not be Clone behind the Arc.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            broadcaster: self.broadcaster.clone(),
            executor: self.executor.clone(),
            config: self.config.clone(),
        }
    }
}

pub fn app<S: MetricsSource>(
    broadcaster: Arc<Broadcaster<S>>,
    executor: Arc<CommandExecutor>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        broadcaster,
        executor,
        config,
    };
    Router::new()
        .route("/", get(|| async { "hostmon agent" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/health", get(http::health_handler)) // GET /api/health
        .route("/api/system-info", get(http::system_info_handler::<S>)) // GET /api/system-info
        .route("/api/execute", post(http::execute_handler::<S>)) // POST /api/execute
        .route("/api/execute-batch", post(http::execute_batch_handler::<S>)) // POST /api/execute-batch
        .route(
            "/api/execute-terminal-batch",
            post(http::execute_terminal_batch_handler::<S>),
        ) // POST /api/execute-terminal-batch
        .route("/api/history", get(http::history_handler::<S>)) // GET /api/history
        .route("/ws", get(ws::ws_stream::<S>)) // WS /ws
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
