// HTTP handlers: health, system info, command execution, history

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::time::Duration;

use super::AppState;
use crate::broadcaster::MetricsSource;
use crate::executor::unix_time_secs;
use crate::version::{NAME, VERSION};

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/health
pub(super) async fn health_handler<S: MetricsSource>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "platform": state.executor.platform().name(),
        "timestamp": unix_time_secs(),
    }))
}

/// GET /api/system-info — static host identity; fetch once, not streamed.
pub(super) async fn system_info_handler<S: MetricsSource>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    let working_directory = std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    Json(serde_json::json!({
        "platform": sysinfo::System::name().unwrap_or_else(|| std::env::consts::OS.into()),
        "platform_release": sysinfo::System::kernel_version().unwrap_or_default(),
        "platform_version": sysinfo::System::os_version().unwrap_or_default(),
        "architecture": std::env::consts::ARCH,
        "processor": crate::sysinfo_repo::processor_name(),
        "hostname": sysinfo::System::host_name().unwrap_or_default(),
        "shell": state.executor.platform().shell(),
        "working_directory": working_directory,
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct ExecuteRequest {
    command: Option<String>,
    timeout: Option<u64>,
    mode: Option<String>,
}

fn invalid_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "success": false,
            "error": message,
            "error_type": "invalid_request",
        })),
    )
        .into_response()
}

/// POST /api/execute — run a single command, in a terminal window by default.
pub(super) async fn execute_handler<S: MetricsSource>(
    State(state): State<AppState<S>>,
    Json(req): Json<ExecuteRequest>,
) -> axum::response::Response {
    let Some(command) = req.command.as_deref().map(str::trim) else {
        return invalid_request("No command provided");
    };
    if command.is_empty() {
        return invalid_request("Empty command provided");
    }
    if state.executor.check_blocked(command).is_err() {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({
                "success": false,
                "error": "Dangerous command blocked for security",
                "error_type": "security_block",
                "command": command,
            })),
        )
            .into_response();
    }

    let timeout =
        Duration::from_secs(req.timeout.unwrap_or(state.config.executor.default_timeout_secs));
    let record = match req.mode.as_deref() {
        Some("background") => state.executor.run_background(command, timeout).await,
        _ => state.executor.run_in_terminal(command, timeout).await,
    };
    Json(record).into_response()
}

#[derive(Debug, Deserialize)]
pub(super) struct ExecuteBatchRequest {
    commands: Option<Vec<String>>,
    timeout: Option<u64>,
    mode: Option<String>,
    #[serde(default = "default_stop_on_error")]
    stop_on_error: bool,
}

fn default_stop_on_error() -> bool {
    true
}

/// POST /api/execute-batch — run commands in sequence, optionally stopping on
/// the first failure.
pub(super) async fn execute_batch_handler<S: MetricsSource>(
    State(state): State<AppState<S>>,
    Json(req): Json<ExecuteBatchRequest>,
) -> axum::response::Response {
    let Some(commands) = req.commands else {
        return invalid_request("No commands provided");
    };
    let timeout =
        Duration::from_secs(req.timeout.unwrap_or(state.config.executor.default_timeout_secs));

    let mut results = Vec::new();
    for command in &commands {
        let record = match req.mode.as_deref() {
            Some("background") => state.executor.run_background(command.trim(), timeout).await,
            _ => state.executor.run_in_terminal(command.trim(), timeout).await,
        };
        let success = record.success;
        results.push(record);
        if req.stop_on_error && !success {
            break;
        }
    }

    let executed = results.len();
    Json(serde_json::json!({
        "success": true,
        "results": results,
        "total_commands": commands.len(),
        "executed_commands": executed,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub(super) struct TerminalBatchRequest {
    commands: Option<Vec<String>>,
}

/// POST /api/execute-terminal-batch — one terminal window for the whole batch.
pub(super) async fn execute_terminal_batch_handler<S: MetricsSource>(
    State(state): State<AppState<S>>,
    Json(req): Json<TerminalBatchRequest>,
) -> axum::response::Response {
    let Some(commands) = req.commands else {
        return invalid_request("No commands provided");
    };
    match state.executor.run_terminal_batch(&commands).await {
        Ok(()) => Json(serde_json::json!({
            "success": true,
            "method": "terminal_batch",
            "commands": commands,
            "platform": state.executor.platform().name(),
            "message": format!("Opened terminal with {} commands", commands.len()),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "success": false,
                "error": format!("Terminal batch error: {e}"),
                "error_type": "api_error",
            })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    limit: Option<usize>,
}

/// GET /api/history — tail of the in-memory execution history.
pub(super) async fn history_handler<S: MetricsSource>(
    State(state): State<AppState<S>>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(state.config.executor.history_limit);
    let (history, total) = state.executor.history(limit);
    Json(serde_json::json!({
        "history": history,
        "total": total,
    }))
}
