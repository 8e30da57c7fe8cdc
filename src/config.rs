use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub publishing: PublishingConfig,
    pub monitoring: MonitoringConfig,
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max queued outbound messages per client before sends start timing out.
    pub client_queue_capacity: usize,
    /// Deadline for handing a message to a client queue; a slower client is dropped.
    pub send_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub metrics_interval_ms: u64,
    /// How often to log app stats (connected clients) at INFO level.
    pub stats_log_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Timeout applied to /api/execute when the request does not carry one.
    pub default_timeout_secs: u64,
    /// How long to wait for the terminal emulator itself to open.
    pub terminal_open_timeout_secs: u64,
    /// Terminal emulator binary; replaces the platform default when set.
    #[serde(default)]
    pub terminal_program: Option<String>,
    /// Default number of records returned by GET /api/history.
    pub history_limit: usize,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            self.publishing.client_queue_capacity > 0,
            "publishing.client_queue_capacity must be > 0, got {}",
            self.publishing.client_queue_capacity
        );
        anyhow::ensure!(
            self.publishing.send_timeout_ms > 0,
            "publishing.send_timeout_ms must be > 0, got {}",
            self.publishing.send_timeout_ms
        );
        anyhow::ensure!(
            self.monitoring.metrics_interval_ms > 0,
            "monitoring.metrics_interval_ms must be > 0, got {}",
            self.monitoring.metrics_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.executor.default_timeout_secs > 0,
            "executor.default_timeout_secs must be > 0, got {}",
            self.executor.default_timeout_secs
        );
        anyhow::ensure!(
            self.executor.terminal_open_timeout_secs > 0,
            "executor.terminal_open_timeout_secs must be > 0, got {}",
            self.executor.terminal_open_timeout_secs
        );
        anyhow::ensure!(
            self.executor.history_limit > 0,
            "executor.history_limit must be > 0, got {}",
            self.executor.history_limit
        );
        Ok(())
    }
}
