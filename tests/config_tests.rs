// Config loading and validation tests

use hostmon::config::AppConfig;

const VALID_CONFIG: &str = r#"
[server]
port = 8765
host = "0.0.0.0"

[publishing]
client_queue_capacity = 32
send_timeout_ms = 5000

[monitoring]
metrics_interval_ms = 1000
stats_log_interval_secs = 60

[executor]
default_timeout_secs = 30
terminal_open_timeout_secs = 10
history_limit = 50
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8765);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.publishing.client_queue_capacity, 32);
    assert_eq!(config.publishing.send_timeout_ms, 5000);
    assert_eq!(config.monitoring.metrics_interval_ms, 1000);
    assert_eq!(config.executor.default_timeout_secs, 30);
    assert_eq!(config.executor.history_limit, 50);
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let config = VALID_CONFIG.replace("port = 8765", "port = 0");
    assert!(AppConfig::load_from_str(&config).is_err());
}

#[test]
fn test_config_validation_rejects_empty_host() {
    let config = VALID_CONFIG.replace("host = \"0.0.0.0\"", "host = \"\"");
    assert!(AppConfig::load_from_str(&config).is_err());
}

#[test]
fn test_config_validation_rejects_zero_interval() {
    let config = VALID_CONFIG.replace("metrics_interval_ms = 1000", "metrics_interval_ms = 0");
    assert!(AppConfig::load_from_str(&config).is_err());
}

#[test]
fn test_config_validation_rejects_zero_queue_capacity() {
    let config =
        VALID_CONFIG.replace("client_queue_capacity = 32", "client_queue_capacity = 0");
    assert!(AppConfig::load_from_str(&config).is_err());
}

#[test]
fn test_config_validation_rejects_zero_executor_timeout() {
    let config =
        VALID_CONFIG.replace("default_timeout_secs = 30", "default_timeout_secs = 0");
    assert!(AppConfig::load_from_str(&config).is_err());
}

#[test]
fn test_config_rejects_missing_section() {
    let config = VALID_CONFIG.replace("[executor]", "[something_else]");
    assert!(AppConfig::load_from_str(&config).is_err());
}
