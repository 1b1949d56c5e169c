use std::io::Write;

use calc_core::config::AppConfig;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file_overrides_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[database]
url = "sqlite::memory:"
max_connections = 2
min_connections = 1
connection_timeout_seconds = 5

[dispatcher]
enabled = true
monitoring_period_ms = 1000
default_operation_duration_ms = 50
worker_request_timeout_seconds = 3

[worker]
enabled = true
worker_id = "w-test"
bind_address = "127.0.0.1:9001"
public_url = "http://127.0.0.1:9001"
orchestrator_url = "http://127.0.0.1:9000"
executors = 2
ping_period_ms = 500
orchestrator_request_timeout_seconds = 3

[api]
bind_address = "127.0.0.1:9000"
cors_enabled = false
request_timeout_seconds = 10

[observability]
log_level = "debug"
log_format = "json"
metrics_enabled = false
metrics_bind_address = "127.0.0.1:9090"
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let config = AppConfig::load(Some(&path)).unwrap();

    assert_eq!(config.database.url, "sqlite::memory:");
    assert_eq!(config.dispatcher.monitoring_period_ms, 1000);
    assert_eq!(config.worker.worker_id, "w-test");
    assert_eq!(config.worker.executors, 2);
    assert_eq!(config.observability.log_format, "json");
}

#[test]
fn test_partial_file_falls_back_to_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[worker]\nexecutors = 8\n").unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let config = AppConfig::load(Some(&path)).unwrap();

    assert_eq!(config.worker.executors, 8);
    assert_eq!(config.dispatcher.monitoring_period_ms, 5000);
    assert_eq!(config.api.bind_address, "0.0.0.0:8080");
}

#[test]
fn test_missing_file_is_an_error() {
    let result = AppConfig::load(Some("/nonexistent/calc.toml"));
    assert!(result.is_err());
}
