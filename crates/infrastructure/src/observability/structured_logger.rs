//! Structured logging utilities
//!
//! Every record carries an `event` field so log pipelines can filter the
//! lifecycle of expressions, task nodes and workers.

use std::str::FromStr;

use tracing::{error, info, warn};

/// Structured logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_location: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("Invalid log format: {other}")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: false,
        }
    }
}

/// Structured logging utilities
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_expression_submitted(expression_id: i64, owner_id: i64, expression: &str) {
        info!(
            event = "expression_submitted",
            expression.id = expression_id,
            expression.owner_id = owner_id,
            expression.text = expression,
            "Expression submitted"
        );
    }

    pub fn log_expression_finished(expression_id: i64, result: f64) {
        info!(
            event = "expression_finished",
            expression.id = expression_id,
            expression.result = result,
            "Expression finished"
        );
    }

    pub fn log_task_dispatched(task_id: i64, operation: char, worker_id: &str, duration_ms: i64) {
        info!(
            event = "task_dispatched",
            task.id = task_id,
            task.operation = %operation,
            worker.id = worker_id,
            task.duration_ms = duration_ms,
            "Task dispatched to worker"
        );
    }

    pub fn log_task_started(task_id: i64) {
        info!(event = "task_started", task.id = task_id, "Task started");
    }

    pub fn log_task_finished(task_id: i64, result: f64) {
        info!(
            event = "task_finished",
            task.id = task_id,
            task.result = result,
            "Task finished"
        );
    }

    pub fn log_task_failed(task_id: i64, expression_id: i64, reason: &str) {
        warn!(
            event = "task_failed",
            task.id = task_id,
            expression.id = expression_id,
            reason = reason,
            "Task failed"
        );
    }

    pub fn log_worker_registered(worker_id: &str, url: &str, executors: i32) {
        info!(
            event = "worker_registered",
            worker.id = worker_id,
            worker.url = url,
            worker.executors = executors,
            "Worker registered"
        );
    }

    pub fn log_worker_expired(worker_id: &str, released_tasks: u64) {
        warn!(
            event = "worker_expired",
            worker.id = worker_id,
            worker.released_tasks = released_tasks,
            "Worker expired, in-flight tasks requeued"
        );
    }

    pub fn log_system_error(component: &str, operation: &str, error: &str) {
        error!(
            event = "system_error",
            component = component,
            operation = operation,
            error = error,
            "System error occurred"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
