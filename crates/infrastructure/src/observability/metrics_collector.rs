//! Metrics collector for the expression scheduler
//!
//! Handles are resolved once against the global recorder. Without an installed
//! recorder every call is a no-op, so tests and embedded use need no setup.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};

#[derive(Clone)]
pub struct MetricsCollector {
    // Orchestrator side
    tasks_dispatched_total: Counter,
    tasks_finished_total: Counter,
    tasks_failed_total: Counter,
    expressions_submitted_total: Counter,
    workers_expired_total: Counter,
    dispatch_sweep_duration: Histogram,

    // Worker side
    worker_executions_total: Counter,
    worker_queue_depth: Gauge,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            tasks_dispatched_total: counter!("calc_tasks_dispatched_total"),
            tasks_finished_total: counter!("calc_tasks_finished_total"),
            tasks_failed_total: counter!("calc_tasks_failed_total"),
            expressions_submitted_total: counter!("calc_expressions_submitted_total"),
            workers_expired_total: counter!("calc_workers_expired_total"),
            dispatch_sweep_duration: histogram!("calc_dispatch_sweep_duration_seconds"),
            worker_executions_total: counter!("calc_worker_executions_total"),
            worker_queue_depth: gauge!("calc_worker_queue_depth"),
        }
    }

    pub fn record_task_dispatched(&self) {
        self.tasks_dispatched_total.increment(1);
    }

    pub fn record_task_finished(&self) {
        self.tasks_finished_total.increment(1);
    }

    pub fn record_task_failed(&self) {
        self.tasks_failed_total.increment(1);
    }

    pub fn record_expression_submitted(&self) {
        self.expressions_submitted_total.increment(1);
    }

    pub fn record_workers_expired(&self, count: usize) {
        self.workers_expired_total.increment(count as u64);
    }

    pub fn record_sweep_duration(&self, duration_seconds: f64) {
        self.dispatch_sweep_duration.record(duration_seconds);
    }

    pub fn record_worker_execution(&self) {
        self.worker_executions_total.increment(1);
    }

    pub fn increment_queue_depth(&self) {
        self.worker_queue_depth.increment(1.0);
    }

    pub fn decrement_queue_depth(&self) {
        self.worker_queue_depth.decrement(1.0);
    }
}
