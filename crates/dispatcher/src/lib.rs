//! 调度端
//!
//! 表达式提交、递归调度、Worker注册与存活检测。HTTP层见 `calc-api`。

pub mod controller;
pub mod liveness_monitor;
pub mod scheduler;
pub mod worker_client;
pub mod worker_registry;

#[cfg(test)]
pub mod test_utils;

pub use controller::{OrchestratorController, WorkerTask};
pub use liveness_monitor::{LivenessMonitor, LivenessMonitorConfig};
pub use scheduler::TaskScheduler;
pub use worker_client::HttpWorkerClient;
pub use worker_registry::WorkerRegistry;
