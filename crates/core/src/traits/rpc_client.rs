use async_trait::async_trait;

use crate::models::{CalculationRequest, RegisterWorkerRequest};
use crate::SchedulerResult;

/// 调度端调用Worker的客户端
#[async_trait]
pub trait WorkerClient: Send + Sync {
    async fn calculate(&self, worker_url: &str, request: &CalculationRequest)
        -> SchedulerResult<()>;
}

/// Worker回调调度端的客户端
#[async_trait]
pub trait OrchestratorClient: Send + Sync {
    async fn register(&self, request: &RegisterWorkerRequest) -> SchedulerResult<()>;

    async fn task_started(&self, task_id: i64) -> SchedulerResult<()>;

    async fn task_result(&self, task_id: i64, result: f64) -> SchedulerResult<()>;
}
