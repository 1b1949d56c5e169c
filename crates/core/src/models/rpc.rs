//! 调度端与Worker之间的HTTP/JSON消息体

use serde::{Deserialize, Serialize};

use super::{Operation, WorkerRegistration};

/// Worker注册（兼作心跳）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterWorkerRequest {
    pub id: String,
    pub url: String,
    pub executors: i32,
}

impl From<RegisterWorkerRequest> for WorkerRegistration {
    fn from(request: RegisterWorkerRequest) -> Self {
        WorkerRegistration {
            id: request.id,
            url: request.url,
            executors: request.executors,
        }
    }
}

/// 下发给Worker的单步计算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub task_id: i64,
    pub owner_id: i64,
    pub first: f64,
    pub second: f64,
    pub operation: Operation,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResultRequest {
    pub result: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitExpressionRequest {
    pub expression: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitExpressionResponse {
    pub id: i64,
}
