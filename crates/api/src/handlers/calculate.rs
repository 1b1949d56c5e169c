use axum::{extract::State, response::IntoResponse, Json};
use calc_core::models::CalculationRequest;
use serde_json::{json, Value};
use tracing::debug;

use crate::{error::ApiResult, response::accepted, routes::WorkerState};

pub async fn worker_health(State(state): State<WorkerState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "calc-worker",
        "worker_id": state.service.worker_id(),
        "hostname": state.service.hostname(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 接收调度端下发的单步计算，放入所属用户的队列后返回
///
/// 队列已满时请求会在此等待，直到有空位。
pub async fn calculate(
    State(state): State<WorkerState>,
    Json(request): Json<CalculationRequest>,
) -> ApiResult<impl IntoResponse> {
    debug!(
        "收到计算任务 {}: {} {} {}",
        request.task_id,
        request.first,
        request.operation.symbol(),
        request.second
    );

    let task_id = request.task_id;
    state.service.calculate(request).await?;
    Ok(accepted(format!("任务节点 {} 已入队", task_id)))
}
