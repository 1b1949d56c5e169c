use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use calc_core::models::TaskResultRequest;

use crate::{error::ApiResult, response::accepted, routes::AppState};

pub async fn start_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.controller.start_task(id).await?;
    Ok(accepted(format!("任务节点 {} 开始计算", id)))
}

pub async fn task_result(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<TaskResultRequest>,
) -> ApiResult<impl IntoResponse> {
    state.controller.task_result(id, request.result).await?;
    Ok(accepted(format!("任务节点 {} 结果已接收", id)))
}
