use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use calc_core::models::RegisterWorkerRequest;
use serde_json::json;

use crate::{error::ApiResult, response::success, routes::AppState};

/// Worker注册与心跳共用此接口
pub async fn register_worker(
    State(state): State<AppState>,
    Json(request): Json<RegisterWorkerRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = request.id.clone();
    let already_existed = state.controller.register_worker(request.into()).await?;
    Ok(success(json!({ "id": id, "already_existed": already_existed })))
}

pub async fn list_workers(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let workers = state.controller.list_workers().await?;
    Ok(success(workers))
}

/// Worker上已派发且未完成的节点
pub async fn worker_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let tasks = state.controller.worker_tasks(&id).await?;
    Ok(success(tasks))
}
