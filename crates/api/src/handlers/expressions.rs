use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use calc_core::models::{SubmitExpressionRequest, SubmitExpressionResponse};
use tracing::debug;

use crate::{
    error::ApiResult,
    extractors::OwnerId,
    response::{created, success},
    routes::AppState,
};

/// 提交表达式，返回新建（或幂等命中）的表达式id
pub async fn submit_expression(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<SubmitExpressionRequest>,
) -> ApiResult<impl IntoResponse> {
    debug!("用户 {} 提交表达式: {}", owner_id, request.expression);

    let id = state
        .controller
        .submit_expression(
            owner_id,
            &request.expression,
            request.idempotency_key.as_deref(),
        )
        .await?;

    Ok(created(SubmitExpressionResponse { id }))
}

pub async fn list_expressions(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> ApiResult<impl IntoResponse> {
    let expressions = state.controller.list_expressions(owner_id).await?;
    Ok(success(expressions))
}

pub async fn get_expression(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let expression = state.controller.get_expression(owner_id, id).await?;
    Ok(success(expression))
}

/// 删除表达式及其全部节点
pub async fn delete_expression(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.controller.delete_expression(owner_id, id).await?;
    Ok(success(serde_json::json!({ "id": id, "deleted": true })))
}

pub async fn expression_tree(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let nodes = state.controller.expression_tree(owner_id, id).await?;
    Ok(success(nodes))
}
