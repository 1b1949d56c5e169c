use axum::{extract::State, response::IntoResponse, Json};
use calc_core::models::Operation;
use serde::Deserialize;

use crate::{error::ApiResult, response::success, routes::AppState};

/// 只更新请求中给出的运算
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOperationsRequest {
    pub add_ms: Option<i64>,
    pub subtract_ms: Option<i64>,
    pub multiply_ms: Option<i64>,
    pub divide_ms: Option<i64>,
}

impl UpdateOperationsRequest {
    fn changes(&self) -> impl Iterator<Item = (Operation, i64)> + '_ {
        [
            (Operation::Add, self.add_ms),
            (Operation::Subtract, self.subtract_ms),
            (Operation::Multiply, self.multiply_ms),
            (Operation::Divide, self.divide_ms),
        ]
        .into_iter()
        .filter_map(|(op, ms)| ms.map(|ms| (op, ms)))
    }
}

pub async fn list_operations(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let operations = state.controller.list_operations().await?;
    Ok(success(operations))
}

pub async fn update_operations(
    State(state): State<AppState>,
    Json(request): Json<UpdateOperationsRequest>,
) -> ApiResult<impl IntoResponse> {
    for (operation, duration_ms) in request.changes() {
        state.controller.update_operation(operation, duration_ms).await?;
    }

    let operations = state.controller.list_operations().await?;
    Ok(success(operations))
}
