use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "calc-orchestrator",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
