//! # Calc API
//!
//! 调度端与计算节点的HTTP接口，基于Axum。
//!
//! ## 调度端
//!
//! - `GET /health` - 健康检查
//! - `POST /api/expressions` - 提交表达式（支持幂等键）
//! - `GET /api/expressions` - 当前用户的表达式列表
//! - `GET /api/expressions/{id}` - 表达式详情
//! - `DELETE /api/expressions/{id}` - 删除表达式
//! - `GET /api/expressions/{id}/tree` - 表达式的任务树
//! - `POST /api/workers` - Worker注册（兼作心跳）
//! - `GET /api/workers` - Worker列表
//! - `GET /api/workers/{id}/tasks` - Worker上执行中的节点
//! - `POST /api/tasks/{id}/start` - Worker回调：开始执行
//! - `POST /api/tasks/{id}/result` - Worker回调：回报结果
//! - `GET /api/operations`, `PUT /api/operations` - 运算耗时
//!
//! 用户由请求头 `X-Owner-Id` 指定，缺省为1。
//!
//! ## 计算节点
//!
//! - `GET /health`
//! - `POST /api/calculate` - 接收单步计算，入队后立即返回
//!
//! ## 响应格式
//!
//! ```json
//! { "success": true, "data": { "id": 1 }, "message": null, "timestamp": "2024-01-01T00:00:00Z" }
//! ```
//!
//! 错误统一为 `{ "error": { "message", "type", "code", "suggestions", "timestamp" } }`。

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;

use calc_core::config::ApiConfig;
use calc_dispatcher::OrchestratorController;
use calc_worker::WorkerService;

use middleware::{cors_layer, request_logging, request_timeout, trace_layer};
use routes::{create_routes, create_worker_routes, AppState, WorkerState};

/// 创建调度端API应用
pub fn create_app(controller: Arc<OrchestratorController>, api_config: &ApiConfig) -> Router {
    let timeout = Duration::from_secs(api_config.request_timeout_seconds);
    let router = create_routes(AppState { controller }).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(axum::middleware::from_fn(request_logging))
            .layer(axum::middleware::from_fn_with_state(timeout, request_timeout)),
    );

    if api_config.cors_enabled {
        router.layer(cors_layer())
    } else {
        router
    }
}

/// 创建计算节点API应用
pub fn create_worker_app(service: Arc<WorkerService>) -> Router {
    create_worker_routes(WorkerState { service }).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    )
}
