use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use calc_dispatcher::OrchestratorController;
use calc_worker::WorkerService;

use crate::handlers::{
    calculate::{calculate, worker_health},
    expressions::{
        delete_expression, expression_tree, get_expression, list_expressions, submit_expression,
    },
    health::{health_check, not_found},
    operations::{list_operations, update_operations},
    tasks::{start_task, task_result},
    workers::{list_workers, register_worker, worker_tasks},
};

/// 调度端应用状态
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<OrchestratorController>,
}

/// 计算节点应用状态
#[derive(Clone)]
pub struct WorkerState {
    pub service: Arc<WorkerService>,
}

/// 创建调度端路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // 表达式
        .route("/api/expressions", get(list_expressions).post(submit_expression))
        .route(
            "/api/expressions/{id}",
            get(get_expression).delete(delete_expression),
        )
        .route("/api/expressions/{id}/tree", get(expression_tree))
        // Worker
        .route("/api/workers", get(list_workers).post(register_worker))
        .route("/api/workers/{id}/tasks", get(worker_tasks))
        // Worker回调
        .route("/api/tasks/{id}/start", post(start_task))
        .route("/api/tasks/{id}/result", post(task_result))
        .route("/api/operations", get(list_operations).put(update_operations))
        .fallback(not_found)
        .with_state(state)
}

/// 创建计算节点路由
pub fn create_worker_routes(state: WorkerState) -> Router {
    Router::new()
        .route("/health", get(worker_health))
        .route("/api/calculate", post(calculate))
        .with_state(state)
}
