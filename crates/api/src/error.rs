use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use calc_core::SchedulerError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("调度器错误: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("未找到资源")]
    NotFound,

    #[error("请求超时")]
    Timeout,

    #[error("内部服务器错误: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type, suggestions) = match &self {
            ApiError::Scheduler(SchedulerError::ExpressionNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("表达式 ID {} 不存在", id),
                "EXPRESSION_NOT_FOUND",
                vec![
                    "请检查表达式ID以及X-Owner-Id是否正确".to_string(),
                    "使用 GET /api/expressions 查看当前用户的表达式".to_string(),
                ],
            ),
            ApiError::Scheduler(SchedulerError::TaskNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("任务节点 ID {} 不存在", id),
                "TASK_NOT_FOUND",
                vec!["所属表达式可能已被删除".to_string()],
            ),
            ApiError::Scheduler(SchedulerError::WorkerNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("Worker {} 不存在", id),
                "WORKER_NOT_FOUND",
                vec![
                    "请检查Worker ID是否正确".to_string(),
                    "使用 GET /api/workers 查看所有可用Worker".to_string(),
                ],
            ),
            ApiError::Scheduler(SchedulerError::InvalidExpression(err)) => (
                StatusCode::BAD_REQUEST,
                format!("表达式无效: {}", err),
                "INVALID_EXPRESSION",
                vec![
                    "仅支持非负数、+ - * / 以及括号".to_string(),
                    "示例: 2*(3+4)-1".to_string(),
                ],
            ),
            ApiError::Scheduler(SchedulerError::InvalidRequest(msg)) => (
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {}", msg),
                "INVALID_REQUEST",
                vec!["请检查请求格式和参数".to_string()],
            ),
            ApiError::Scheduler(SchedulerError::OperationNotConfigured(op)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("运算 '{}' 未配置耗时", op.symbol()),
                "OPERATION_NOT_CONFIGURED",
                vec!["使用 PUT /api/operations 配置运算耗时".to_string()],
            ),
            ApiError::Scheduler(
                SchedulerError::WorkerRpc(msg) | SchedulerError::OrchestratorRpc(msg),
            ) => (
                StatusCode::BAD_GATEWAY,
                format!("远程调用失败: {}", msg),
                "UPSTREAM_ERROR",
                vec!["对端服务可能不可用，请稍后重试".to_string()],
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {}", msg),
                "BAD_REQUEST",
                vec![
                    "请检查请求格式和参数".to_string(),
                    "确保Content-Type正确设置".to_string(),
                ],
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "请求的资源不存在".to_string(),
                "NOT_FOUND",
                vec!["请检查请求URL是否正确".to_string()],
            ),
            ApiError::Timeout => (
                StatusCode::REQUEST_TIMEOUT,
                "请求处理超时".to_string(),
                "TIMEOUT",
                vec!["系统繁忙，请稍后重试".to_string()],
            ),
            ApiError::Scheduler(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR",
                vec![
                    "系统遇到内部错误，请稍后重试".to_string(),
                    "查看 GET /health 检查系统状态".to_string(),
                ],
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR",
                vec![format!("错误详情: {}", msg)],
            ),
        };

        if status.is_server_error() {
            tracing::error!("请求处理失败: {}", self);
        }

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
