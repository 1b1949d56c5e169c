use thiserror::Error;

use crate::models::Operation;

/// 调度器错误类型定义
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("表达式未找到: {id}")]
    ExpressionNotFound { id: i64 },

    #[error("任务节点未找到: {id}")]
    TaskNotFound { id: i64 },

    #[error("Worker未找到: {id}")]
    WorkerNotFound { id: String },

    #[error("无效的表达式: {0}")]
    InvalidExpression(#[from] ExpressionError),

    #[error("无效的请求: {0}")]
    InvalidRequest(String),

    #[error("运算未配置耗时: {0}")]
    OperationNotConfigured(Operation),

    #[error("Worker调用失败: {0}")]
    WorkerRpc(String),

    #[error("调度器调用失败: {0}")]
    OrchestratorRpc(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// 是否为可重试的瞬时错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SchedulerError::Database(_)
                | SchedulerError::DatabaseOperation(_)
                | SchedulerError::WorkerRpc(_)
                | SchedulerError::OrchestratorRpc(_)
        )
    }

    /// 是否由调用方输入引起
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SchedulerError::InvalidExpression(_)
                | SchedulerError::InvalidRequest(_)
                | SchedulerError::ExpressionNotFound { .. }
                | SchedulerError::TaskNotFound { .. }
                | SchedulerError::WorkerNotFound { .. }
        )
    }
}

/// 表达式输入错误，提交时同步返回，不会落库
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("表达式为空")]
    Empty,

    #[error("未知符号 '{symbol}' (位置 {position})")]
    UnknownSymbol { symbol: char, position: usize },

    #[error("运算符位置非法 (位置 {position})")]
    InvalidOperatorPlacement { position: usize },

    #[error("括号不匹配")]
    UnbalancedParentheses,

    #[error("数字格式错误: {0}")]
    MalformedNumber(String),

    #[error("括号嵌套超过 {limit} 层")]
    NestingTooDeep { limit: usize },

    #[error("运算符超过 {limit} 个")]
    TooManyOperators { limit: usize },
}

/// 统一的Result类型
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
