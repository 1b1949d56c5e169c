//! 数据仓储层接口定义
//!
//! 四个仓储各自负责一张表：
//! - `ExpressionRepository` - 表达式记录与幂等查找
//! - `TaskTreeRepository` - 任务树节点，所有状态写入均为条件更新
//! - `WorkerRepository` - Worker注册、空闲容量查询与过期清理
//! - `OperationRepository` - 运算模拟耗时配置
//!
//! 状态只能单调推进：任何写入若不会严格提升状态，则被静默忽略并返回 `false`。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Expression, ExpressionStatus, FreeWorker, NewExpression, NewTaskNode, Operation,
    OperationDuration, TaskNode, TaskStatus, Worker, WorkerRegistration,
};
use crate::SchedulerResult;

/// 表达式仓储接口
#[async_trait]
pub trait ExpressionRepository: Send + Sync {
    async fn create(&self, expression: &NewExpression) -> SchedulerResult<Expression>;

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Expression>>;

    /// 同一用户、同一幂等键、同一表达式文本视为重复提交
    async fn find_by_idempotency_key(
        &self,
        owner_id: i64,
        idempotency_key: &str,
        expression: &str,
    ) -> SchedulerResult<Option<Expression>>;

    /// 按创建时间倒序
    async fn list_by_owner(&self, owner_id: i64) -> SchedulerResult<Vec<Expression>>;

    /// 条件更新，仅当新状态更高且当前不是终态时生效
    async fn update_status(&self, id: i64, status: ExpressionStatus) -> SchedulerResult<bool>;

    /// 写入结果并置为Finished
    async fn save_result(&self, id: i64, result: f64) -> SchedulerResult<bool>;

    /// 删除表达式，级联删除其任务树
    async fn delete(&self, id: i64) -> SchedulerResult<bool>;
}

/// 任务树仓储接口
#[async_trait]
pub trait TaskTreeRepository: Send + Sync {
    async fn insert(&self, node: &NewTaskNode) -> SchedulerResult<i64>;

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<TaskNode>>;

    /// 按位置排序：左子节点在前
    async fn find_children(&self, parent_id: i64) -> SchedulerResult<Vec<TaskNode>>;

    async fn find_by_expression(&self, expression_id: i64) -> SchedulerResult<Vec<TaskNode>>;

    /// 分配给该Worker且仍在执行中的节点
    async fn find_in_flight_by_worker(&self, worker_id: &str) -> SchedulerResult<Vec<TaskNode>>;

    async fn update_status(&self, id: i64, status: TaskStatus) -> SchedulerResult<bool>;

    async fn save_result(&self, id: i64, result: f64) -> SchedulerResult<bool>;

    /// 绑定Worker并置为Enqueued
    async fn assign_worker(&self, id: i64, worker_id: &str) -> SchedulerResult<bool>;

    /// 仍处于Created状态的根节点
    async fn find_uncalculated_roots(&self) -> SchedulerResult<Vec<i64>>;

    /// 把该Worker上未完成的节点退回Created并清除绑定
    async fn release_worker(&self, worker_id: &str) -> SchedulerResult<u64>;

    async fn release_all_workers(&self) -> SchedulerResult<u64>;
}

/// Worker仓储接口
#[async_trait]
pub trait WorkerRepository: Send + Sync {
    /// 注册或刷新心跳，返回此前是否已存在
    async fn upsert(&self, registration: &WorkerRegistration) -> SchedulerResult<bool>;

    async fn get_by_id(&self, id: &str) -> SchedulerResult<Option<Worker>>;

    async fn list(&self) -> SchedulerResult<Vec<Worker>>;

    /// 空闲槽位最多者优先，相同时按id升序
    async fn find_free(&self) -> SchedulerResult<Option<FreeWorker>>;

    /// 删除心跳早于截止时间的Worker，返回被删除的id
    async fn delete_older_than(&self, deadline: DateTime<Utc>) -> SchedulerResult<Vec<String>>;
}

/// 运算耗时配置仓储接口
#[async_trait]
pub trait OperationRepository: Send + Sync {
    async fn get_duration(&self, operation: Operation) -> SchedulerResult<Option<i64>>;

    async fn list(&self) -> SchedulerResult<Vec<OperationDuration>>;

    async fn upsert(&self, operation: Operation, duration_ms: i64) -> SchedulerResult<()>;

    async fn count(&self) -> SchedulerResult<i64>;
}
