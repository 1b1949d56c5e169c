use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use calc_core::{
    models::{
        Expression, NewExpression, Operation, OperationDuration, TaskNode, TaskStatus, Worker,
        WorkerRegistration,
    },
    traits::{ExpressionRepository, OperationRepository},
    SchedulerError, SchedulerResult,
};
use calc_domain::{parse, ExprNode};
use calc_infrastructure::{MetricsCollector, StructuredLogger};

use crate::scheduler::TaskScheduler;

/// 某个Worker上正在执行的节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerTask {
    pub task_id: i64,
    pub expression_id: i64,
    pub operation: Option<Operation>,
    pub first: Option<f64>,
    pub second: Option<f64>,
    pub status: TaskStatus,
}

/// 调度端对外操作的统一入口，HTTP层只做参数转换
pub struct OrchestratorController {
    scheduler: Arc<TaskScheduler>,
    expressions: Arc<dyn ExpressionRepository>,
    operations: Arc<dyn OperationRepository>,
    metrics: MetricsCollector,
}

impl OrchestratorController {
    pub fn new(
        scheduler: Arc<TaskScheduler>,
        expressions: Arc<dyn ExpressionRepository>,
        operations: Arc<dyn OperationRepository>,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            scheduler,
            expressions,
            operations,
            metrics,
        }
    }

    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// 提交表达式：解析、建树、持久化并立即调度
    ///
    /// 同一用户以相同幂等键提交相同文本时返回已有表达式的id，不会重复建树。
    pub async fn submit_expression(
        &self,
        owner_id: i64,
        text: &str,
        idempotency_key: Option<&str>,
    ) -> SchedulerResult<i64> {
        let idempotency_key = idempotency_key.filter(|key| !key.is_empty());

        if let Some(key) = idempotency_key {
            if let Some(existing) = self
                .expressions
                .find_by_idempotency_key(owner_id, key, text)
                .await?
            {
                debug!("幂等键 {} 命中已有表达式 {}", key, existing.id);
                return Ok(existing.id);
            }
        }

        let tree = parse(text)?;

        let expression = self
            .expressions
            .create(&NewExpression {
                owner_id,
                expression: text.to_string(),
                idempotency_key: idempotency_key.map(str::to_string),
            })
            .await?;
        self.metrics.record_expression_submitted();
        StructuredLogger::log_expression_submitted(expression.id, owner_id, text);

        let root_id = self
            .scheduler
            .store()
            .persist(&tree, expression.id, owner_id)
            .await?;

        // 单个数字没有可派发的运算
        if let ExprNode::Leaf { value } = tree {
            if self.expressions.save_result(expression.id, value).await? {
                StructuredLogger::log_expression_finished(expression.id, value);
            }
            return Ok(expression.id);
        }

        self.scheduler.dispatch(root_id).await?;
        Ok(expression.id)
    }

    pub async fn get_expression(&self, owner_id: i64, id: i64) -> SchedulerResult<Expression> {
        match self.expressions.get_by_id(id).await? {
            Some(expression) if expression.owner_id == owner_id => Ok(expression),
            _ => Err(SchedulerError::ExpressionNotFound { id }),
        }
    }

    pub async fn list_expressions(&self, owner_id: i64) -> SchedulerResult<Vec<Expression>> {
        self.expressions.list_by_owner(owner_id).await
    }

    /// 删除表达式及其任务树，已派发的计算结果回来后会被忽略
    pub async fn delete_expression(&self, owner_id: i64, id: i64) -> SchedulerResult<()> {
        self.get_expression(owner_id, id).await?;
        if !self.expressions.delete(id).await? {
            return Err(SchedulerError::ExpressionNotFound { id });
        }
        info!("表达式 {} 已删除", id);
        Ok(())
    }

    pub async fn expression_tree(&self, owner_id: i64, id: i64) -> SchedulerResult<Vec<TaskNode>> {
        self.get_expression(owner_id, id).await?;
        self.scheduler.store().nodes_of_expression(id).await
    }

    /// 注册或心跳。首次注册时触发一次全量调度
    pub async fn register_worker(&self, registration: WorkerRegistration) -> SchedulerResult<bool> {
        let already_existed = self.scheduler.registry().register(&registration).await?;

        if !already_existed {
            StructuredLogger::log_worker_registered(
                &registration.id,
                &registration.url,
                registration.executors,
            );
            // 注册已生效，调度失败留给下一次扫描
            if let Err(e) = self.scheduler.dispatch_all_ready().await {
                warn!("Worker {} 注册后调度失败: {}", registration.id, e);
            }
        }

        Ok(already_existed)
    }

    pub async fn list_workers(&self) -> SchedulerResult<Vec<Worker>> {
        self.scheduler.registry().list().await
    }

    pub async fn worker_tasks(&self, worker_id: &str) -> SchedulerResult<Vec<WorkerTask>> {
        let store = self.scheduler.store();
        let nodes = store.in_flight_of_worker(worker_id).await?;

        let mut tasks = Vec::with_capacity(nodes.len());
        for node in nodes {
            let operands = store.children(node.id).await?;
            let (first, second) = match operands {
                Some((left, right)) => (left.result, right.result),
                None => (None, None),
            };
            tasks.push(WorkerTask {
                task_id: node.id,
                expression_id: node.expression_id,
                operation: node.kind.operation(),
                first,
                second,
                status: node.status,
            });
        }
        Ok(tasks)
    }

    pub async fn start_task(&self, task_id: i64) -> SchedulerResult<()> {
        self.scheduler.on_task_started(task_id).await
    }

    /// 非有限数值的结果按计算失败处理
    pub async fn task_result(&self, task_id: i64, result: f64) -> SchedulerResult<()> {
        self.scheduler.on_task_result(task_id, result).await
    }

    pub async fn list_operations(&self) -> SchedulerResult<Vec<OperationDuration>> {
        self.operations.list().await
    }

    pub async fn update_operation(&self, operation: Operation, duration_ms: i64) -> SchedulerResult<()> {
        if duration_ms < 0 {
            return Err(SchedulerError::InvalidRequest(format!(
                "运算 {operation} 的耗时不能为负数: {duration_ms}"
            )));
        }
        self.operations.upsert(operation, duration_ms).await?;
        info!("运算 {} 耗时设置为 {}ms", operation, duration_ms);
        Ok(())
    }

    /// 运算耗时表为空时写入默认值，返回写入条数
    pub async fn seed_operations(&self, default_duration_ms: i64) -> SchedulerResult<usize> {
        if self.operations.count().await? > 0 {
            return Ok(0);
        }

        for operation in Operation::ALL {
            self.operations.upsert(operation, default_duration_ms).await?;
        }
        info!(
            "已写入默认运算耗时: {}ms x {}",
            default_duration_ms,
            Operation::ALL.len()
        );
        Ok(Operation::ALL.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;
    use calc_core::models::ExpressionStatus;

    #[tokio::test]
    async fn test_end_to_end_with_two_workers() {
        let harness = TestHarness::new().await;
        harness.register_worker("w1", 1).await;
        harness.register_worker("w2", 1).await;

        let id = harness.submit("2*(3+4)-1").await;

        let mut dispatched = Vec::new();
        while let Some(request) = harness.client.next_request() {
            dispatched.push((request.first, request.operation, request.second));
            harness.complete(&request).await;
        }

        assert_eq!(
            dispatched,
            vec![
                (3.0, Operation::Add, 4.0),
                (2.0, Operation::Multiply, 7.0),
                (14.0, Operation::Subtract, 1.0),
            ]
        );

        let expression = harness.expression(id).await;
        assert_eq!(expression.status, ExpressionStatus::Finished);
        assert_eq!(expression.result, Some(13.0));
        assert!(expression.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_left_associative_subtraction() {
        let harness = TestHarness::new().await;
        harness.register_worker("w1", 2).await;
        let id = harness.submit("10-2-3").await;

        while let Some(request) = harness.client.next_request() {
            harness.complete(&request).await;
        }
        assert_eq!(harness.expression(id).await.result, Some(5.0));
    }

    #[tokio::test]
    async fn test_idempotent_submission() {
        let harness = TestHarness::new().await;
        let controller = &harness.controller;

        let first = controller.submit_expression(1, "1+2", Some("key")).await.unwrap();
        let second = controller.submit_expression(1, "1+2", Some("key")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(harness.nodes(first).await.len(), 3);
        assert_eq!(controller.list_expressions(1).await.unwrap().len(), 1);

        // 文本不同或用户不同都视为新的提交
        let other_text = controller.submit_expression(1, "1+3", Some("key")).await.unwrap();
        let other_owner = controller.submit_expression(2, "1+2", Some("key")).await.unwrap();
        assert_ne!(first, other_text);
        assert_ne!(first, other_owner);

        // 没有幂等键时每次都新建
        let a = controller.submit_expression(1, "1+2", None).await.unwrap();
        let b = controller.submit_expression(1, "1+2", Some("")).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_invalid_expression_is_not_persisted() {
        let harness = TestHarness::new().await;
        let err = harness
            .controller
            .submit_expression(1, "2+*3", None)
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(harness.controller.list_expressions(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_number_finishes_immediately() {
        let harness = TestHarness::new().await;
        let id = harness.submit("(42)").await;

        let expression = harness.expression(id).await;
        assert_eq!(expression.status, ExpressionStatus::Finished);
        assert_eq!(expression.result, Some(42.0));
    }

    #[tokio::test]
    async fn test_expressions_are_scoped_by_owner() {
        let harness = TestHarness::new().await;
        let id = harness.submit("1+2").await;

        assert!(harness.controller.get_expression(1, id).await.is_ok());
        assert!(matches!(
            harness.controller.get_expression(2, id).await,
            Err(SchedulerError::ExpressionNotFound { .. })
        ));
        assert!(harness.controller.delete_expression(2, id).await.is_err());

        let tree = harness.controller.expression_tree(1, id).await.unwrap();
        assert_eq!(tree.len(), 3);

        harness.controller.delete_expression(1, id).await.unwrap();
        assert!(harness.controller.get_expression(1, id).await.is_err());
        assert!(harness.nodes(id).await.is_empty());
    }

    #[tokio::test]
    async fn test_worker_tasks_lists_in_flight_nodes() {
        let harness = TestHarness::new().await;
        harness.register_worker("w1", 2).await;
        let id = harness.submit("(1+2)*(3+4)").await;

        let tasks = harness.controller.worker_tasks("w1").await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.expression_id == id));
        assert!(tasks
            .iter()
            .any(|t| t.first == Some(1.0) && t.second == Some(2.0)));

        assert!(harness.controller.worker_tasks("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_operation_durations() {
        let harness = TestHarness::with_operations(&[]).await;
        let controller = &harness.controller;

        assert_eq!(controller.seed_operations(500).await.unwrap(), 4);
        assert_eq!(controller.seed_operations(100).await.unwrap(), 0);

        controller.update_operation(Operation::Multiply, 50).await.unwrap();
        assert!(controller.update_operation(Operation::Add, -1).await.is_err());

        let durations = controller.list_operations().await.unwrap();
        assert_eq!(durations.len(), 4);
        assert_eq!(durations[0].duration_ms, 500);
        assert_eq!(durations[2].duration_ms, 50);
    }

    #[tokio::test]
    async fn test_non_finite_result_fails_expression_and_frees_slot() {
        let harness = TestHarness::new().await;
        harness.register_worker("w1", 1).await;
        let id = harness.submit("1+2").await;
        let request = harness.client.take_requests().remove(0).1;
        harness.controller.start_task(request.task_id).await.unwrap();

        harness
            .controller
            .task_result(request.task_id, f64::NAN)
            .await
            .unwrap();

        let expression = harness.expression(id).await;
        assert_eq!(expression.status, ExpressionStatus::Failed);
        assert_eq!(expression.result, None);
        assert_eq!(harness.nodes(id).await[0].status, TaskStatus::Failed);
        assert!(harness
            .scheduler()
            .registry()
            .free_worker()
            .await
            .unwrap()
            .is_some());
    }
}
