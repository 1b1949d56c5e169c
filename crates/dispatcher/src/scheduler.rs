use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, error, info, warn, Instrument};

use calc_core::{
    models::{CalculationRequest, ExpressionStatus, Operation, TaskNode, TaskStatus},
    traits::{ExpressionRepository, OperationRepository, WorkerClient},
    SchedulerError, SchedulerResult,
};
use calc_domain::TaskTreeStore;
use calc_infrastructure::{MetricsCollector, StructuredLogger};

use crate::worker_registry::WorkerRegistry;

/// 递归调度器
///
/// 从任意节点出发向下寻找两个子节点都已完成的运算节点，把它派发给空闲槽位最多的Worker。
/// 没有空闲Worker时直接返回，等待下一次结果回调或Worker注册再次触发。
pub struct TaskScheduler {
    store: TaskTreeStore,
    registry: WorkerRegistry,
    expressions: Arc<dyn ExpressionRepository>,
    operations: Arc<dyn OperationRepository>,
    worker_client: Arc<dyn WorkerClient>,
    metrics: MetricsCollector,
}

impl TaskScheduler {
    pub fn new(
        store: TaskTreeStore,
        registry: WorkerRegistry,
        expressions: Arc<dyn ExpressionRepository>,
        operations: Arc<dyn OperationRepository>,
        worker_client: Arc<dyn WorkerClient>,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            store,
            registry,
            expressions,
            operations,
            worker_client,
            metrics,
        }
    }

    pub fn store(&self) -> &TaskTreeStore {
        &self.store
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// 调度以 `node_id` 为根的子树
    pub fn dispatch(&self, node_id: i64) -> BoxFuture<'_, SchedulerResult<()>> {
        async move {
            let node = self.store.get(node_id).await?;
            if node.status != TaskStatus::Created {
                return Ok(());
            }

            let Some((left, right)) = self.store.children(node_id).await? else {
                return Ok(());
            };

            if left.status == TaskStatus::Finished && right.status == TaskStatus::Finished {
                return self.dispatch_ready(&node, &left, &right).await;
            }

            for child in [left, right] {
                if child.status == TaskStatus::Created {
                    self.dispatch(child.id).await?;
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// 对所有未开始计算的根节点执行调度
    ///
    /// 单个根节点调度失败只记录日志并继续下一个，返回第一个错误。
    pub async fn dispatch_all_ready(&self) -> SchedulerResult<()> {
        let start_time = Instant::now();
        let roots = self.store.uncalculated_roots().await?;

        let span = tracing::info_span!("dispatch_all_ready", roots = roots.len());
        let first_error = async {
            let mut first_error = None;
            for root_id in roots {
                if let Err(e) = self.dispatch(root_id).await {
                    warn!("根节点 {} 调度失败: {}", root_id, e);
                    first_error.get_or_insert(e);
                }
            }
            first_error
        }
        .instrument(span)
        .await;

        self.metrics
            .record_sweep_duration(start_time.elapsed().as_secs_f64());
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Worker开始执行某个节点
    pub async fn on_task_started(&self, task_id: i64) -> SchedulerResult<()> {
        let node = self.store.get(task_id).await?;

        if self.store.set_status(task_id, TaskStatus::Calculating).await? {
            StructuredLogger::log_task_started(task_id);
        } else {
            debug!("任务节点 {} 状态为 {:?}，忽略开始回调", task_id, node.status);
        }

        self.expressions
            .update_status(node.expression_id, ExpressionStatus::Calculating)
            .await?;
        Ok(())
    }

    /// Worker回报节点结果：根节点写入表达式结果，否则继续调度
    pub async fn on_task_result(&self, task_id: i64, value: f64) -> SchedulerResult<()> {
        let node = self.store.get(task_id).await?;

        if !value.is_finite() {
            return self.fail_node(&node, "计算结果不是有限数值").await;
        }

        if self.store.set_result(task_id, value).await? {
            self.metrics.record_task_finished();
            StructuredLogger::log_task_finished(task_id, value);
        } else {
            debug!("任务节点 {} 已结束，忽略重复结果 {}", task_id, value);
        }

        if node.is_root() {
            if self.expressions.save_result(node.expression_id, value).await? {
                StructuredLogger::log_expression_finished(node.expression_id, value);
            }
            return Ok(());
        }

        // 结果已经落库，后续扫描的失败不回传给Worker
        if let Err(e) = self.dispatch_all_ready().await {
            warn!("任务节点 {} 的结果已记录，后续调度失败: {}", task_id, e);
        }
        Ok(())
    }

    /// 节点与表达式置为Failed，祖先节点保持原状态
    pub async fn fail_node(&self, node: &TaskNode, reason: &str) -> SchedulerResult<()> {
        self.store.mark_failed(node.id).await?;
        self.expressions
            .update_status(node.expression_id, ExpressionStatus::Failed)
            .await?;

        self.metrics.record_task_failed();
        StructuredLogger::log_task_failed(node.id, node.expression_id, reason);
        Ok(())
    }

    async fn dispatch_ready(
        &self,
        node: &TaskNode,
        left: &TaskNode,
        right: &TaskNode,
    ) -> SchedulerResult<()> {
        let operation = node.kind.operation().ok_or_else(|| {
            SchedulerError::Internal(format!("任务节点 {} 有子节点但不是运算节点", node.id))
        })?;

        let duration_ms = self
            .operations
            .get_duration(operation)
            .await?
            .ok_or(SchedulerError::OperationNotConfigured(operation))?;

        let Some(worker) = self.registry.free_worker().await? else {
            debug!("没有空闲Worker，任务节点 {} 等待下次调度", node.id);
            return Ok(());
        };

        let first = Self::finished_value(left)?;
        let second = Self::finished_value(right)?;

        if operation == Operation::Divide && second == 0.0 {
            return self.fail_node(node, "除数为零").await;
        }

        // 结果溢出为无穷时无法通过JSON回报，与除零一样直接判定失败
        if !operation.apply(first, second).is_finite() {
            return self.fail_node(node, "计算结果溢出").await;
        }

        let request = CalculationRequest {
            task_id: node.id,
            owner_id: node.owner_id,
            first,
            second,
            operation,
            duration_ms,
        };

        if let Err(e) = self.worker_client.calculate(&worker.url, &request).await {
            error!("派发任务节点 {} 到Worker {} 失败: {}", node.id, worker.id, e);
            return Err(e);
        }

        if !self.store.assign_worker(node.id, &worker.id).await? {
            info!("任务节点 {} 在派发期间已结束", node.id);
        }

        self.metrics.record_task_dispatched();
        StructuredLogger::log_task_dispatched(node.id, operation.symbol(), &worker.id, duration_ms);
        Ok(())
    }

    fn finished_value(node: &TaskNode) -> SchedulerResult<f64> {
        node.result.ok_or_else(|| {
            SchedulerError::Internal(format!("已完成的任务节点 {} 缺少结果", node.id))
        })
    }
}
