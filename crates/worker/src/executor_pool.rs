//! 固定大小的执行器池
//!
//! N个执行器共享一个容量为5N的有界队列。队列满时 `submit` 等待，不丢弃请求。

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use calc_core::{models::CalculationRequest, SchedulerError, SchedulerResult};
use calc_infrastructure::MetricsCollector;

use crate::calculation::CalculationExecutor;

/// 每个执行器对应的队列容量
pub const QUEUE_CAPACITY_PER_EXECUTOR: usize = 5;

pub struct ExecutorsPool {
    owner_id: i64,
    sender: RwLock<Option<mpsc::Sender<CalculationRequest>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    metrics: MetricsCollector,
}

impl ExecutorsPool {
    pub fn new(
        owner_id: i64,
        executors: usize,
        executor: Arc<CalculationExecutor>,
        metrics: MetricsCollector,
    ) -> Self {
        let executors = executors.max(1);
        let (sender, receiver) = mpsc::channel(executors * QUEUE_CAPACITY_PER_EXECUTOR);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..executors)
            .map(|index| {
                tokio::spawn(Self::run_executor(
                    owner_id,
                    index,
                    Arc::clone(&receiver),
                    Arc::clone(&executor),
                    metrics.clone(),
                ))
            })
            .collect();

        debug!("用户 {} 的执行器池已创建: {} 个执行器", owner_id, executors);
        Self {
            owner_id,
            sender: RwLock::new(Some(sender)),
            handles: Mutex::new(handles),
            metrics,
        }
    }

    /// 入队，队列满时等待空位
    pub async fn submit(&self, request: CalculationRequest) -> SchedulerResult<()> {
        let sender = self.sender.read().await.clone().ok_or_else(|| {
            SchedulerError::Internal(format!("用户 {} 的执行器池已关闭", self.owner_id))
        })?;

        let task_id = request.task_id;
        sender.send(request).await.map_err(|_| {
            SchedulerError::Internal(format!("用户 {} 的执行器池已关闭", self.owner_id))
        })?;
        self.metrics.increment_queue_depth();

        debug!("任务节点 {} 进入用户 {} 的队列", task_id, self.owner_id);
        Ok(())
    }

    /// 关闭队列并等待已入队的请求全部执行完
    pub async fn shutdown(&self) {
        self.sender.write().await.take();

        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                error!("用户 {} 的执行器异常退出: {}", self.owner_id, e);
            }
        }
        info!("用户 {} 的执行器池已关闭", self.owner_id);
    }

    async fn run_executor(
        owner_id: i64,
        index: usize,
        receiver: Arc<Mutex<mpsc::Receiver<CalculationRequest>>>,
        executor: Arc<CalculationExecutor>,
        metrics: MetricsCollector,
    ) {
        loop {
            let request = receiver.lock().await.recv().await;
            let Some(request) = request else {
                break;
            };
            metrics.decrement_queue_depth();

            if let Err(e) = executor.execute(&request).await {
                error!(
                    "用户 {} 执行器 {} 处理任务节点 {} 失败: {}",
                    owner_id, index, request.task_id, e
                );
            }
        }
        debug!("用户 {} 执行器 {} 退出", owner_id, index);
    }
}
