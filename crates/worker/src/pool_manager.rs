use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::info;

use calc_core::{models::CalculationRequest, SchedulerResult};
use calc_infrastructure::MetricsCollector;

use crate::calculation::CalculationExecutor;
use crate::executor_pool::ExecutorsPool;

/// 按用户懒加载执行器池
///
/// 只在查找或创建池时持有锁，入队等待发生在锁外，一个用户的队列满不会阻塞其他用户。
pub struct PoolManager {
    executors_per_owner: usize,
    executor: Arc<CalculationExecutor>,
    metrics: MetricsCollector,
    pools: Mutex<HashMap<i64, Arc<ExecutorsPool>>>,
}

impl PoolManager {
    pub fn new(
        executors_per_owner: usize,
        executor: Arc<CalculationExecutor>,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            executors_per_owner,
            executor,
            metrics,
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub async fn submit(&self, request: CalculationRequest) -> SchedulerResult<()> {
        let pool = self.pool_for(request.owner_id).await;
        pool.submit(request).await
    }

    pub async fn pool_count(&self) -> usize {
        self.pools.lock().await.len()
    }

    /// 关闭所有池并等待执行中的请求完成
    pub async fn shutdown(&self) {
        let pools: Vec<Arc<ExecutorsPool>> = self.pools.lock().await.drain().map(|(_, p)| p).collect();
        let count = pools.len();

        join_all(pools.iter().map(|pool| pool.shutdown())).await;
        info!("已关闭 {} 个执行器池", count);
    }

    async fn pool_for(&self, owner_id: i64) -> Arc<ExecutorsPool> {
        let mut pools = self.pools.lock().await;
        Arc::clone(pools.entry(owner_id).or_insert_with(|| {
            Arc::new(ExecutorsPool::new(
                owner_id,
                self.executors_per_owner,
                Arc::clone(&self.executor),
                self.metrics.clone(),
            ))
        }))
    }
}
