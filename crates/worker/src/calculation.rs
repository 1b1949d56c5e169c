use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error};

use calc_core::{models::CalculationRequest, traits::OrchestratorClient, SchedulerResult};
use calc_infrastructure::MetricsCollector;

/// 执行单步计算：回调开始、计算、按配置耗时等待、回报结果
///
/// 开始通知失败是致命错误：放弃该请求并发出停止信号，心跳随之停止，
/// 调度端的存活检测会回收分配给本Worker的节点。
pub struct CalculationExecutor {
    client: Arc<dyn OrchestratorClient>,
    metrics: MetricsCollector,
    fatal_signal: Option<broadcast::Sender<()>>,
    failed: AtomicBool,
}

impl CalculationExecutor {
    pub fn new(client: Arc<dyn OrchestratorClient>, metrics: MetricsCollector) -> Self {
        Self {
            client,
            metrics,
            fatal_signal: None,
            failed: AtomicBool::new(false),
        }
    }

    pub fn with_fatal_signal(mut self, signal: broadcast::Sender<()>) -> Self {
        self.fatal_signal = Some(signal);
        self
    }

    /// 是否发生过致命错误
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    pub async fn execute(&self, request: &CalculationRequest) -> SchedulerResult<f64> {
        if let Err(e) = self.client.task_started(request.task_id).await {
            error!("任务节点 {} 开始通知失败，Worker停止服务: {}", request.task_id, e);
            self.failed.store(true, Ordering::SeqCst);
            if let Some(signal) = &self.fatal_signal {
                let _ = signal.send(());
            }
            return Err(e);
        }

        let value = request.operation.apply(request.first, request.second);
        debug!(
            "任务节点 {}: {} {} {} = {}",
            request.task_id, request.first, request.operation, request.second, value
        );

        let duration_ms = u64::try_from(request.duration_ms).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;

        self.client.task_result(request.task_id, value).await?;
        self.metrics.record_worker_execution();
        Ok(value)
    }
}
