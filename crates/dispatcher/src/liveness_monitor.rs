use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, RwLock};
use tracing::{debug, error, info, warn};

use calc_core::{config::DispatcherConfig, SchedulerResult};
use calc_infrastructure::{MetricsCollector, StructuredLogger};

use crate::scheduler::TaskScheduler;

/// Worker存活检测配置
#[derive(Debug, Clone)]
pub struct LivenessMonitorConfig {
    /// 检测周期，同时也是心跳超时时间
    pub monitoring_period: Duration,
}

impl Default for LivenessMonitorConfig {
    fn default() -> Self {
        Self {
            monitoring_period: Duration::from_secs(5),
        }
    }
}

impl From<&DispatcherConfig> for LivenessMonitorConfig {
    fn from(config: &DispatcherConfig) -> Self {
        Self {
            monitoring_period: Duration::from_millis(config.monitoring_period_ms),
        }
    }
}

/// Worker存活检测
///
/// 周期性删除心跳早于 `now - period` 的Worker，并把它们名下未完成的节点退回Created。
pub struct LivenessMonitor {
    scheduler: Arc<TaskScheduler>,
    metrics: MetricsCollector,
    config: LivenessMonitorConfig,
    running: Arc<RwLock<bool>>,
    shutdown: Arc<Notify>,
}

impl LivenessMonitor {
    pub fn new(
        scheduler: Arc<TaskScheduler>,
        metrics: MetricsCollector,
        config: Option<LivenessMonitorConfig>,
    ) -> Self {
        Self {
            scheduler,
            metrics,
            config: config.unwrap_or_default(),
            running: Arc::new(RwLock::new(false)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// 重启后所有旧的分配都已失效：释放全部节点并清空注册表
    pub async fn recover_after_restart(&self) -> SchedulerResult<()> {
        let released = self.scheduler.store().release_all_workers().await?;
        let expired = self.scheduler.registry().expire_older_than(Utc::now()).await?;

        info!(
            "启动恢复完成: 释放 {} 个任务节点，清理 {} 个Worker",
            released,
            expired.len()
        );
        Ok(())
    }

    /// 执行一次检测，返回被判定失效的Worker
    pub async fn sweep(&self, now: DateTime<Utc>) -> SchedulerResult<Vec<String>> {
        let period = chrono::Duration::from_std(self.config.monitoring_period)
            .unwrap_or_else(|_| chrono::Duration::seconds(5));
        let deadline = now - period;

        let expired = self.scheduler.registry().expire_older_than(deadline).await?;
        if expired.is_empty() {
            return Ok(expired);
        }

        let mut released_total = 0;
        for worker_id in &expired {
            let released = self.scheduler.store().release_worker(worker_id).await?;
            StructuredLogger::log_worker_expired(worker_id, released);
            released_total += released;
        }
        self.metrics.record_workers_expired(expired.len());

        if released_total > 0 {
            // 退回的节点交给下一次扫描，这里主动触发一次
            if let Err(e) = self.scheduler.dispatch_all_ready().await {
                warn!("重新调度退回的任务节点失败: {}", e);
            }
        }

        Ok(expired)
    }

    /// 运行检测循环直到 `stop` 被调用
    pub async fn start(&self) -> SchedulerResult<()> {
        info!(
            "启动Worker存活检测，周期: {:?}",
            self.config.monitoring_period
        );
        *self.running.write().await = true;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.monitoring_period) => {}
                _ = self.shutdown.notified() => {}
            }

            if !*self.running.read().await {
                info!("收到停止信号，退出Worker存活检测循环");
                break;
            }

            match self.sweep(Utc::now()).await {
                Ok(expired) if !expired.is_empty() => {
                    info!("检测到 {} 个失效Worker", expired.len());
                }
                Ok(_) => debug!("没有失效Worker"),
                Err(e) => error!("Worker存活检测时出错: {}", e),
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("停止Worker存活检测");
        *self.running.write().await = false;
        self.shutdown.notify_one();
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
