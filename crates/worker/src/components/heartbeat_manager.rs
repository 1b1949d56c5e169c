use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{info, warn};

use calc_core::{models::RegisterWorkerRequest, traits::OrchestratorClient, SchedulerResult};

/// 定期向调度端重新注册，注册本身就是心跳
pub struct HeartbeatManager {
    registration: RegisterWorkerRequest,
    client: Arc<dyn OrchestratorClient>,
    ping_period: Duration,
}

impl HeartbeatManager {
    pub fn new(
        registration: RegisterWorkerRequest,
        client: Arc<dyn OrchestratorClient>,
        ping_period: Duration,
    ) -> Self {
        Self {
            registration,
            client,
            ping_period,
        }
    }

    pub fn registration(&self) -> &RegisterWorkerRequest {
        &self.registration
    }

    pub async fn register_now(&self) -> SchedulerResult<()> {
        self.client.register(&self.registration).await
    }

    /// 启动心跳任务，第一次发送在一个周期之后
    pub fn start_heartbeat_task(&self, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let mut heartbeat_interval =
            interval_at(Instant::now() + self.ping_period, self.ping_period);
        let client = Arc::clone(&self.client);
        let registration = self.registration.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = heartbeat_interval.tick() => {
                        // 调度端短暂不可用时继续重试，超过存活周期会被判定失效
                        if let Err(e) = client.register(&registration).await {
                            warn!("Worker {} 心跳失败: {}", registration.id, e);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Worker {} 心跳任务退出", registration.id);
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockOrchestratorClient;

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_registers_periodically() {
        let client = Arc::new(MockOrchestratorClient::new());
        let manager = HeartbeatManager::new(
            RegisterWorkerRequest {
                id: "w1".to_string(),
                url: "http://w1:8081".to_string(),
                executors: 2,
            },
            client.clone(),
            Duration::from_millis(100),
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = manager.start_heartbeat_task(shutdown_rx);

        tokio::time::sleep(Duration::from_millis(250)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        // 100ms、200ms
        assert_eq!(client.registrations().len(), 2);
        assert_eq!(client.registrations()[0].executors, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_survives_failures() {
        let client = Arc::new(MockOrchestratorClient::new());
        client.set_failing(true);
        let manager = HeartbeatManager::new(
            RegisterWorkerRequest {
                id: "w1".to_string(),
                url: "http://w1:8081".to_string(),
                executors: 1,
            },
            client.clone(),
            Duration::from_millis(100),
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        assert!(manager.register_now().await.is_err());
        let handle = manager.start_heartbeat_task(shutdown_rx);
        tokio::time::sleep(Duration::from_millis(150)).await;

        client.set_failing(false);
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(client.registrations().len(), 1);
    }
}
