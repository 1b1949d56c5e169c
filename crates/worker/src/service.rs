use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use calc_core::{
    config::WorkerConfig,
    models::{CalculationRequest, RegisterWorkerRequest},
    traits::OrchestratorClient,
    SchedulerError, SchedulerResult,
};
use calc_infrastructure::MetricsCollector;

use crate::calculation::CalculationExecutor;
use crate::components::{HeartbeatManager, HttpOrchestratorClient};
use crate::pool_manager::PoolManager;

/// 计算节点服务：执行器池加心跳
pub struct WorkerService {
    worker_id: String,
    hostname: String,
    pool_manager: Arc<PoolManager>,
    executor: Arc<CalculationExecutor>,
    heartbeat_manager: HeartbeatManager,
    shutdown_tx: broadcast::Sender<()>,
    heartbeat_handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerService {
    pub fn builder(config: WorkerConfig) -> WorkerServiceBuilder {
        WorkerServiceBuilder::new(config)
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn registration(&self) -> &RegisterWorkerRequest {
        self.heartbeat_manager.registration()
    }

    /// 停止信号：外部调用 `stop` 或执行器遇到致命错误时触发
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// 是否因调度端不可达而停止服务
    pub fn has_failed(&self) -> bool {
        self.executor.has_failed()
    }

    /// 启动心跳；计算请求由HTTP层调用 `calculate` 送入
    pub async fn start(&self) -> SchedulerResult<()> {
        let mut handle = self.heartbeat_handle.lock().await;
        if handle.is_some() {
            warn!("Worker {} 已在运行", self.worker_id);
            return Ok(());
        }

        let registration = self.heartbeat_manager.registration();
        info!(
            "启动Worker {} ({}), 回调地址: {}, 每用户执行器: {}",
            self.worker_id, self.hostname, registration.url, registration.executors
        );
        // 首次注册失败不阻止启动，后续心跳会继续重试
        if let Err(e) = self.heartbeat_manager.register_now().await {
            warn!("Worker {} 首次注册失败: {}", self.worker_id, e);
        }

        *handle = Some(
            self.heartbeat_manager
                .start_heartbeat_task(self.shutdown_tx.subscribe()),
        );
        Ok(())
    }

    /// 把计算请求送入对应用户的执行器池
    pub async fn calculate(&self, request: CalculationRequest) -> SchedulerResult<()> {
        self.pool_manager.submit(request).await
    }

    /// 停止心跳并排空所有执行器池
    pub async fn stop(&self) -> SchedulerResult<()> {
        info!("停止Worker {}", self.worker_id);
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.heartbeat_handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("心跳任务异常退出: {}", e);
            }
        }

        self.pool_manager.shutdown().await;
        info!("Worker {} 已停止", self.worker_id);
        Ok(())
    }
}

pub struct WorkerServiceBuilder {
    config: WorkerConfig,
    client: Option<Arc<dyn OrchestratorClient>>,
    metrics: Option<MetricsCollector>,
}

impl WorkerServiceBuilder {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            client: None,
            metrics: None,
        }
    }

    /// 默认使用指向 `orchestrator_url` 的HTTP客户端
    pub fn orchestrator_client(mut self, client: Arc<dyn OrchestratorClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> SchedulerResult<WorkerService> {
        self.config
            .validate()
            .map_err(|e| SchedulerError::Configuration(e.to_string()))?;

        let client = match self.client {
            Some(client) => client,
            None => Arc::new(HttpOrchestratorClient::new(
                &self.config.orchestrator_url,
                Duration::from_secs(self.config.orchestrator_request_timeout_seconds),
            )?),
        };
        let metrics = self.metrics.unwrap_or_default();

        let executors = i32::try_from(self.config.executors).map_err(|_| {
            SchedulerError::Configuration(format!("执行器数量过大: {}", self.config.executors))
        })?;
        let registration = RegisterWorkerRequest {
            id: self.config.worker_id.clone(),
            url: self.config.public_url.clone(),
            executors,
        };

        let (shutdown_tx, _) = broadcast::channel(1);
        let executor = Arc::new(
            CalculationExecutor::new(client.clone(), metrics.clone())
                .with_fatal_signal(shutdown_tx.clone()),
        );
        let pool_manager = Arc::new(PoolManager::new(
            self.config.executors,
            Arc::clone(&executor),
            metrics,
        ));
        let heartbeat_manager = HeartbeatManager::new(
            registration,
            client,
            Duration::from_millis(self.config.ping_period_ms),
        );

        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Ok(WorkerService {
            worker_id: self.config.worker_id,
            hostname,
            pool_manager,
            executor,
            heartbeat_manager,
            shutdown_tx,
            heartbeat_handle: Mutex::new(None),
        })
    }
}
