use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use calc_api::{create_app, create_worker_app};
use calc_core::config::AppConfig;
use calc_dispatcher::{
    HttpWorkerClient, LivenessMonitor, LivenessMonitorConfig, OrchestratorController,
    TaskScheduler, WorkerRegistry,
};
use calc_domain::TaskTreeStore;
use calc_infrastructure::{init_metrics, DatabaseManager, MetricsCollector};
use calc_worker::WorkerService;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info};

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// 仅运行调度端（HTTP接口 + 存活检测）
    Orchestrator,
    /// 仅运行Worker
    Worker,
    /// 在同一进程内运行所有已启用的组件
    All,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    metrics: MetricsCollector,
}

impl Application {
    pub fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);

        if config.observability.metrics_enabled {
            init_metrics(&config.observability.metrics_bind_address)?;
        }

        Ok(Self {
            config,
            mode,
            metrics: MetricsCollector::new(),
        })
    }

    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        match self.mode {
            AppMode::Orchestrator => self.run_orchestrator(shutdown_rx).await,
            AppMode::Worker => self.run_worker(shutdown_rx).await,
            AppMode::All => self.run_all_components(shutdown_rx).await,
        }
    }

    /// 调度端：迁移、恢复、存活检测，然后对外提供HTTP接口
    async fn run_orchestrator(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let config = &self.config;
        info!("启动调度端: {}", config.api.bind_address);

        let db = DatabaseManager::new(&config.database).await?;
        db.migrate().await?;

        let worker_client = Arc::new(HttpWorkerClient::new(Duration::from_secs(
            config.dispatcher.worker_request_timeout_seconds,
        ))?);
        let scheduler = Arc::new(TaskScheduler::new(
            TaskTreeStore::new(db.task_tree_repository()),
            WorkerRegistry::new(db.worker_repository()),
            db.expression_repository(),
            db.operation_repository(),
            worker_client,
            self.metrics.clone(),
        ));
        let controller = Arc::new(OrchestratorController::new(
            Arc::clone(&scheduler),
            db.expression_repository(),
            db.operation_repository(),
            self.metrics.clone(),
        ));

        let seeded = controller
            .seed_operations(config.dispatcher.default_operation_duration_ms)
            .await?;
        if seeded > 0 {
            info!(
                "运算耗时表为空，已写入默认值 {}ms",
                config.dispatcher.default_operation_duration_ms
            );
        }

        let monitor = Arc::new(LivenessMonitor::new(
            Arc::clone(&scheduler),
            self.metrics.clone(),
            Some(LivenessMonitorConfig::from(&config.dispatcher)),
        ));
        monitor.recover_after_restart().await?;

        let monitor_handle = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move {
                if let Err(e) = monitor.start().await {
                    error!("Worker存活检测异常退出: {}", e);
                }
            })
        };

        let listener = TcpListener::bind(&config.api.bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {}", config.api.bind_address))?;
        info!("调度端API启动在 http://{}", config.api.bind_address);

        let app = create_app(controller, &config.api);
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("调度端收到关闭信号");
            })
            .await;

        monitor.stop().await;
        let _ = monitor_handle.await;
        db.close().await;

        served.context("调度端API运行失败")?;
        info!("调度端已停止");
        Ok(())
    }

    async fn run_worker(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let config = &self.config.worker;
        info!("启动Worker服务: {}", config.worker_id);

        let service = Arc::new(
            WorkerService::builder(config.clone())
                .metrics(self.metrics.clone())
                .build()?,
        );
        service.start().await?;

        let listener = TcpListener::bind(&config.bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {}", config.bind_address))?;
        info!("Worker API启动在 http://{}", config.bind_address);

        let app = create_worker_app(Arc::clone(&service));
        let mut service_stopped = service.subscribe_shutdown();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_rx.recv() => info!("Worker收到关闭信号"),
                    _ = service_stopped.recv() => error!("Worker执行器遇到致命错误，停止服务"),
                }
            })
            .await;

        service.stop().await?;
        served.context("Worker API运行失败")?;
        if service.has_failed() {
            anyhow::bail!("Worker {} 无法通知调度端任务开始，已停止", config.worker_id);
        }
        info!("Worker服务已停止");
        Ok(())
    }

    async fn run_all_components(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动所有已启用的组件");

        let orchestrator = async {
            if self.config.dispatcher.enabled {
                self.run_orchestrator(shutdown_rx.resubscribe()).await
            } else {
                Ok(())
            }
        };
        let worker = async {
            if self.config.worker.enabled {
                self.run_worker(shutdown_rx.resubscribe()).await
            } else {
                Ok(())
            }
        };

        let (orchestrator, worker) = tokio::join!(orchestrator, worker);
        if let Err(e) = &orchestrator {
            error!("调度端运行失败: {e:#}");
        }
        if let Err(e) = &worker {
            error!("Worker运行失败: {e:#}");
        }

        info!("所有组件已停止");
        orchestrator.and(worker)
    }
}
