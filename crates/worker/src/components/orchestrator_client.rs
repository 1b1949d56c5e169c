use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, warn};

use calc_core::{
    models::{RegisterWorkerRequest, TaskResultRequest},
    traits::OrchestratorClient,
    SchedulerError, SchedulerResult,
};

/// 回调调度端的HTTP客户端
pub struct HttpOrchestratorClient {
    orchestrator_url: String,
    http_client: reqwest::Client,
}

impl HttpOrchestratorClient {
    pub fn new(orchestrator_url: &str, request_timeout: Duration) -> SchedulerResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SchedulerError::Configuration(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            orchestrator_url: orchestrator_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> SchedulerResult<()> {
        let url = format!("{}{}", self.orchestrator_url, path);

        match self.http_client.post(&url).json(body).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!("调度端拒绝请求 {}: HTTP {}", path, status);
                Err(SchedulerError::OrchestratorRpc(format!(
                    "{path} 返回 HTTP {status} - {body}"
                )))
            }
            Err(e) => {
                error!("无法连接调度端 {}: {}", self.orchestrator_url, e);
                Err(SchedulerError::OrchestratorRpc(format!(
                    "调度端连接错误: {e}"
                )))
            }
        }
    }
}

#[async_trait]
impl OrchestratorClient for HttpOrchestratorClient {
    async fn register(&self, request: &RegisterWorkerRequest) -> SchedulerResult<()> {
        self.post("/api/workers", request).await?;
        debug!("Worker {} 心跳已发送", request.id);
        Ok(())
    }

    async fn task_started(&self, task_id: i64) -> SchedulerResult<()> {
        self.post(&format!("/api/tasks/{task_id}/start"), &serde_json::json!({}))
            .await
    }

    async fn task_result(&self, task_id: i64, result: f64) -> SchedulerResult<()> {
        self.post(
            &format!("/api/tasks/{task_id}/result"),
            &TaskResultRequest { result },
        )
        .await
    }
}
