use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use calc_core::{
    models::CalculationRequest, traits::WorkerClient, SchedulerError, SchedulerResult,
};

/// 通过HTTP调用Worker的 `/api/calculate`
pub struct HttpWorkerClient {
    http_client: reqwest::Client,
}

impl HttpWorkerClient {
    pub fn new(request_timeout: Duration) -> SchedulerResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SchedulerError::Configuration(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn calculate(&self, worker_url: &str, request: &CalculationRequest) -> SchedulerResult<()> {
        let url = format!("{}/api/calculate", worker_url.trim_end_matches('/'));

        match self.http_client.post(&url).json(request).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("任务节点 {} 已提交到 {}", request.task_id, worker_url);
                Ok(())
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!("Worker {} 拒绝任务节点 {}: HTTP {}", worker_url, request.task_id, status);
                Err(SchedulerError::WorkerRpc(format!(
                    "{worker_url} 返回 HTTP {status} - {body}"
                )))
            }
            Err(e) => Err(SchedulerError::WorkerRpc(format!(
                "无法连接Worker {worker_url}: {e}"
            ))),
        }
    }
}
