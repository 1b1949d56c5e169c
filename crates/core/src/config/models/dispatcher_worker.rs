use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub enabled: bool,
    /// Worker存活检测周期，同时作为心跳过期阈值
    pub monitoring_period_ms: u64,
    /// 运算耗时表为空时的初始值
    pub default_operation_duration_ms: i64,
    pub worker_request_timeout_seconds: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            monitoring_period_ms: 5000,
            default_operation_duration_ms: 500,
            worker_request_timeout_seconds: 5,
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.monitoring_period_ms == 0 {
            return Err(anyhow::anyhow!("检测周期必须大于0"));
        }

        if self.default_operation_duration_ms < 0 {
            return Err(anyhow::anyhow!("运算耗时不能为负数"));
        }

        if self.worker_request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Worker请求超时时间必须大于0"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub worker_id: String,
    pub bind_address: String,
    /// 注册到调度端的回调地址
    pub public_url: String,
    pub orchestrator_url: String,
    /// 每个用户的执行器数量
    pub executors: usize,
    pub ping_period_ms: u64,
    pub orchestrator_request_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            worker_id: "worker-001".to_string(),
            bind_address: "0.0.0.0:8081".to_string(),
            public_url: "http://127.0.0.1:8081".to_string(),
            orchestrator_url: "http://127.0.0.1:8080".to_string(),
            executors: 4,
            ping_period_ms: 2000,
            orchestrator_request_timeout_seconds: 5,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_id.is_empty() {
            return Err(anyhow::anyhow!("Worker ID不能为空"));
        }

        if !self.bind_address.contains(':') {
            return Err(anyhow::anyhow!("绑定地址格式无效，应为 host:port"));
        }

        for url in [&self.public_url, &self.orchestrator_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!("URL格式无效: {}", url));
            }
        }

        if self.executors == 0 {
            return Err(anyhow::anyhow!("执行器数量必须大于0"));
        }

        if self.ping_period_ms == 0 {
            return Err(anyhow::anyhow!("心跳间隔必须大于0"));
        }

        if self.orchestrator_request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("调度端请求超时时间必须大于0"));
        }

        Ok(())
    }
}
