//! Worker注册表
//!
//! 注册即心跳：每次注册刷新最后心跳时间。空闲槽位按Enqueued与Calculating节点数计算。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use calc_core::{
    models::{FreeWorker, Worker, WorkerRegistration},
    traits::WorkerRepository,
    SchedulerError, SchedulerResult,
};

#[derive(Clone)]
pub struct WorkerRegistry {
    repository: Arc<dyn WorkerRepository>,
}

impl WorkerRegistry {
    pub fn new(repository: Arc<dyn WorkerRepository>) -> Self {
        Self { repository }
    }

    /// 注册或刷新心跳，返回该Worker此前是否已存在
    pub async fn register(&self, registration: &WorkerRegistration) -> SchedulerResult<bool> {
        if registration.id.trim().is_empty() {
            return Err(SchedulerError::InvalidRequest("Worker ID不能为空".to_string()));
        }
        if registration.executors <= 0 {
            return Err(SchedulerError::InvalidRequest(format!(
                "Worker {} 的执行器数量必须大于0",
                registration.id
            )));
        }

        let already_existed = self.repository.upsert(registration).await?;
        debug!(
            "Worker {} 心跳: {}",
            registration.id,
            if already_existed { "刷新" } else { "首次注册" }
        );
        Ok(already_existed)
    }

    /// 空闲槽位最多的Worker，并列时取id最小者
    pub async fn free_worker(&self) -> SchedulerResult<Option<FreeWorker>> {
        self.repository.find_free().await
    }

    /// 删除心跳早于截止时间的Worker，返回被删除的id
    pub async fn expire_older_than(&self, deadline: DateTime<Utc>) -> SchedulerResult<Vec<String>> {
        self.repository.delete_older_than(deadline).await
    }

    pub async fn list(&self) -> SchedulerResult<Vec<Worker>> {
        self.repository.list().await
    }

    pub async fn get(&self, id: &str) -> SchedulerResult<Worker> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| SchedulerError::WorkerNotFound { id: id.to_string() })
    }
}
