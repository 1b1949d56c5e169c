use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 已注册的计算节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub url: String,
    pub executors: i32,
    pub last_heartbeat: DateTime<Utc>,
}

impl Worker {
    /// 检查心跳是否早于截止时间
    pub fn is_expired(&self, deadline: DateTime<Utc>) -> bool {
        self.last_heartbeat < deadline
    }
}

/// 有空闲执行槽位的Worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeWorker {
    pub id: String,
    pub url: String,
    pub free_slots: i64,
}

/// Worker注册信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRegistration {
    pub id: String,
    pub url: String,
    pub executors: i32,
}
