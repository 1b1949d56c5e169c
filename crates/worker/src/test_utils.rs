use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use calc_core::{
    models::{CalculationRequest, Operation, RegisterWorkerRequest},
    traits::OrchestratorClient,
    SchedulerError, SchedulerResult,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    Started(i64),
    Result(i64, f64),
}

/// 记录回调的调度端客户端
///
/// 打开闸门后 `task_started` 需要先拿到许可才返回，用于把执行器卡在执行中。
#[derive(Default)]
pub struct MockOrchestratorClient {
    registrations: Mutex<Vec<RegisterWorkerRequest>>,
    callbacks: Mutex<Vec<Callback>>,
    failing: AtomicBool,
    start_failing: AtomicBool,
    gate: Option<Semaphore>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockOrchestratorClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn open_gate(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 只让 `task_started` 失败
    pub fn set_start_failing(&self, failing: bool) {
        self.start_failing.store(failing, Ordering::SeqCst);
    }

    pub fn registrations(&self) -> Vec<RegisterWorkerRequest> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn callbacks(&self) -> Vec<Callback> {
        self.callbacks.lock().unwrap().clone()
    }

    pub fn results(&self) -> Vec<(i64, f64)> {
        self.callbacks()
            .into_iter()
            .filter_map(|c| match c {
                Callback::Result(id, value) => Some((id, value)),
                Callback::Started(_) => None,
            })
            .collect()
    }

    /// 同时处于开始与结果之间的最大执行数
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> SchedulerResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SchedulerError::OrchestratorRpc("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrchestratorClient for MockOrchestratorClient {
    async fn register(&self, request: &RegisterWorkerRequest) -> SchedulerResult<()> {
        self.check_failing()?;
        self.registrations.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn task_started(&self, task_id: i64) -> SchedulerResult<()> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.check_failing()?;
        if self.start_failing.load(Ordering::SeqCst) {
            self.active.fetch_sub(1, Ordering::SeqCst);
            return Err(SchedulerError::OrchestratorRpc("down".to_string()));
        }
        self.callbacks.lock().unwrap().push(Callback::Started(task_id));
        Ok(())
    }

    async fn task_result(&self, task_id: i64, result: f64) -> SchedulerResult<()> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.check_failing()?;
        self.callbacks
            .lock()
            .unwrap()
            .push(Callback::Result(task_id, result));
        Ok(())
    }
}

/// `task_id * 2`
pub fn request(task_id: i64, owner_id: i64, duration_ms: i64) -> CalculationRequest {
    CalculationRequest {
        task_id,
        owner_id,
        first: task_id as f64,
        second: 2.0,
        operation: Operation::Multiply,
        duration_ms,
    }
}
