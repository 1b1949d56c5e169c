pub mod mocks {
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use calc_core::{models::CalculationRequest, traits::WorkerClient, SchedulerError, SchedulerResult};

    /// 记录派发请求的Worker客户端，不做真实计算
    #[derive(Default)]
    pub struct MockWorkerClient {
        pending: Mutex<VecDeque<(String, CalculationRequest)>>,
        failing: AtomicBool,
        failing_tasks: Mutex<HashSet<i64>>,
    }

    impl MockWorkerClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// 只让指定任务节点的派发失败
        pub fn fail_task(&self, task_id: i64) {
            self.failing_tasks.lock().unwrap().insert(task_id);
        }

        /// 尚未取走的派发请求，按派发顺序
        pub fn requests(&self) -> Vec<(String, CalculationRequest)> {
            self.pending.lock().unwrap().iter().cloned().collect()
        }

        pub fn take_requests(&self) -> Vec<(String, CalculationRequest)> {
            self.pending.lock().unwrap().drain(..).collect()
        }

        pub fn next_request(&self) -> Option<CalculationRequest> {
            self.pending.lock().unwrap().pop_front().map(|(_, request)| request)
        }
    }

    #[async_trait]
    impl WorkerClient for MockWorkerClient {
        async fn calculate(
            &self,
            worker_url: &str,
            request: &CalculationRequest,
        ) -> SchedulerResult<()> {
            if self.failing.load(Ordering::SeqCst)
                || self.failing_tasks.lock().unwrap().contains(&request.task_id)
            {
                return Err(SchedulerError::WorkerRpc(format!(
                    "{worker_url}: connection refused"
                )));
            }
            self.pending
                .lock()
                .unwrap()
                .push_back((worker_url.to_string(), request.clone()));
            Ok(())
        }
    }
}

pub use mocks::MockWorkerClient;

mod harness {
    use std::sync::Arc;

    use calc_core::models::{
        CalculationRequest, Expression, Operation, TaskNode, WorkerRegistration,
    };
    use calc_domain::TaskTreeStore;
    use calc_infrastructure::{DatabaseManager, MetricsCollector};

    use super::MockWorkerClient;
    use crate::controller::OrchestratorController;
    use crate::scheduler::TaskScheduler;
    use crate::worker_registry::WorkerRegistry;

    /// 内存SQLite加上模拟Worker客户端组装出的完整调度端
    pub struct TestHarness {
        pub db: DatabaseManager,
        pub client: Arc<MockWorkerClient>,
        pub controller: OrchestratorController,
    }

    impl TestHarness {
        /// 所有运算耗时10ms
        pub async fn new() -> Self {
            Self::with_operations(&Operation::ALL.map(|op| (op, 10))).await
        }

        pub async fn with_operations(durations: &[(Operation, i64)]) -> Self {
            let db = DatabaseManager::in_memory().await.unwrap();
            let operations = db.operation_repository();
            for (operation, duration_ms) in durations {
                operations.upsert(*operation, *duration_ms).await.unwrap();
            }

            let client = Arc::new(MockWorkerClient::new());
            let metrics = MetricsCollector::new();
            let scheduler = Arc::new(TaskScheduler::new(
                TaskTreeStore::new(db.task_tree_repository()),
                WorkerRegistry::new(db.worker_repository()),
                db.expression_repository(),
                operations.clone(),
                client.clone(),
                metrics.clone(),
            ));
            let controller = OrchestratorController::new(
                scheduler,
                db.expression_repository(),
                operations,
                metrics,
            );

            Self {
                db,
                client,
                controller,
            }
        }

        pub fn scheduler(&self) -> &TaskScheduler {
            self.controller.scheduler()
        }

        pub async fn register_worker(&self, id: &str, executors: i32) {
            self.controller
                .register_worker(WorkerRegistration {
                    id: id.to_string(),
                    url: format!("http://{id}:8081"),
                    executors,
                })
                .await
                .unwrap();
        }

        /// 以用户1提交
        pub async fn submit(&self, text: &str) -> i64 {
            self.controller.submit_expression(1, text, None).await.unwrap()
        }

        pub async fn nodes(&self, expression_id: i64) -> Vec<TaskNode> {
            self.scheduler()
                .store()
                .nodes_of_expression(expression_id)
                .await
                .unwrap()
        }

        pub async fn expression(&self, id: i64) -> Expression {
            self.controller.get_expression(1, id).await.unwrap()
        }

        /// 模拟Worker执行：先回调开始，再回报结果
        pub async fn complete(&self, request: &CalculationRequest) {
            self.controller.start_task(request.task_id).await.unwrap();
            let value = request.operation.apply(request.first, request.second);
            self.controller
                .task_result(request.task_id, value)
                .await
                .unwrap();
        }
    }
}

pub use harness::TestHarness;
