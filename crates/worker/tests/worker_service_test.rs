use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calc_core::{
    config::WorkerConfig,
    models::{CalculationRequest, Operation, RegisterWorkerRequest},
    traits::OrchestratorClient,
    SchedulerResult,
};
use calc_worker::WorkerService;

#[derive(Default)]
struct RecordingClient {
    results: Mutex<Vec<(i64, f64)>>,
}

#[async_trait]
impl OrchestratorClient for RecordingClient {
    async fn register(&self, _request: &RegisterWorkerRequest) -> SchedulerResult<()> {
        Ok(())
    }

    async fn task_started(&self, _task_id: i64) -> SchedulerResult<()> {
        Ok(())
    }

    async fn task_result(&self, task_id: i64, result: f64) -> SchedulerResult<()> {
        self.results.lock().unwrap().push((task_id, result));
        Ok(())
    }
}

#[tokio::test]
async fn test_every_operation_is_computed() {
    let client = Arc::new(RecordingClient::default());
    let service = WorkerService::builder(WorkerConfig {
        worker_id: "it-worker".to_string(),
        executors: 2,
        ..WorkerConfig::default()
    })
    .orchestrator_client(client.clone())
    .build()
    .unwrap();
    service.start().await.unwrap();

    let cases = [
        (Operation::Add, 7.0, 3.0, 10.0),
        (Operation::Subtract, 7.0, 3.0, 4.0),
        (Operation::Multiply, 7.0, 3.0, 21.0),
        (Operation::Divide, 7.0, 2.0, 3.5),
    ];
    for (index, (operation, first, second, _)) in cases.iter().enumerate() {
        service
            .calculate(CalculationRequest {
                task_id: index as i64,
                owner_id: index as i64 % 2,
                first: *first,
                second: *second,
                operation: *operation,
                duration_ms: 5,
            })
            .await
            .unwrap();
    }
    service.stop().await.unwrap();

    let mut results = client.results.lock().unwrap().clone();
    results.sort_by_key(|(id, _)| *id);
    let expected: Vec<(i64, f64)> = cases
        .iter()
        .enumerate()
        .map(|(index, case)| (index as i64, case.3))
        .collect();
    assert_eq!(results, expected);
}
