pub mod repository;
pub mod rpc_client;

pub use repository::{
    ExpressionRepository, OperationRepository, TaskTreeRepository, WorkerRepository,
};
pub use rpc_client::{OrchestratorClient, WorkerClient};
