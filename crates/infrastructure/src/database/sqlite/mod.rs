pub mod sqlite_expression_repository;
pub mod sqlite_operation_repository;
pub mod sqlite_task_tree_repository;
pub mod sqlite_worker_repository;

pub use sqlite_expression_repository::SqliteExpressionRepository;
pub use sqlite_operation_repository::SqliteOperationRepository;
pub use sqlite_task_tree_repository::SqliteTaskTreeRepository;
pub use sqlite_worker_repository::SqliteWorkerRepository;
