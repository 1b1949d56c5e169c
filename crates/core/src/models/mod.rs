pub mod expression;
pub mod operation;
pub mod rpc;
pub mod task_node;
pub mod worker;

pub use expression::{Expression, ExpressionStatus, NewExpression};
pub use operation::{Operation, OperationDuration};
pub use rpc::{
    CalculationRequest, RegisterWorkerRequest, SubmitExpressionRequest,
    SubmitExpressionResponse, TaskResultRequest,
};
pub use task_node::{NewTaskNode, NodeKind, NodePosition, TaskNode, TaskStatus};
pub use worker::{FreeWorker, Worker, WorkerRegistration};
