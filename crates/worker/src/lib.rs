//! 计算节点
//!
//! 按用户懒加载的执行器池接收单步计算，执行前后回调调度端；后台定期注册作为心跳。

pub mod calculation;
pub mod components;
pub mod executor_pool;
pub mod pool_manager;
pub mod service;

#[cfg(test)]
mod test_utils;

pub use calculation::CalculationExecutor;
pub use components::{HeartbeatManager, HttpOrchestratorClient};
pub use executor_pool::ExecutorsPool;
pub use pool_manager::PoolManager;
pub use service::{WorkerService, WorkerServiceBuilder};
