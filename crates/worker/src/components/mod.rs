pub mod heartbeat_manager;
pub mod orchestrator_client;

pub use heartbeat_manager::HeartbeatManager;
pub use orchestrator_client::HttpOrchestratorClient;
