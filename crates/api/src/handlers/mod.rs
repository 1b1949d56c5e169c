pub mod calculate;
pub mod expressions;
pub mod health;
pub mod operations;
pub mod tasks;
pub mod workers;
