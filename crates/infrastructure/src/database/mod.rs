pub mod schema;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use calc_core::config::models::DatabaseConfig;
use calc_core::traits::{
    ExpressionRepository, OperationRepository, TaskTreeRepository, WorkerRepository,
};
use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::info;

pub use sqlite::{
    SqliteExpressionRepository, SqliteOperationRepository, SqliteTaskTreeRepository,
    SqliteWorkerRepository,
};

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect(&config.url)
            .await
            .with_context(|| format!("连接数据库失败: {}", config.url))?;

        Ok(Self { pool })
    }

    /// 单连接内存库，所有查询落在同一个数据库上
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("创建内存数据库失败")?;

        let manager = Self { pool };
        manager.migrate().await?;
        Ok(manager)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("执行数据库迁移失败")?;
        }
        info!("数据库表结构已就绪");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn expression_repository(&self) -> Arc<dyn ExpressionRepository> {
        Arc::new(SqliteExpressionRepository::new(self.pool.clone()))
    }

    pub fn task_tree_repository(&self) -> Arc<dyn TaskTreeRepository> {
        Arc::new(SqliteTaskTreeRepository::new(self.pool.clone()))
    }

    pub fn worker_repository(&self) -> Arc<dyn WorkerRepository> {
        Arc::new(SqliteWorkerRepository::new(self.pool.clone()))
    }

    pub fn operation_repository(&self) -> Arc<dyn OperationRepository> {
        Arc::new(SqliteOperationRepository::new(self.pool.clone()))
    }
}

pub type DbPool = Pool<Sqlite>;
