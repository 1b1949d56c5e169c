use async_trait::async_trait;
use calc_core::{
    models::{Operation, OperationDuration},
    traits::OperationRepository,
    SchedulerError, SchedulerResult,
};
use sqlx::{Row, SqlitePool};
use tracing::debug;

pub struct SqliteOperationRepository {
    pool: SqlitePool,
}

impl SqliteOperationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OperationRepository for SqliteOperationRepository {
    async fn get_duration(&self, operation: Operation) -> SchedulerResult<Option<i64>> {
        let row = sqlx::query("SELECT duration_ms FROM operations WHERE operation = $1")
            .bind(operation)
            .fetch_optional(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        match row {
            Some(row) => Ok(Some(row.try_get("duration_ms")?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> SchedulerResult<Vec<OperationDuration>> {
        let rows = sqlx::query("SELECT operation, duration_ms FROM operations")
            .fetch_all(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        let mut durations = rows
            .iter()
            .map(|row| {
                Ok(OperationDuration {
                    operation: row.try_get("operation")?,
                    duration_ms: row.try_get("duration_ms")?,
                })
            })
            .collect::<SchedulerResult<Vec<_>>>()?;

        durations.sort_by_key(|d| Operation::ALL.iter().position(|op| *op == d.operation));
        Ok(durations)
    }

    async fn upsert(&self, operation: Operation, duration_ms: i64) -> SchedulerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO operations (operation, duration_ms) VALUES ($1, $2)
            ON CONFLICT(operation) DO UPDATE SET duration_ms = excluded.duration_ms
            "#,
        )
        .bind(operation)
        .bind(duration_ms)
        .execute(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        debug!("运算 {} 耗时更新为 {}ms", operation, duration_ms);
        Ok(())
    }

    async fn count(&self) -> SchedulerResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM operations")
            .fetch_one(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        Ok(row.try_get("count")?)
    }
}
