use async_trait::async_trait;
use calc_core::{
    models::{Expression, ExpressionStatus, NewExpression},
    traits::ExpressionRepository,
    SchedulerError, SchedulerResult,
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

pub struct SqliteExpressionRepository {
    pool: SqlitePool,
}

impl SqliteExpressionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_expression(row: &sqlx::sqlite::SqliteRow) -> SchedulerResult<Expression> {
        Ok(Expression {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            expression: row.try_get("expression")?,
            idempotency_key: row.try_get("idempotency_key")?,
            status: row.try_get("status")?,
            result: row.try_get("result")?,
            created_at: row.try_get("created_at")?,
            finished_at: row.try_get("finished_at")?,
        })
    }
}

#[async_trait]
impl ExpressionRepository for SqliteExpressionRepository {
    async fn create(&self, expression: &NewExpression) -> SchedulerResult<Expression> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO expressions (owner_id, expression, idempotency_key, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(expression.owner_id)
        .bind(&expression.expression)
        .bind(&expression.idempotency_key)
        .bind(ExpressionStatus::Created)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        let id = result.last_insert_rowid();
        debug!("创建表达式成功: {} ({})", id, expression.expression);

        Ok(Expression {
            id,
            owner_id: expression.owner_id,
            expression: expression.expression.clone(),
            idempotency_key: expression.idempotency_key.clone(),
            status: ExpressionStatus::Created,
            result: None,
            created_at,
            finished_at: None,
        })
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Expression>> {
        let row = sqlx::query("SELECT * FROM expressions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        row.as_ref().map(Self::row_to_expression).transpose()
    }

    async fn find_by_idempotency_key(
        &self,
        owner_id: i64,
        idempotency_key: &str,
        expression: &str,
    ) -> SchedulerResult<Option<Expression>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM expressions
            WHERE owner_id = $1 AND idempotency_key = $2 AND expression = $3
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .bind(idempotency_key)
        .bind(expression)
        .fetch_optional(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        row.as_ref().map(Self::row_to_expression).transpose()
    }

    async fn list_by_owner(&self, owner_id: i64) -> SchedulerResult<Vec<Expression>> {
        let rows = sqlx::query(
            "SELECT * FROM expressions WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        rows.iter().map(Self::row_to_expression).collect()
    }

    async fn update_status(&self, id: i64, status: ExpressionStatus) -> SchedulerResult<bool> {
        let finished_at = status.is_terminal().then(Utc::now);
        let result = sqlx::query(
            r#"
            UPDATE expressions
            SET status = $1, finished_at = COALESCE($2, finished_at)
            WHERE id = $3 AND status < $1 AND status NOT IN ($4, $5)
            "#,
        )
        .bind(status)
        .bind(finished_at)
        .bind(id)
        .bind(ExpressionStatus::Finished)
        .bind(ExpressionStatus::Failed)
        .execute(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_result(&self, id: i64, value: f64) -> SchedulerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE expressions
            SET result = $1, status = $2, finished_at = $3
            WHERE id = $4 AND status NOT IN ($2, $5)
            "#,
        )
        .bind(value)
        .bind(ExpressionStatus::Finished)
        .bind(Utc::now())
        .bind(id)
        .bind(ExpressionStatus::Failed)
        .execute(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        if result.rows_affected() > 0 {
            debug!("表达式 {} 计算完成: {}", id, value);
        }
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> SchedulerResult<bool> {
        let result = sqlx::query("DELETE FROM expressions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
