use async_trait::async_trait;
use calc_core::{
    models::{FreeWorker, TaskStatus, Worker, WorkerRegistration},
    traits::WorkerRepository,
    SchedulerError, SchedulerResult,
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

pub struct SqliteWorkerRepository {
    pool: SqlitePool,
}

impl SqliteWorkerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_worker(row: &sqlx::sqlite::SqliteRow) -> SchedulerResult<Worker> {
        Ok(Worker {
            id: row.try_get("id")?,
            url: row.try_get("url")?,
            executors: row.try_get("executors")?,
            last_heartbeat: row.try_get("last_heartbeat")?,
        })
    }
}

#[async_trait]
impl WorkerRepository for SqliteWorkerRepository {
    async fn upsert(&self, registration: &WorkerRegistration) -> SchedulerResult<bool> {
        let mut tx = self.pool.begin().await.map_err(SchedulerError::Database)?;

        let existing = sqlx::query("SELECT 1 FROM workers WHERE id = $1")
            .bind(&registration.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(SchedulerError::Database)?;

        sqlx::query(
            r#"
            INSERT INTO workers (id, url, executors, last_heartbeat)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(id) DO UPDATE SET
                url = excluded.url,
                executors = excluded.executors,
                last_heartbeat = excluded.last_heartbeat
            "#,
        )
        .bind(&registration.id)
        .bind(&registration.url)
        .bind(registration.executors)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(SchedulerError::Database)?;

        tx.commit().await.map_err(SchedulerError::Database)?;

        let already_existed = existing.is_some();
        if !already_existed {
            debug!("注册Worker成功: {}", registration.id);
        }
        Ok(already_existed)
    }

    async fn get_by_id(&self, id: &str) -> SchedulerResult<Option<Worker>> {
        let row = sqlx::query("SELECT id, url, executors, last_heartbeat FROM workers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        row.as_ref().map(Self::row_to_worker).transpose()
    }

    async fn list(&self) -> SchedulerResult<Vec<Worker>> {
        let rows = sqlx::query("SELECT id, url, executors, last_heartbeat FROM workers ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        rows.iter().map(Self::row_to_worker).collect()
    }

    async fn find_free(&self) -> SchedulerResult<Option<FreeWorker>> {
        let row = sqlx::query(
            r#"
            SELECT w.id, w.url, w.executors - COUNT(t.id) AS free_slots
            FROM workers w
            LEFT JOIN task_nodes t ON t.worker_id = w.id AND t.status IN ($1, $2)
            GROUP BY w.id, w.url, w.executors
            HAVING free_slots > 0
            ORDER BY free_slots DESC, w.id ASC
            LIMIT 1
            "#,
        )
        .bind(TaskStatus::Enqueued)
        .bind(TaskStatus::Calculating)
        .fetch_optional(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        match row {
            Some(row) => Ok(Some(FreeWorker {
                id: row.try_get("id")?,
                url: row.try_get("url")?,
                free_slots: row.try_get("free_slots")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_older_than(&self, deadline: DateTime<Utc>) -> SchedulerResult<Vec<String>> {
        let rows = sqlx::query("DELETE FROM workers WHERE last_heartbeat < $1 RETURNING id")
            .bind(deadline)
            .fetch_all(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        let expired = rows
            .iter()
            .map(|row| row.try_get::<String, _>("id"))
            .collect::<Result<Vec<_>, _>>()?;

        if !expired.is_empty() {
            debug!("清理过期Worker: {:?}", expired);
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlite::{SqliteExpressionRepository, SqliteTaskTreeRepository};
    use crate::database::DatabaseManager;
    use calc_core::{
        models::{NewExpression, NewTaskNode, NodeKind, NodePosition, Operation},
        traits::{ExpressionRepository, TaskTreeRepository},
    };
    use chrono::Duration;

    fn registration(id: &str, executors: i32) -> WorkerRegistration {
        WorkerRegistration {
            id: id.to_string(),
            url: format!("http://{id}.local:8081"),
            executors,
        }
    }

    /// 为Worker制造 `count` 个执行中的节点
    async fn occupy(db: &DatabaseManager, worker_id: &str, count: usize) {
        let expressions = SqliteExpressionRepository::new(db.pool().clone());
        let nodes = SqliteTaskTreeRepository::new(db.pool().clone());
        let expression = expressions
            .create(&NewExpression {
                owner_id: 1,
                expression: "1+1".to_string(),
                idempotency_key: None,
            })
            .await
            .unwrap();

        for _ in 0..count {
            let id = nodes
                .insert(&NewTaskNode {
                    owner_id: 1,
                    parent_id: None,
                    expression_id: expression.id,
                    position: NodePosition::Left,
                    kind: NodeKind::Operator {
                        operation: Operation::Add,
                    },
                })
                .await
                .unwrap();
            assert!(nodes.assign_worker(id, worker_id).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_upsert_reports_existing() {
        let db = DatabaseManager::in_memory().await.unwrap();
        let repo = SqliteWorkerRepository::new(db.pool().clone());

        assert!(!repo.upsert(&registration("w1", 2)).await.unwrap());
        let first_seen = repo.get_by_id("w1").await.unwrap().unwrap().last_heartbeat;

        assert!(repo.upsert(&registration("w1", 3)).await.unwrap());
        let worker = repo.get_by_id("w1").await.unwrap().unwrap();
        assert_eq!(worker.executors, 3);
        assert!(worker.last_heartbeat >= first_seen);

        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_free_prefers_more_free_slots() {
        let db = DatabaseManager::in_memory().await.unwrap();
        let repo = SqliteWorkerRepository::new(db.pool().clone());

        // a: 2个槽位，空闲2；b: 4个槽位，占用3，空闲1
        repo.upsert(&registration("a", 2)).await.unwrap();
        repo.upsert(&registration("b", 4)).await.unwrap();
        occupy(&db, "b", 3).await;

        let free = repo.find_free().await.unwrap().unwrap();
        assert_eq!(free.id, "a");
        assert_eq!(free.free_slots, 2);
    }

    #[tokio::test]
    async fn test_find_free_tie_breaks_by_id() {
        let db = DatabaseManager::in_memory().await.unwrap();
        let repo = SqliteWorkerRepository::new(db.pool().clone());

        // 两者都只剩1个空闲槽位
        repo.upsert(&registration("b", 4)).await.unwrap();
        repo.upsert(&registration("a", 2)).await.unwrap();
        occupy(&db, "b", 3).await;
        occupy(&db, "a", 1).await;

        let free = repo.find_free().await.unwrap().unwrap();
        assert_eq!(free.id, "a");
        assert_eq!(free.free_slots, 1);
    }

    #[tokio::test]
    async fn test_find_free_none_when_saturated() {
        let db = DatabaseManager::in_memory().await.unwrap();
        let repo = SqliteWorkerRepository::new(db.pool().clone());
        assert!(repo.find_free().await.unwrap().is_none());

        repo.upsert(&registration("a", 1)).await.unwrap();
        occupy(&db, "a", 1).await;
        assert!(repo.find_free().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let db = DatabaseManager::in_memory().await.unwrap();
        let repo = SqliteWorkerRepository::new(db.pool().clone());
        repo.upsert(&registration("a", 1)).await.unwrap();
        repo.upsert(&registration("b", 1)).await.unwrap();

        let past = Utc::now() - Duration::seconds(60);
        assert!(repo.delete_older_than(past).await.unwrap().is_empty());

        let future = Utc::now() + Duration::seconds(1);
        let mut expired = repo.delete_older_than(future).await.unwrap();
        expired.sort();
        assert_eq!(expired, vec!["a".to_string(), "b".to_string()]);
        assert!(repo.list().await.unwrap().is_empty());
    }
}
