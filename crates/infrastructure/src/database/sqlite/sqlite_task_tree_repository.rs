use async_trait::async_trait;
use calc_core::{
    models::{NewTaskNode, NodeKind, NodePosition, Operation, TaskNode, TaskStatus},
    traits::TaskTreeRepository,
    SchedulerError, SchedulerResult,
};
use sqlx::{Row, SqlitePool};
use tracing::debug;

pub struct SqliteTaskTreeRepository {
    pool: SqlitePool,
}

impl SqliteTaskTreeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_task_node(row: &sqlx::sqlite::SqliteRow) -> SchedulerResult<TaskNode> {
        let operation: Option<Operation> = row.try_get("operation")?;
        let result: Option<f64> = row.try_get("result")?;
        let kind = match operation {
            Some(operation) => NodeKind::Operator { operation },
            None => NodeKind::Leaf {
                value: result.unwrap_or_default(),
            },
        };

        let position_index: i32 = row.try_get("position")?;
        let position = NodePosition::from_index(position_index).ok_or_else(|| {
            SchedulerError::DatabaseOperation(format!("无效的节点位置: {position_index}"))
        })?;

        Ok(TaskNode {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            parent_id: row.try_get("parent_id")?,
            expression_id: row.try_get("expression_id")?,
            position,
            kind,
            status: row.try_get("status")?,
            result,
            worker_id: row.try_get("worker_id")?,
        })
    }

    async fn fetch_nodes(
        &self,
        sql: &'static str,
        bind: impl FnOnce(
            sqlx::query::Query<'static, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'static>>,
        ) -> sqlx::query::Query<'static, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'static>>,
    ) -> SchedulerResult<Vec<TaskNode>> {
        let rows = bind(sqlx::query(sql))
            .fetch_all(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        rows.iter().map(Self::row_to_task_node).collect()
    }
}

#[async_trait]
impl TaskTreeRepository for SqliteTaskTreeRepository {
    async fn insert(&self, node: &NewTaskNode) -> SchedulerResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO task_nodes (owner_id, parent_id, expression_id, position, operation, status, result)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(node.owner_id)
        .bind(node.parent_id)
        .bind(node.expression_id)
        .bind(node.position.index())
        .bind(node.kind.operation())
        .bind(node.initial_status())
        .bind(node.initial_result())
        .execute(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        Ok(result.last_insert_rowid())
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<TaskNode>> {
        let row = sqlx::query("SELECT * FROM task_nodes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        row.as_ref().map(Self::row_to_task_node).transpose()
    }

    async fn find_children(&self, parent_id: i64) -> SchedulerResult<Vec<TaskNode>> {
        self.fetch_nodes(
            "SELECT * FROM task_nodes WHERE parent_id = $1 ORDER BY position",
            |query| query.bind(parent_id),
        )
        .await
    }

    async fn find_by_expression(&self, expression_id: i64) -> SchedulerResult<Vec<TaskNode>> {
        self.fetch_nodes(
            "SELECT * FROM task_nodes WHERE expression_id = $1 ORDER BY id",
            |query| query.bind(expression_id),
        )
        .await
    }

    async fn find_in_flight_by_worker(&self, worker_id: &str) -> SchedulerResult<Vec<TaskNode>> {
        let worker_id = worker_id.to_string();
        self.fetch_nodes(
            "SELECT * FROM task_nodes WHERE worker_id = $1 AND status IN ($2, $3) ORDER BY id",
            move |query| {
                query
                    .bind(worker_id)
                    .bind(TaskStatus::Enqueued)
                    .bind(TaskStatus::Calculating)
            },
        )
        .await
    }

    async fn update_status(&self, id: i64, status: TaskStatus) -> SchedulerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE task_nodes SET status = $1
            WHERE id = $2 AND status < $1 AND status NOT IN ($3, $4)
            "#,
        )
        .bind(status)
        .bind(id)
        .bind(TaskStatus::Finished)
        .bind(TaskStatus::Failed)
        .execute(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_result(&self, id: i64, value: f64) -> SchedulerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE task_nodes SET result = $1, status = $2
            WHERE id = $3 AND status NOT IN ($2, $4)
            "#,
        )
        .bind(value)
        .bind(TaskStatus::Finished)
        .bind(id)
        .bind(TaskStatus::Failed)
        .execute(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn assign_worker(&self, id: i64, worker_id: &str) -> SchedulerResult<bool> {
        // Worker可能先于此处回调StartTask，状态取较大者
        let result = sqlx::query(
            r#"
            UPDATE task_nodes SET worker_id = $1, status = MAX(status, $2)
            WHERE id = $3 AND status NOT IN ($4, $5)
            "#,
        )
        .bind(worker_id)
        .bind(TaskStatus::Enqueued)
        .bind(id)
        .bind(TaskStatus::Finished)
        .bind(TaskStatus::Failed)
        .execute(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_uncalculated_roots(&self) -> SchedulerResult<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT id FROM task_nodes WHERE parent_id IS NULL AND status = $1 ORDER BY id",
        )
        .bind(TaskStatus::Created)
        .fetch_all(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        rows.iter()
            .map(|row| row.try_get::<i64, _>("id").map_err(SchedulerError::Database))
            .collect()
    }

    async fn release_worker(&self, worker_id: &str) -> SchedulerResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE task_nodes SET worker_id = NULL, status = $1
            WHERE worker_id = $2 AND status NOT IN ($3, $4)
            "#,
        )
        .bind(TaskStatus::Created)
        .bind(worker_id)
        .bind(TaskStatus::Finished)
        .bind(TaskStatus::Failed)
        .execute(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        debug!(
            "释放Worker {} 的任务节点: {} 个",
            worker_id,
            result.rows_affected()
        );
        Ok(result.rows_affected())
    }

    async fn release_all_workers(&self) -> SchedulerResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE task_nodes SET worker_id = NULL, status = $1
            WHERE worker_id IS NOT NULL AND status NOT IN ($2, $3)
            "#,
        )
        .bind(TaskStatus::Created)
        .bind(TaskStatus::Finished)
        .bind(TaskStatus::Failed)
        .execute(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;
    use calc_core::{models::NewExpression, traits::ExpressionRepository};

    use crate::database::sqlite::SqliteExpressionRepository;

    async fn setup_repository() -> (SqliteTaskTreeRepository, i64, DatabaseManager) {
        let manager = DatabaseManager::in_memory().await.unwrap();
        let expressions = SqliteExpressionRepository::new(manager.pool().clone());
        let expression = expressions
            .create(&NewExpression {
                owner_id: 1,
                expression: "1+2".to_string(),
                idempotency_key: None,
            })
            .await
            .unwrap();
        (
            SqliteTaskTreeRepository::new(manager.pool().clone()),
            expression.id,
            manager,
        )
    }

    fn operator_node(expression_id: i64, parent_id: Option<i64>) -> NewTaskNode {
        NewTaskNode {
            owner_id: 1,
            parent_id,
            expression_id,
            position: NodePosition::Left,
            kind: NodeKind::Operator {
                operation: Operation::Add,
            },
        }
    }

    fn leaf_node(
        expression_id: i64,
        parent_id: i64,
        position: NodePosition,
        value: f64,
    ) -> NewTaskNode {
        NewTaskNode {
            owner_id: 1,
            parent_id: Some(parent_id),
            expression_id,
            position,
            kind: NodeKind::Leaf { value },
        }
    }

    async fn insert_simple_tree(repo: &SqliteTaskTreeRepository, expression_id: i64) -> i64 {
        let root = repo.insert(&operator_node(expression_id, None)).await.unwrap();
        repo.insert(&leaf_node(expression_id, root, NodePosition::Left, 1.0))
            .await
            .unwrap();
        repo.insert(&leaf_node(expression_id, root, NodePosition::Right, 2.0))
            .await
            .unwrap();
        root
    }

    #[tokio::test]
    async fn test_insert_and_children_order() {
        let (repo, expression_id, _db) = setup_repository().await;
        let root = repo.insert(&operator_node(expression_id, None)).await.unwrap();
        // 右子节点先插入，读取时仍按位置排序
        repo.insert(&leaf_node(expression_id, root, NodePosition::Right, 2.0))
            .await
            .unwrap();
        repo.insert(&leaf_node(expression_id, root, NodePosition::Left, 1.0))
            .await
            .unwrap();

        let children = repo.find_children(root).await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].position, NodePosition::Left);
        assert_eq!(children[0].kind, NodeKind::Leaf { value: 1.0 });
        assert_eq!(children[0].status, TaskStatus::Finished);
        assert_eq!(children[1].position, NodePosition::Right);
        assert_eq!(children[1].result, Some(2.0));

        let root_node = repo.get_by_id(root).await.unwrap().unwrap();
        assert!(root_node.is_root());
        assert_eq!(root_node.status, TaskStatus::Created);
        assert_eq!(root_node.kind.operation(), Some(Operation::Add));
        assert_eq!(root_node.result, None);
    }

    #[tokio::test]
    async fn test_update_status_is_conditional() {
        let (repo, expression_id, _db) = setup_repository().await;
        let root = insert_simple_tree(&repo, expression_id).await;

        assert!(repo.update_status(root, TaskStatus::Calculating).await.unwrap());
        assert!(!repo.update_status(root, TaskStatus::Enqueued).await.unwrap());
        assert!(!repo.update_status(root, TaskStatus::Calculating).await.unwrap());

        assert!(repo.save_result(root, 3.0).await.unwrap());
        assert!(!repo.update_status(root, TaskStatus::Failed).await.unwrap());
        assert!(!repo.save_result(root, 4.0).await.unwrap());

        let node = repo.get_by_id(root).await.unwrap().unwrap();
        assert_eq!(node.status, TaskStatus::Finished);
        assert_eq!(node.result, Some(3.0));
    }

    #[tokio::test]
    async fn test_assign_worker() {
        let (repo, expression_id, _db) = setup_repository().await;
        let root = insert_simple_tree(&repo, expression_id).await;

        assert!(repo.assign_worker(root, "w1").await.unwrap());
        let node = repo.get_by_id(root).await.unwrap().unwrap();
        assert_eq!(node.status, TaskStatus::Enqueued);
        assert_eq!(node.worker_id.as_deref(), Some("w1"));

        let in_flight = repo.find_in_flight_by_worker("w1").await.unwrap();
        assert_eq!(in_flight.len(), 1);
        assert!(repo.find_uncalculated_roots().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_worker_after_start_keeps_calculating() {
        let (repo, expression_id, _db) = setup_repository().await;
        let root = insert_simple_tree(&repo, expression_id).await;

        // StartTask回调先到
        assert!(repo.update_status(root, TaskStatus::Calculating).await.unwrap());
        assert!(repo.assign_worker(root, "w1").await.unwrap());

        let node = repo.get_by_id(root).await.unwrap().unwrap();
        assert_eq!(node.status, TaskStatus::Calculating);
        assert_eq!(node.worker_id.as_deref(), Some("w1"));

        repo.save_result(root, 3.0).await.unwrap();
        assert!(!repo.assign_worker(root, "w2").await.unwrap());
    }

    #[tokio::test]
    async fn test_release_worker_reverts_unfinished_nodes() {
        let (repo, expression_id, _db) = setup_repository().await;
        let first = insert_simple_tree(&repo, expression_id).await;
        let second = insert_simple_tree(&repo, expression_id).await;
        let third = insert_simple_tree(&repo, expression_id).await;

        repo.assign_worker(first, "w1").await.unwrap();
        repo.assign_worker(second, "w1").await.unwrap();
        repo.update_status(second, TaskStatus::Calculating)
            .await
            .unwrap();
        repo.assign_worker(third, "w1").await.unwrap();
        repo.save_result(third, 3.0).await.unwrap();

        assert_eq!(repo.release_worker("w1").await.unwrap(), 2);

        for id in [first, second] {
            let node = repo.get_by_id(id).await.unwrap().unwrap();
            assert_eq!(node.status, TaskStatus::Created);
            assert_eq!(node.worker_id, None);
        }
        let finished = repo.get_by_id(third).await.unwrap().unwrap();
        assert_eq!(finished.status, TaskStatus::Finished);

        assert_eq!(
            repo.find_uncalculated_roots().await.unwrap(),
            vec![first, second]
        );
    }

    #[tokio::test]
    async fn test_release_all_workers() {
        let (repo, expression_id, _db) = setup_repository().await;
        let first = insert_simple_tree(&repo, expression_id).await;
        let second = insert_simple_tree(&repo, expression_id).await;
        repo.assign_worker(first, "w1").await.unwrap();
        repo.assign_worker(second, "w2").await.unwrap();

        assert_eq!(repo.release_all_workers().await.unwrap(), 2);
        assert_eq!(
            repo.find_uncalculated_roots().await.unwrap(),
            vec![first, second]
        );
    }

    #[tokio::test]
    async fn test_nodes_removed_with_expression() {
        let (repo, expression_id, db) = setup_repository().await;
        insert_simple_tree(&repo, expression_id).await;
        assert_eq!(repo.find_by_expression(expression_id).await.unwrap().len(), 3);

        let expressions = SqliteExpressionRepository::new(db.pool().clone());
        assert!(expressions.delete(expression_id).await.unwrap());
        assert!(repo
            .find_by_expression(expression_id)
            .await
            .unwrap()
            .is_empty());
    }
}
