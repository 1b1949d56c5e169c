//! 任务树存储服务
//!
//! 把表达式树展开为按id寻址的扁平节点表，父节点先于子节点插入。
//! 所有状态写入都委托给仓储的条件更新，重复或乱序的回调不会让状态倒退。

use std::sync::Arc;

use calc_core::{
    NewTaskNode, NodeKind, NodePosition, SchedulerError, SchedulerResult, TaskNode,
    TaskStatus, TaskTreeRepository,
};
use tracing::debug;

use crate::expression::ExprNode;

#[derive(Clone)]
pub struct TaskTreeStore {
    repository: Arc<dyn TaskTreeRepository>,
}

impl TaskTreeStore {
    pub fn new(repository: Arc<dyn TaskTreeRepository>) -> Self {
        Self { repository }
    }

    /// 前序持久化整棵树：先插入自身，再左子树，最后右子树。返回根节点id
    pub async fn persist(
        &self,
        root: &ExprNode,
        expression_id: i64,
        owner_id: i64,
    ) -> SchedulerResult<i64> {
        let mut stack: Vec<(&ExprNode, Option<i64>, NodePosition)> =
            vec![(root, None, NodePosition::Left)];
        let mut root_id = None;

        while let Some((node, parent_id, position)) = stack.pop() {
            let kind = match node {
                ExprNode::Leaf { value } => NodeKind::Leaf { value: *value },
                ExprNode::Operator { operation, .. } => NodeKind::Operator {
                    operation: *operation,
                },
            };

            let id = self
                .repository
                .insert(&NewTaskNode {
                    owner_id,
                    parent_id,
                    expression_id,
                    position,
                    kind,
                })
                .await?;

            if root_id.is_none() {
                root_id = Some(id);
            }

            if let ExprNode::Operator { left, right, .. } = node {
                // 右子树先入栈，保证左子树先出栈
                stack.push((right, Some(id), NodePosition::Right));
                stack.push((left, Some(id), NodePosition::Left));
            }
        }

        let root_id = root_id.ok_or_else(|| SchedulerError::Internal("空表达式树".to_string()))?;
        debug!("表达式 {} 的任务树已持久化，根节点: {}", expression_id, root_id);
        Ok(root_id)
    }

    /// 返回 (左, 右) 子节点，叶子节点返回None
    pub async fn children(&self, parent_id: i64) -> SchedulerResult<Option<(TaskNode, TaskNode)>> {
        let mut children = self.repository.find_children(parent_id).await?;
        match children.len() {
            0 => Ok(None),
            2 => {
                let right = children.pop();
                let left = children.pop();
                match (left, right) {
                    (Some(left), Some(right)) => Ok(Some((left, right))),
                    _ => Ok(None),
                }
            }
            n => Err(SchedulerError::DatabaseOperation(format!(
                "任务节点 {parent_id} 的子节点数量异常: {n}"
            ))),
        }
    }

    pub async fn get(&self, id: i64) -> SchedulerResult<TaskNode> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(SchedulerError::TaskNotFound { id })
    }

    /// 状态未提升时为空操作，返回是否生效
    pub async fn set_status(&self, id: i64, status: TaskStatus) -> SchedulerResult<bool> {
        self.repository.update_status(id, status).await
    }

    /// 写入结果并置为Finished
    pub async fn set_result(&self, id: i64, value: f64) -> SchedulerResult<bool> {
        self.repository.save_result(id, value).await
    }

    /// 绑定Worker并置为Enqueued
    pub async fn assign_worker(&self, id: i64, worker_id: &str) -> SchedulerResult<bool> {
        self.repository.assign_worker(id, worker_id).await
    }

    pub async fn mark_failed(&self, id: i64) -> SchedulerResult<bool> {
        self.repository.update_status(id, TaskStatus::Failed).await
    }

    pub async fn uncalculated_roots(&self) -> SchedulerResult<Vec<i64>> {
        self.repository.find_uncalculated_roots().await
    }

    pub async fn release_worker(&self, worker_id: &str) -> SchedulerResult<u64> {
        let released = self.repository.release_worker(worker_id).await?;
        if released > 0 {
            debug!("Worker {} 的 {} 个任务节点已退回待调度", worker_id, released);
        }
        Ok(released)
    }

    pub async fn release_all_workers(&self) -> SchedulerResult<u64> {
        self.repository.release_all_workers().await
    }

    pub async fn nodes_of_expression(&self, expression_id: i64) -> SchedulerResult<Vec<TaskNode>> {
        self.repository.find_by_expression(expression_id).await
    }

    pub async fn in_flight_of_worker(&self, worker_id: &str) -> SchedulerResult<Vec<TaskNode>> {
        self.repository.find_in_flight_by_worker(worker_id).await
    }
}
