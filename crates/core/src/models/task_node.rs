use serde::{Deserialize, Serialize};

use super::Operation;

/// 任务节点状态，按 Created < Enqueued < Calculating < {Finished, Failed} 单调推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Created = 0,
    Enqueued = 1,
    Calculating = 2,
    Finished = 3,
    Failed = 4,
}

impl TaskStatus {
    pub fn rank(&self) -> i32 {
        *self as i32
    }

    pub fn from_rank(rank: i32) -> Option<Self> {
        match rank {
            0 => Some(TaskStatus::Created),
            1 => Some(TaskStatus::Enqueued),
            2 => Some(TaskStatus::Calculating),
            3 => Some(TaskStatus::Finished),
            4 => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// 终态之间互不覆盖
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Failed)
    }

    /// 是否占用Worker的执行槽位
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TaskStatus::Enqueued | TaskStatus::Calculating)
    }

    /// 判断能否从当前状态推进到目标状态
    pub fn can_advance_to(&self, next: TaskStatus) -> bool {
        !self.is_terminal() && next > *self
    }
}

impl sqlx::Type<sqlx::Sqlite> for TaskStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i32 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i32 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let rank = <i32 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        TaskStatus::from_rank(rank).ok_or_else(|| format!("Invalid task status: {rank}").into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <i32 as sqlx::Encode<sqlx::Sqlite>>::encode(self.rank(), buf)
    }
}

/// 节点在父节点下的位置，根节点固定为Left且无意义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePosition {
    Left = 0,
    Right = 1,
}

impl NodePosition {
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(NodePosition::Left),
            1 => Some(NodePosition::Right),
            _ => None,
        }
    }

    pub fn index(&self) -> i32 {
        *self as i32
    }
}

/// 节点类型：叶子携带字面值，运算节点携带运算符
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Leaf { value: f64 },
    Operator { operation: Operation },
}

impl NodeKind {
    pub fn operation(&self) -> Option<Operation> {
        match self {
            NodeKind::Leaf { .. } => None,
            NodeKind::Operator { operation } => Some(*operation),
        }
    }
}

/// 任务树节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: i64,
    pub owner_id: i64,
    pub parent_id: Option<i64>,
    pub expression_id: i64,
    pub position: NodePosition,
    pub kind: NodeKind,
    pub status: TaskStatus,
    pub result: Option<f64>,
    pub worker_id: Option<String>,
}

impl TaskNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

/// 待插入的任务节点
#[derive(Debug, Clone, PartialEq)]
pub struct NewTaskNode {
    pub owner_id: i64,
    pub parent_id: Option<i64>,
    pub expression_id: i64,
    pub position: NodePosition,
    pub kind: NodeKind,
}

impl NewTaskNode {
    /// 叶子节点创建即完成，结果为字面值
    pub fn initial_status(&self) -> TaskStatus {
        match self.kind {
            NodeKind::Leaf { .. } => TaskStatus::Finished,
            NodeKind::Operator { .. } => TaskStatus::Created,
        }
    }

    pub fn initial_result(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Leaf { value } => Some(value),
            NodeKind::Operator { .. } => None,
        }
    }
}
