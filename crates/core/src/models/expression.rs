use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 表达式状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpressionStatus {
    Created = 0,
    Calculating = 1,
    Finished = 2,
    Failed = 3,
}

impl ExpressionStatus {
    pub fn rank(&self) -> i32 {
        *self as i32
    }

    pub fn from_rank(rank: i32) -> Option<Self> {
        match rank {
            0 => Some(ExpressionStatus::Created),
            1 => Some(ExpressionStatus::Calculating),
            2 => Some(ExpressionStatus::Finished),
            3 => Some(ExpressionStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpressionStatus::Finished | ExpressionStatus::Failed)
    }
}

impl sqlx::Type<sqlx::Sqlite> for ExpressionStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i32 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i32 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for ExpressionStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let rank = <i32 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        ExpressionStatus::from_rank(rank)
            .ok_or_else(|| format!("Invalid expression status: {rank}").into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for ExpressionStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <i32 as sqlx::Encode<sqlx::Sqlite>>::encode(self.rank(), buf)
    }
}

/// 用户提交的表达式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub id: i64,
    pub owner_id: i64,
    pub expression: String,
    pub idempotency_key: Option<String>,
    pub status: ExpressionStatus,
    pub result: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// 创建表达式请求
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    pub owner_id: i64,
    pub expression: String,
    pub idempotency_key: Option<String>,
}
