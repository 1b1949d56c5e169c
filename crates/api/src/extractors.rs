use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const OWNER_HEADER: &str = "X-Owner-Id";
pub const DEFAULT_OWNER_ID: i64 = 1;

/// 请求所属用户，取自 `X-Owner-Id` 请求头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub i64);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(OWNER_HEADER) else {
            return Ok(OwnerId(DEFAULT_OWNER_ID));
        };

        let owner_id = value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| ApiError::BadRequest(format!("{} 必须为正整数", OWNER_HEADER)))?;

        Ok(OwnerId(owner_id))
    }
}
