use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::StoredRecord;
use crate::schema::CreateBoardRequest;

/// 留言板
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    /// 创建者 ID，不校验用户是否存在
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Board {
    pub fn create(id: String, request: CreateBoardRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name,
            created_by: request.created_by,
            created_at: now,
        }
    }
}

impl StoredRecord for Board {
    const ENTITY: &'static str = "board";
}
