//! 留言实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::StoredRecord;
use crate::schema::PostMessageRequest;

/// 留言
///
/// `board_id` 和 `user_id` 都是不透明引用，允许悬空。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    #[validate(length(min = 1, max = 5000))]
    pub data: String,
    /// 所属留言板（二级索引）
    pub board_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn post(id: String, request: PostMessageRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            topic: request.topic,
            data: request.data,
            board_id: request.board_id,
            user_id: request.user_id,
            created_at: now,
        }
    }
}

impl StoredRecord for Message {
    const ENTITY: &'static str = "message";
}
