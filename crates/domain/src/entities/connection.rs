//! WebSocket 连接记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::StoredRecord;

/// WebSocket 连接
///
/// `connection_id` 由传输层分配。带 `board_id` 的记录表示订阅了该留言板。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketConnection {
    #[validate(length(min = 1))]
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub connected_at: DateTime<Utc>,
}

impl WebSocketConnection {
    /// 未订阅任何留言板的连接
    pub fn bare(connection_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            connection_id: connection_id.into(),
            board_id: None,
            user_id: None,
            connected_at: now,
        }
    }

    pub fn subscribed(
        connection_id: impl Into<String>,
        board_id: impl Into<String>,
        user_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            board_id: Some(board_id.into()),
            user_id,
            connected_at: now,
        }
    }
}

impl StoredRecord for WebSocketConnection {
    const ENTITY: &'static str = "websocket_connection";
}
