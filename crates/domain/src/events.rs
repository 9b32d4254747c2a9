//! 推送给 WebSocket 客户端的事件

use serde::{Deserialize, Serialize};

use crate::entities::Message;

/// 服务端推送帧，按 `type` 字段区分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// 新留言广播
    Message { board_id: String, message: Message },
    SubscriptionConfirmed {
        board_id: String,
        connection_id: String,
    },
    UnsubscriptionConfirmed {
        board_id: String,
        connection_id: String,
    },
}

impl ServerEvent {
    pub fn new_message(message: Message) -> Self {
        Self::Message {
            board_id: message.board_id.clone(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn confirmation_wire_format() {
        let event = ServerEvent::SubscriptionConfirmed {
            board_id: "b-1".into(),
            connection_id: "c-1".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "subscription_confirmed", "boardId": "b-1", "connectionId": "c-1"})
        );
    }

    #[test]
    fn message_broadcast_wire_format() {
        let message = Message {
            id: "m-1".into(),
            topic: "hello".into(),
            data: "world".into(),
            board_id: "b-1".into(),
            user_id: "u-1".into(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(ServerEvent::new_message(message)).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["boardId"], "b-1");
        assert_eq!(value["message"]["userId"], "u-1");
    }
}
