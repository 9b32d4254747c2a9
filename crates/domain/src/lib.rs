//! 留言板系统核心领域模型
//!
//! 包含用户、留言板、消息、WebSocket 连接等实体，请求载荷的结构校验规则，
//! 以及标识符生成器。

pub mod entities;
pub mod errors;
pub mod events;
pub mod ids;
pub mod schema;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use events::ServerEvent;
pub use ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use schema::{
    parse_payload, validate_board_id_param, validate_email_param, BoardIdParam,
    CreateBoardRequest, EmailParam, FieldViolation, PostMessageRequest, RegisterUserRequest,
    ValidationError, WebSocketAction,
};
