//! 领域实体定义
//!
//! 所有实体创建后不可变；存储层读取时会重新校验每条记录。

pub mod board;
pub mod connection;
pub mod message;
pub mod user;

pub use board::Board;
pub use connection::WebSocketConnection;
pub use message::Message;
pub use user::User;

use validator::Validate;

use crate::errors::RepositoryError;
use crate::schema::ValidationError;

/// 可持久化的实体
pub trait StoredRecord: Validate + Sized {
    /// 实体名称，用于错误信息和日志
    const ENTITY: &'static str;

    /// 校验从存储中读出的记录，失败时返回 `RepositoryError::InvalidRecord`
    fn ensure_valid(self) -> Result<Self, RepositoryError> {
        self.validate().map_err(|errors| {
            RepositoryError::invalid_record(Self::ENTITY, ValidationError::from(errors).to_string())
        })?;
        Ok(self)
    }
}
