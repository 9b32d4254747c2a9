//! 领域模型错误定义

use thiserror::Error;

/// 存储层错误
///
/// 读取到的记录无法通过实体校验时返回 `InvalidRecord`，调用方必须把它当作
/// 失败处理，不能静默丢弃。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// 底层存储失败（连接、SQL 执行等）
    #[error("存储错误: {message}")]
    Storage { message: String },

    /// 已存储的记录不符合实体约束
    #[error("存储的 {entity} 记录无效: {reason}")]
    InvalidRecord { entity: &'static str, reason: String },
}

impl RepositoryError {
    /// 创建存储错误
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// 创建无效记录错误
    pub fn invalid_record(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            entity,
            reason: reason.into(),
        }
    }
}

/// 存储层结果类型
pub type RepositoryResult<T> = Result<T, RepositoryError>;
