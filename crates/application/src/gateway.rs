//! WebSocket 连接网关端口

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// 连接已经不存在，对应记录应当清理
    #[error("connection {connection_id} is gone")]
    Gone { connection_id: String },
    #[error("failed to send to connection {connection_id}: {message}")]
    Failed {
        connection_id: String,
        message: String,
    },
}

impl GatewayError {
    pub fn is_gone(&self) -> bool {
        matches!(self, GatewayError::Gone { .. })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionGateway: Send + Sync {
    async fn post_to_connection(&self, connection_id: &str, payload: &str)
        -> Result<(), GatewayError>;
}
