//! WebSocket 连接记录管理

use std::sync::Arc;

use domain::{ServerEvent, WebSocketConnection};
use tracing::{error, info, warn};

use crate::{
    clock::Clock, error::ApplicationError, gateway::ConnectionGateway,
    repository::ConnectionRepository,
};

pub struct ConnectionServiceDependencies {
    pub connection_repository: Arc<dyn ConnectionRepository>,
    /// 未配置网关时跳过所有推送
    pub gateway: Option<Arc<dyn ConnectionGateway>>,
    pub clock: Arc<dyn Clock>,
}

pub struct ConnectionService {
    deps: ConnectionServiceDependencies,
}

impl ConnectionService {
    pub fn new(deps: ConnectionServiceDependencies) -> Self {
        Self { deps }
    }

    pub fn gateway(&self) -> Option<&Arc<dyn ConnectionGateway>> {
        self.deps.gateway.as_ref()
    }

    /// 保存未订阅任何留言板的连接
    pub async fn store_connection(&self, connection_id: &str) -> Result<(), ApplicationError> {
        let connection = WebSocketConnection::bare(connection_id, self.deps.clock.now());
        self.deps.connection_repository.put(connection).await?;
        Ok(())
    }

    pub async fn remove_connection(&self, connection_id: &str) -> Result<(), ApplicationError> {
        self.deps.connection_repository.delete(connection_id).await?;
        Ok(())
    }

    /// 覆盖写入带 `board_id` 的连接记录
    pub async fn subscribe_to_board(
        &self,
        connection_id: &str,
        board_id: &str,
        user_id: Option<String>,
    ) -> Result<(), ApplicationError> {
        let connection =
            WebSocketConnection::subscribed(connection_id, board_id, user_id, self.deps.clock.now());
        self.deps.connection_repository.put(connection).await?;
        Ok(())
    }

    pub async fn connections_for_board(
        &self,
        board_id: &str,
    ) -> Result<Vec<WebSocketConnection>, ApplicationError> {
        Ok(self.deps.connection_repository.list_by_board(board_id).await?)
    }

    /// 向单个连接推送事件。
    ///
    /// 网关报告连接已断开时先删除连接记录，再把错误返回给调用方。
    pub async fn send_to_connection(
        &self,
        connection_id: &str,
        event: &ServerEvent,
    ) -> Result<(), ApplicationError> {
        let Some(gateway) = self.deps.gateway.as_ref() else {
            error!(connection_id, "connection gateway not configured");
            return Ok(());
        };

        let payload = serde_json::to_string(event)?;

        match gateway.post_to_connection(connection_id, &payload).await {
            Ok(()) => {
                info!(connection_id, "message sent to connection");
                Ok(())
            }
            Err(err) => {
                warn!(connection_id, error = %err, "failed to send message to connection");
                if err.is_gone() {
                    info!(connection_id, "removing stale connection");
                    self.remove_connection(connection_id).await?;
                }
                Err(err.into())
            }
        }
    }
}
