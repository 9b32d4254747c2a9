//! 留言板订阅者广播
//!
//! 尽力而为：逐个连接并发推送，等待全部结果。单个连接失败不影响其他连接；
//! 连接已断开时删除其记录。

use std::sync::Arc;

use domain::{ServerEvent, WebSocketConnection};
use futures::future::join_all;
use tracing::{error, info, warn};

use crate::{
    error::ApplicationError,
    gateway::{ConnectionGateway, GatewayError},
    services::ConnectionService,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub stale_removed: usize,
    pub failed: usize,
}

enum SendOutcome {
    Delivered,
    StaleRemoved,
    Failed,
}

pub struct Broadcaster {
    connections: Arc<ConnectionService>,
}

impl Broadcaster {
    pub fn new(connections: Arc<ConnectionService>) -> Self {
        Self { connections }
    }

    /// 向订阅了 `board_id` 的所有连接推送事件
    ///
    /// 只有查询订阅连接失败时返回错误，推送失败只计入报告。
    pub async fn broadcast_to_board(
        &self,
        board_id: &str,
        event: &ServerEvent,
    ) -> Result<BroadcastReport, ApplicationError> {
        let connections = self.connections.connections_for_board(board_id).await?;
        if connections.is_empty() {
            info!(board_id, "no connections found for board");
            return Ok(BroadcastReport::default());
        }

        let Some(gateway) = self.connections.gateway() else {
            warn!(board_id, "connection gateway not configured, skipping websocket broadcast");
            return Ok(BroadcastReport::default());
        };

        let payload = serde_json::to_string(event)?;
        let sends = connections
            .iter()
            .map(|connection| self.send_one(gateway.as_ref(), connection, &payload));
        let outcomes = join_all(sends).await;

        let mut report = BroadcastReport {
            attempted: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                SendOutcome::Delivered => report.delivered += 1,
                SendOutcome::StaleRemoved => report.stale_removed += 1,
                SendOutcome::Failed => report.failed += 1,
            }
        }

        info!(
            board_id,
            attempted = report.attempted,
            delivered = report.delivered,
            stale_removed = report.stale_removed,
            failed = report.failed,
            "broadcast finished"
        );
        Ok(report)
    }

    async fn send_one(
        &self,
        gateway: &dyn ConnectionGateway,
        connection: &WebSocketConnection,
        payload: &str,
    ) -> SendOutcome {
        let connection_id = connection.connection_id.as_str();
        match gateway.post_to_connection(connection_id, payload).await {
            Ok(()) => SendOutcome::Delivered,
            Err(GatewayError::Gone { .. }) => {
                info!(connection_id, "removing stale connection");
                if let Err(err) = self.connections.remove_connection(connection_id).await {
                    error!(connection_id, error = %err, "failed to remove stale connection");
                }
                SendOutcome::StaleRemoved
            }
            Err(err) => {
                error!(connection_id, error = %err, "failed to send message to connection");
                SendOutcome::Failed
            }
        }
    }
}
