//! 进程内 WebSocket 连接网关
//!
//! 每个升级成功的 socket 在这里登记一个发送通道，推送时按 connection_id
//! 查找。连接不存在或接收端已关闭都报告为 `GatewayError::Gone`。

use std::collections::HashMap;
use std::sync::Arc;

use application::{ConnectionGateway, GatewayError};
use async_trait::async_trait;
use domain::{IdGenerator, UuidIdGenerator};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

pub struct LocalConnectionGateway {
    connections: RwLock<HashMap<String, mpsc::UnboundedSender<String>>>,
    ids: Arc<dyn IdGenerator>,
}

impl LocalConnectionGateway {
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(UuidIdGenerator))
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            ids,
        }
    }

    /// 分配 connection_id 并返回该连接的出站帧接收端
    pub async fn register(&self) -> (String, mpsc::UnboundedReceiver<String>) {
        let connection_id = self.ids.generate();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.connections
            .write()
            .await
            .insert(connection_id.clone(), sender);
        debug!(connection_id = %connection_id, "connection registered");
        (connection_id, receiver)
    }

    pub async fn unregister(&self, connection_id: &str) {
        if self.connections.write().await.remove(connection_id).is_some() {
            debug!(connection_id, "connection unregistered");
        }
    }

    pub async fn active_connections(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for LocalConnectionGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionGateway for LocalConnectionGateway {
    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: &str,
    ) -> Result<(), GatewayError> {
        let gone = || GatewayError::Gone {
            connection_id: connection_id.to_string(),
        };

        let connections = self.connections.read().await;
        let sender = connections.get(connection_id).ok_or_else(gone)?;
        sender.send(payload.to_string()).map_err(|_| gone())
    }
}
