//! Redis Stream 发布者

use application::{EventPublisher, PublishError, PublishTarget};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use tracing::{debug, info};

use super::{RedisError, RedisResult, BODY_FIELD};

/// 把载荷追加到与目的地同名的 Stream
#[derive(Clone)]
pub struct RedisStreamPublisher {
    connection: ConnectionManager,
}

impl RedisStreamPublisher {
    pub async fn connect(url: &str) -> RedisResult<Self> {
        let client = Client::open(url).map_err(|source| RedisError::Connect { source })?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|source| RedisError::Connect { source })?;
        info!("Redis Stream 发布者已连接");
        Ok(Self::new(connection))
    }

    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(&self, target: &PublishTarget, body: String) -> Result<String, PublishError> {
        let mut conn = self.connection.clone();
        let message_id: String = redis::cmd("XADD")
            .arg(&target.name)
            .arg("*")
            .arg(BODY_FIELD)
            .arg(&body)
            .query_async(&mut conn)
            .await
            .map_err(|e| PublishError::failed(target, e.to_string()))?;

        debug!(%target, message_id = %message_id, "event published");
        Ok(message_id)
    }
}
