//! 进程内适配器
//!
//! 实体存储的内存实现（`store.backend = "memory"` 时使用），以及记录调用的
//! 事件发布器和连接网关，供测试和本地联调使用。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use domain::{Board, Message, RepositoryError, StoredRecord, User, WebSocketConnection};
use tokio::sync::RwLock;

use crate::{
    gateway::{ConnectionGateway, GatewayError},
    publisher::{EventPublisher, PublishError, PublishTarget},
    repository::{BoardRepository, ConnectionRepository, MessageRepository, UserRepository},
};

/// 按写入顺序保存记录的表
struct Table<T> {
    rows: RwLock<Vec<T>>,
    unavailable: AtomicBool,
}

impl<T: StoredRecord + Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage(format!(
                "{} table is unavailable",
                T::ENTITY
            )));
        }
        Ok(())
    }

    async fn push(&self, row: T) -> Result<(), RepositoryError> {
        self.check_available()?;
        self.rows.write().await.push(row);
        Ok(())
    }

    /// 读取时逐条重新校验，任何一条无效都让整个查询失败
    async fn select<F>(&self, predicate: F) -> Result<Vec<T>, RepositoryError>
    where
        F: Fn(&T) -> bool,
    {
        self.check_available()?;
        self.rows
            .read()
            .await
            .iter()
            .filter(|row| predicate(*row))
            .cloned()
            .map(StoredRecord::ensure_valid)
            .collect()
    }

    async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

macro_rules! table_controls {
    ($repo:ident) => {
        impl $repo {
            pub fn new() -> Self {
                Self(Table::new())
            }

            /// 模拟存储故障：之后的读写都返回 `RepositoryError::Storage`
            pub fn set_unavailable(&self, unavailable: bool) {
                self.0.unavailable.store(unavailable, Ordering::SeqCst);
            }

            pub async fn count(&self) -> usize {
                self.0.len().await
            }
        }

        impl Default for $repo {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

pub struct InMemoryUserRepository(Table<User>);
pub struct InMemoryBoardRepository(Table<Board>);
pub struct InMemoryMessageRepository(Table<Message>);
pub struct InMemoryConnectionRepository(Table<WebSocketConnection>);

table_controls!(InMemoryUserRepository);
table_controls!(InMemoryBoardRepository);
table_controls!(InMemoryMessageRepository);
table_controls!(InMemoryConnectionRepository);

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: User) -> Result<(), RepositoryError> {
        self.0.push(user).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let mut users = self.0.select(|u| u.email == email).await?;
        Ok(if users.is_empty() {
            None
        } else {
            Some(users.swap_remove(0))
        })
    }
}

#[async_trait]
impl BoardRepository for InMemoryBoardRepository {
    async fn insert(&self, board: Board) -> Result<(), RepositoryError> {
        self.0.push(board).await
    }

    async fn list_all(&self) -> Result<Vec<Board>, RepositoryError> {
        self.0.select(|_| true).await
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: Message) -> Result<(), RepositoryError> {
        self.0.push(message).await
    }

    async fn list_by_board(&self, board_id: &str) -> Result<Vec<Message>, RepositoryError> {
        self.0.select(|m| m.board_id == board_id).await
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn put(&self, connection: WebSocketConnection) -> Result<(), RepositoryError> {
        self.0.check_available()?;
        let mut rows = self.0.rows.write().await;
        match rows
            .iter_mut()
            .find(|c| c.connection_id == connection.connection_id)
        {
            Some(existing) => *existing = connection,
            None => rows.push(connection),
        }
        Ok(())
    }

    async fn delete(&self, connection_id: &str) -> Result<(), RepositoryError> {
        self.0.check_available()?;
        self.0
            .rows
            .write()
            .await
            .retain(|c| c.connection_id != connection_id);
        Ok(())
    }

    async fn list_by_board(
        &self,
        board_id: &str,
    ) -> Result<Vec<WebSocketConnection>, RepositoryError> {
        self.0
            .select(|c| c.board_id.as_deref() == Some(board_id))
            .await
    }
}

/// 内存存储的四张表
#[derive(Clone)]
pub struct MemoryStorage {
    pub users: Arc<InMemoryUserRepository>,
    pub boards: Arc<InMemoryBoardRepository>,
    pub messages: Arc<InMemoryMessageRepository>,
    pub connections: Arc<InMemoryConnectionRepository>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            boards: Arc::new(InMemoryBoardRepository::new()),
            messages: Arc::new(InMemoryMessageRepository::new()),
            connections: Arc::new(InMemoryConnectionRepository::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// 一次发布调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedEvent {
    pub message_id: String,
    pub target: PublishTarget,
    pub body: String,
}

/// 只记录不投递的发布器
#[derive(Default)]
pub struct RecordingPublisher {
    published: RwLock<Vec<PublishedEvent>>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn published(&self) -> Vec<PublishedEvent> {
        self.published.read().await.clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, target: &PublishTarget, body: String) -> Result<String, PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::failed(target, "publisher unavailable"));
        }
        let message_id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.published.write().await.push(PublishedEvent {
            message_id: message_id.clone(),
            target: target.clone(),
            body,
        });
        Ok(message_id)
    }
}

/// 记录推送内容的网关，可以把连接标记为已断开或推送失败
#[derive(Default)]
pub struct RecordingGateway {
    sent: RwLock<HashMap<String, Vec<String>>>,
    gone: RwLock<HashSet<String>>,
    failing: RwLock<HashSet<String>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mark_gone(&self, connection_id: &str) {
        self.gone.write().await.insert(connection_id.to_string());
    }

    pub async fn mark_failing(&self, connection_id: &str) {
        self.failing.write().await.insert(connection_id.to_string());
    }

    pub async fn sent_to(&self, connection_id: &str) -> Vec<String> {
        self.sent
            .read()
            .await
            .get(connection_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn total_sent(&self) -> usize {
        self.sent.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl ConnectionGateway for RecordingGateway {
    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: &str,
    ) -> Result<(), GatewayError> {
        if self.gone.read().await.contains(connection_id) {
            return Err(GatewayError::Gone {
                connection_id: connection_id.to_string(),
            });
        }
        if self.failing.read().await.contains(connection_id) {
            return Err(GatewayError::Failed {
                connection_id: connection_id.to_string(),
                message: "throttled".into(),
            });
        }
        self.sent
            .write()
            .await
            .entry(connection_id.to_string())
            .or_default()
            .push(payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn connection_put_overwrites_by_id() {
        let repo = InMemoryConnectionRepository::new();
        let now = Utc::now();
        repo.put(WebSocketConnection::bare("c-1", now)).await.unwrap();
        repo.put(WebSocketConnection::subscribed("c-1", "b-1", None, now))
            .await
            .unwrap();

        assert_eq!(repo.count().await, 1);
        let subscribed = repo.list_by_board("b-1").await.unwrap();
        assert_eq!(subscribed.len(), 1);
        assert_eq!(subscribed[0].connection_id, "c-1");

        repo.delete("c-1").await.unwrap();
        assert!(repo.list_by_board("b-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_of_unknown_connection_is_ok() {
        let repo = InMemoryConnectionRepository::new();
        assert!(repo.delete("missing").await.is_ok());
    }

    #[tokio::test]
    async fn invalid_stored_record_fails_the_read() {
        let repo = InMemoryBoardRepository::new();
        repo.insert(Board {
            id: "b-1".into(),
            name: "x".into(),
            created_by: "u-1".into(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        let err = repo.list_all().await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidRecord { entity: "board", .. }));
    }

    #[tokio::test]
    async fn unavailable_table_reports_storage_error() {
        let repo = InMemoryUserRepository::new();
        repo.set_unavailable(true);
        let err = repo.find_by_email("a@b.com").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Storage { .. }));
    }

    #[tokio::test]
    async fn recording_gateway_reports_gone_connections() {
        let gateway = RecordingGateway::new();
        gateway.mark_gone("c-2").await;

        gateway.post_to_connection("c-1", "hello").await.unwrap();
        let err = gateway.post_to_connection("c-2", "hello").await.unwrap_err();

        assert!(err.is_gone());
        assert_eq!(gateway.sent_to("c-1").await, vec!["hello".to_string()]);
        assert_eq!(gateway.total_sent().await, 1);
    }
}
