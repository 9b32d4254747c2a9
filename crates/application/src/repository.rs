//! 实体存储端口
//!
//! 查询不到记录属于正常结果（空列表或 `None`）。读取到的记录必须重新校验，
//! 校验失败返回 `RepositoryError::InvalidRecord`。

use async_trait::async_trait;
use domain::{Board, Message, RepositoryError, User, WebSocketConnection};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> Result<(), RepositoryError>;
    /// 通过邮箱二级索引查询
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
}

#[async_trait]
pub trait BoardRepository: Send + Sync {
    async fn insert(&self, board: Board) -> Result<(), RepositoryError>;
    /// 全量扫描，不分页
    async fn list_all(&self) -> Result<Vec<Board>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: Message) -> Result<(), RepositoryError>;
    /// 通过留言板二级索引查询，不分页
    async fn list_by_board(&self, board_id: &str) -> Result<Vec<Message>, RepositoryError>;
}

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// 按 connection_id 覆盖写入
    async fn put(&self, connection: WebSocketConnection) -> Result<(), RepositoryError>;
    async fn delete(&self, connection_id: &str) -> Result<(), RepositoryError>;
    async fn list_by_board(
        &self,
        board_id: &str,
    ) -> Result<Vec<WebSocketConnection>, RepositoryError>;
}
