//! 基础设施层实现。
//!
//! 提供 PostgreSQL 实体存储、基于 Redis Streams 的主题/队列发布与消费、
//! 以及进程内的 WebSocket 连接网关，实现应用层定义的端口。

pub mod redis;
pub mod repository;
pub mod websocket;

pub use crate::redis::{RedisError, RedisResult, RedisStreamConsumer, RedisStreamPublisher};
pub use repository::{
    create_pg_pool, ensure_schema, PgBoardRepository, PgConnectionRepository,
    PgMessageRepository, PgStorage, PgUserRepository, TableNames,
};
pub use websocket::LocalConnectionGateway;
