//! Redis Streams 模块
//!
//! 主题和队列都映射为 Stream：发布用 `XADD`，批处理器通过消费者组读取。

pub mod consumer;
pub mod error;
pub mod publisher;

/// Stream 条目中存放 JSON 载荷的字段名
pub const BODY_FIELD: &str = "body";

pub use consumer::*;
pub use error::*;
pub use publisher::*;
