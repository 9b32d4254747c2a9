//! Redis Stream 错误类型

use thiserror::Error;

/// Stream 操作失败，携带出错的 stream 和消费组
#[derive(Error, Debug)]
pub enum RedisError {
    #[error("无法连接 Redis: {source}")]
    Connect {
        #[source]
        source: redis::RedisError,
    },

    #[error("为 stream {stream} 创建消费组 {group} 失败: {source}")]
    CreateGroup {
        stream: String,
        group: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("消费组 {group} 读取 stream {stream} 失败: {source}")]
    Read {
        stream: String,
        group: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("消费组 {group} 确认 stream {stream} 条目失败: {source}")]
    Ack {
        stream: String,
        group: String,
        #[source]
        source: redis::RedisError,
    },
}

pub type RedisResult<T> = Result<T, RedisError>;

impl RedisError {
    /// 出错的 stream，连接错误没有
    pub fn stream(&self) -> Option<&str> {
        match self {
            RedisError::Connect { .. } => None,
            RedisError::CreateGroup { stream, .. }
            | RedisError::Read { stream, .. }
            | RedisError::Ack { stream, .. } => Some(stream),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn stream_errors_name_stream_and_group() {
        let err = RedisError::Read {
            stream: "message-posting".into(),
            group: "processors".into(),
            source: redis::RedisError::from((redis::ErrorKind::IoError, "connection reset")),
        };

        let text = err.to_string();
        assert!(text.contains("message-posting"));
        assert!(text.contains("processors"));
        assert_eq!(err.stream(), Some("message-posting"));
        assert!(err.source().is_some());
    }

    #[test]
    fn connect_errors_have_no_stream() {
        let err = RedisError::Connect {
            source: redis::RedisError::from((redis::ErrorKind::InvalidClientConfig, "bad url")),
        };
        assert_eq!(err.stream(), None);
    }
}
