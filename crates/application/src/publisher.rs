//! 事件发布端口

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// 目的地类型：发布/订阅主题或点对点队列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Topic,
    Queue,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublishTarget {
    pub kind: TargetKind,
    pub name: String,
}

impl PublishTarget {
    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Topic,
            name: name.into(),
        }
    }

    pub fn queue(name: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Queue,
            name: name.into(),
        }
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TargetKind::Topic => write!(f, "topic:{}", self.name),
            TargetKind::Queue => write!(f, "queue:{}", self.name),
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to publish to {target}: {message}")]
    Failed { target: String, message: String },
}

impl PublishError {
    pub fn failed(target: &PublishTarget, message: impl Into<String>) -> Self {
        Self::Failed {
            target: target.to_string(),
            message: message.into(),
        }
    }
}

/// 把已校验的载荷交给异步传输，返回传输层分配的消息 ID
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, target: &PublishTarget, body: String) -> Result<String, PublishError>;
}
