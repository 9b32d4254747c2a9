//! 传输信封解析
//!
//! 从主题通知或队列记录中取出载荷字符串，先按 JSON 解析，再按 schema 校验。
//! 两类失败分开报告：JSON 损坏通常是传输问题，schema 不符通常是生产者的 bug。

use std::fmt;

use domain::{parse_payload, ValidationError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    Topic(String),
    Queue(String),
}

impl RecordSource {
    pub fn kind(&self) -> &'static str {
        match self {
            RecordSource::Topic(_) => "topic",
            RecordSource::Queue(_) => "queue",
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSource::Topic(name) => write!(f, "topic:{name}"),
            RecordSource::Queue(name) => write!(f, "queue:{name}"),
        }
    }
}

/// 批处理器收到的单条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRecord {
    pub message_id: String,
    pub source: RecordSource,
    pub body: String,
}

impl TransportRecord {
    pub fn topic(
        message_id: impl Into<String>,
        topic: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            source: RecordSource::Topic(topic.into()),
            body: body.into(),
        }
    }

    pub fn queue(
        message_id: impl Into<String>,
        queue: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            source: RecordSource::Queue(queue.into()),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MessageParsingError {
    #[error("Failed to parse JSON in {source_kind} record {message_id}")]
    MalformedPayload {
        message_id: String,
        source_kind: &'static str,
        #[source]
        cause: serde_json::Error,
    },
    #[error("Failed to validate {source_kind} record {message_id} against schema")]
    SchemaMismatch {
        message_id: String,
        source_kind: &'static str,
        #[source]
        cause: ValidationError,
    },
}

impl MessageParsingError {
    pub fn kind(&self) -> &'static str {
        match self {
            MessageParsingError::MalformedPayload { .. } => "malformed_payload",
            MessageParsingError::SchemaMismatch { .. } => "schema_mismatch",
        }
    }
}

pub fn parse_record<T>(record: &TransportRecord) -> Result<T, MessageParsingError>
where
    T: DeserializeOwned + Validate,
{
    let value: Value =
        serde_json::from_str(&record.body).map_err(|cause| MessageParsingError::MalformedPayload {
            message_id: record.message_id.clone(),
            source_kind: record.source.kind(),
            cause,
        })?;

    parse_payload(value).map_err(|cause| MessageParsingError::SchemaMismatch {
        message_id: record.message_id.clone(),
        source_kind: record.source.kind(),
        cause,
    })
}
