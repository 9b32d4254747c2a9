//! Redis Stream 消费者
//!
//! 每个事件类型一个消费循环：`XREADGROUP` 读取一批条目，交给批处理器，
//! 只对处理成功的条目执行 `XACK`。失败的条目留在 pending 列表中，
//! 消费者重启时先重读自己的 pending 条目。

use std::sync::Arc;
use std::time::Duration;

use application::{EventKind, Processors, PublishTarget, TargetKind, TransportRecord};
use config::ConsumerConfig;
use redis::{aio::ConnectionManager, streams::StreamReadReply, Value};
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::{RedisError, RedisResult, BODY_FIELD};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);
const NEW_ENTRIES: &str = ">";

pub struct RedisStreamConsumer {
    connection: ConnectionManager,
    processors: Arc<Processors>,
    group: String,
    consumer_name: String,
    batch_size: usize,
    block_ms: u64,
}

impl RedisStreamConsumer {
    pub fn new(
        connection: ConnectionManager,
        processors: Arc<Processors>,
        config: &ConsumerConfig,
    ) -> Self {
        Self {
            connection,
            processors,
            group: config.group.clone(),
            consumer_name: config.consumer_name.clone(),
            batch_size: config.batch_size,
            block_ms: config.block_ms,
        }
    }

    /// 持续消费 `source`，直到 `shutdown` 变为 `true`
    pub async fn run(
        &self,
        kind: EventKind,
        source: PublishTarget,
        mut shutdown: watch::Receiver<bool>,
    ) -> RedisResult<()> {
        info!(
            event_kind = kind.as_str(),
            stream = %source.name,
            group = %self.group,
            consumer = %self.consumer_name,
            "stream consumer starting"
        );
        self.ensure_consumer_group(&source.name).await?;

        // 先按 ID 顺序重读上次遗留的 pending 条目，读完后切换到新条目
        let mut cursor = String::from("0");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let batch = tokio::select! {
                batch = self.consume_batch(kind, &source, &cursor) => batch,
                _ = shutdown.changed() => break,
            };

            match batch {
                Ok(last_id) if cursor != NEW_ENTRIES => match last_id {
                    Some(id) => cursor = id,
                    None => {
                        info!(stream = %source.name, "pending entries drained");
                        cursor = NEW_ENTRIES.to_string();
                    }
                },
                Ok(_) => {}
                Err(e) => {
                    error!(stream = %source.name, error = %e, "failed to consume batch");
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }

        info!(stream = %source.name, "stream consumer stopped");
        Ok(())
    }

    async fn ensure_consumer_group(&self, stream: &str) -> RedisResult<()> {
        let mut conn = self.connection.clone();

        // 组已存在时返回 BUSYGROUP，可以忽略
        let result: Result<String, redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(stream)
            .arg(&self.group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!(stream, group = %self.group, "consumer group created"),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                info!(stream, group = %self.group, "consumer group already exists")
            }
            Err(source) => {
                return Err(RedisError::CreateGroup {
                    stream: stream.to_string(),
                    group: self.group.clone(),
                    source,
                })
            }
        }
        Ok(())
    }

    /// 读取并处理一批条目，返回这批中最后一个条目的 ID
    async fn consume_batch(
        &self,
        kind: EventKind,
        source: &PublishTarget,
        cursor: &str,
    ) -> RedisResult<Option<String>> {
        let mut conn = self.connection.clone();

        let mut command = redis::cmd("XREADGROUP");
        command
            .arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer_name)
            .arg("COUNT")
            .arg(self.batch_size);
        // pending 条目不需要阻塞等待
        if cursor == NEW_ENTRIES {
            command.arg("BLOCK").arg(self.block_ms);
        }
        let reply: Option<StreamReadReply> = command
            .arg("STREAMS")
            .arg(&source.name)
            .arg(cursor)
            .query_async(&mut conn)
            .await
            .map_err(|err| RedisError::Read {
                stream: source.name.clone(),
                group: self.group.clone(),
                source: err,
            })?;

        let records = reply.map(|r| to_records(source, r)).unwrap_or_default();
        let Some(last_id) = records.last().map(|r| r.message_id.clone()) else {
            return Ok(None);
        };
        let report = self.processors.dispatch(kind, records).await;

        let succeeded = report.succeeded_message_ids();
        if !succeeded.is_empty() {
            let acked: i64 = redis::cmd("XACK")
                .arg(&source.name)
                .arg(&self.group)
                .arg(&succeeded)
                .query_async(&mut conn)
                .await
                .map_err(|err| RedisError::Ack {
                    stream: source.name.clone(),
                    group: self.group.clone(),
                    source: err,
                })?;
            if acked as usize != succeeded.len() {
                warn!(
                    stream = %source.name,
                    expected = succeeded.len(),
                    acked,
                    "not every processed entry was acknowledged"
                );
            }
        }

        Ok(Some(last_id))
    }
}

fn to_records(source: &PublishTarget, reply: StreamReadReply) -> Vec<TransportRecord> {
    reply
        .keys
        .into_iter()
        .flat_map(|key| key.ids)
        .map(|entry| {
            let body = body_field(&entry.map).unwrap_or_else(|| {
                warn!(message_id = %entry.id, "stream entry has no body field");
                String::new()
            });
            match source.kind {
                TargetKind::Topic => TransportRecord::topic(entry.id, &source.name, body),
                TargetKind::Queue => TransportRecord::queue(entry.id, &source.name, body),
            }
        })
        .collect()
}

fn body_field(fields: &std::collections::HashMap<String, Value>) -> Option<String> {
    match fields.get(BODY_FIELD) {
        Some(Value::BulkString(bytes)) => String::from_utf8(bytes.clone()).ok(),
        Some(Value::SimpleString(text)) => Some(text.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::streams::{StreamId, StreamKey};
    use std::collections::HashMap;

    fn entry(id: &str, body: Option<&str>) -> StreamId {
        let mut map = HashMap::new();
        if let Some(body) = body {
            map.insert(BODY_FIELD.to_string(), Value::BulkString(body.as_bytes().to_vec()));
        }
        StreamId {
            id: id.to_string(),
            map,
        }
    }

    #[test]
    fn stream_entries_become_transport_records() {
        let reply = StreamReadReply {
            keys: vec![StreamKey {
                key: "board-creation".into(),
                ids: vec![entry("1-0", Some(r#"{"name":"General"}"#)), entry("2-0", None)],
            }],
        };
        let records = to_records(&PublishTarget::queue("board-creation"), reply);

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            TransportRecord::queue("1-0", "board-creation", r#"{"name":"General"}"#)
        );
        assert_eq!(records[1].body, "");
        assert_eq!(records[1].source.kind(), "queue");
    }
}
