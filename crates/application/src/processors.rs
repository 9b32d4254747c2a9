//! 异步批处理器
//!
//! 每个批次内的记录并发处理，等待全部结果，任何一条失败都不会中断其他记录，
//! 也不会让整个批次失败。失败记录的重投递交给传输层自身的策略。

use std::future::Future;
use std::sync::Arc;

use domain::{CreateBoardRequest, PostMessageRequest, RegisterUserRequest, ServerEvent};
use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    broadcast::Broadcaster,
    envelope::{parse_record, MessageParsingError, TransportRecord},
    error::ApplicationError,
    services::{BoardService, MessageService, UserService},
};

/// 批处理器对应的事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    UserRegistration,
    BoardCreation,
    MessagePosting,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UserRegistration => "user_registration",
            EventKind::BoardCreation => "board_creation",
            EventKind::MessagePosting => "message_posting",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Parse(#[from] MessageParsingError),
    #[error("downstream service error: {0}")]
    Service(#[from] ApplicationError),
}

impl ProcessingError {
    /// 日志中区分失败原因
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Parse(err) => err.kind(),
            ProcessingError::Service(_) => "downstream",
        }
    }
}

/// 单条记录的处理结果，成功时携带新实体 ID
#[derive(Debug)]
pub struct RecordOutcome {
    pub message_id: String,
    pub result: Result<String, ProcessingError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.successful()
    }

    /// 处理成功的记录的传输层消息 ID
    pub fn succeeded_message_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.message_id.as_str())
            .collect()
    }
}

pub struct Processors {
    users: Arc<UserService>,
    boards: Arc<BoardService>,
    messages: Arc<MessageService>,
    broadcaster: Arc<Broadcaster>,
}

impl Processors {
    pub fn new(
        users: Arc<UserService>,
        boards: Arc<BoardService>,
        messages: Arc<MessageService>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            users,
            boards,
            messages,
            broadcaster,
        }
    }

    pub async fn dispatch(&self, kind: EventKind, records: Vec<TransportRecord>) -> BatchReport {
        match kind {
            EventKind::UserRegistration => self.process_user_registration(records).await,
            EventKind::BoardCreation => self.process_board_creation(records).await,
            EventKind::MessagePosting => self.process_message_posting(records).await,
        }
    }

    pub async fn process_user_registration(&self, records: Vec<TransportRecord>) -> BatchReport {
        settle(EventKind::UserRegistration, records, |record| {
            self.register_user(record)
        })
        .await
    }

    pub async fn process_board_creation(&self, records: Vec<TransportRecord>) -> BatchReport {
        settle(EventKind::BoardCreation, records, |record| {
            self.create_board(record)
        })
        .await
    }

    pub async fn process_message_posting(&self, records: Vec<TransportRecord>) -> BatchReport {
        settle(EventKind::MessagePosting, records, |record| {
            self.post_message(record)
        })
        .await
    }

    async fn register_user(&self, record: TransportRecord) -> Result<String, ProcessingError> {
        let request: RegisterUserRequest = parse_record(&record)?;
        let user = self.users.create_user(request).await?;
        info!(
            "Created user, id: {}, name: {}, email: {}",
            user.id, user.name, user.email
        );
        Ok(user.id)
    }

    async fn create_board(&self, record: TransportRecord) -> Result<String, ProcessingError> {
        let request: CreateBoardRequest = parse_record(&record)?;
        let board = self.boards.create_board(request).await?;
        info!(
            "Created board, id: {}, name: {}, createdBy: {}",
            board.id, board.name, board.created_by
        );
        Ok(board.id)
    }

    /// 留言写入成功后尝试广播；广播失败只记录日志，不影响处理结果
    async fn post_message(&self, record: TransportRecord) -> Result<String, ProcessingError> {
        let request: PostMessageRequest = parse_record(&record)?;
        let message = self.messages.create_message(request).await?;
        info!(
            "Created message, id: {}, boardId: {}, userId: {}",
            message.id, message.board_id, message.user_id
        );

        let message_id = message.id.clone();
        let board_id = message.board_id.clone();
        if let Err(err) = self
            .broadcaster
            .broadcast_to_board(&board_id, &ServerEvent::new_message(message))
            .await
        {
            warn!(
                message_id = %record.message_id,
                board_id = %board_id,
                error = %err,
                "broadcast failed, message was persisted"
            );
        }
        Ok(message_id)
    }
}

async fn settle<F, Fut>(kind: EventKind, records: Vec<TransportRecord>, process: F) -> BatchReport
where
    F: Fn(TransportRecord) -> Fut,
    Fut: Future<Output = Result<String, ProcessingError>>,
{
    info!(event_kind = kind.as_str(), count = records.len(), "received batch");

    let tasks = records.into_iter().map(|record| {
        let message_id = record.message_id.clone();
        let task = process(record);
        async move {
            let result = task.await;
            if let Err(err) = &result {
                error!(
                    event_kind = kind.as_str(),
                    message_id = %message_id,
                    kind = err.kind(),
                    error = %err,
                    cause = ?std::error::Error::source(err).map(|c| c.to_string()),
                    "failed to process record"
                );
            }
            RecordOutcome { message_id, result }
        }
    });

    let report = BatchReport {
        outcomes: join_all(tasks).await,
    };
    info!(
        event_kind = kind.as_str(),
        successful = report.successful(),
        failed = report.failed(),
        "{} successful, {} failed",
        report.successful(),
        report.failed()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::gateway::ConnectionGateway;
    use crate::memory::{MemoryStorage, RecordingGateway};
    use crate::repository::{ConnectionRepository, UserRepository};
    use crate::services::{
        BoardServiceDependencies, ConnectionService, ConnectionServiceDependencies,
        MessageServiceDependencies, UserServiceDependencies,
    };
    use chrono::Utc;
    use domain::{SequentialIdGenerator, WebSocketConnection};

    fn processors(storage: &MemoryStorage, gateway: Option<Arc<dyn ConnectionGateway>>) -> Processors {
        let connections = Arc::new(ConnectionService::new(ConnectionServiceDependencies {
            connection_repository: storage.connections.clone(),
            gateway,
            clock: Arc::new(SystemClock),
        }));
        Processors::new(
            Arc::new(UserService::new(UserServiceDependencies {
                user_repository: storage.users.clone(),
                id_generator: Arc::new(SequentialIdGenerator::new("user")),
                clock: Arc::new(SystemClock),
            })),
            Arc::new(BoardService::new(BoardServiceDependencies {
                board_repository: storage.boards.clone(),
                id_generator: Arc::new(SequentialIdGenerator::new("board")),
                clock: Arc::new(SystemClock),
            })),
            Arc::new(MessageService::new(MessageServiceDependencies {
                message_repository: storage.messages.clone(),
                id_generator: Arc::new(SequentialIdGenerator::new("message")),
                clock: Arc::new(SystemClock),
            })),
            Arc::new(Broadcaster::new(connections)),
        )
    }

    #[tokio::test]
    async fn malformed_record_does_not_fail_the_batch() {
        let storage = MemoryStorage::new();
        let processors = processors(&storage, None);

        let report = processors
            .process_user_registration(vec![
                TransportRecord::topic(
                    "msg-1",
                    "user-registration",
                    r#"{"email":"a@b.com","name":"Ann"}"#,
                ),
                TransportRecord::topic("msg-2", "user-registration", "invalid-json"),
            ])
            .await;

        assert_eq!(report.successful(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded_message_ids(), vec!["msg-1"]);
        assert_eq!(storage.users.count().await, 1);

        let failure = report.outcomes[1].result.as_ref().unwrap_err();
        assert_eq!(failure.kind(), "malformed_payload");
    }

    #[tokio::test]
    async fn schema_mismatch_and_downstream_failures_are_reported() {
        let storage = MemoryStorage::new();
        let processors = processors(&storage, None);
        let valid = r#"{"email":"a@b.com","name":"Ann"}"#;

        let report = processors
            .dispatch(
                EventKind::UserRegistration,
                vec![
                    TransportRecord::topic("msg-1", "t", valid),
                    TransportRecord::topic("msg-2", "t", r#"{"email":"a@b.com"}"#),
                ],
            )
            .await;
        assert_eq!(report.successful(), 1);
        assert_eq!(
            report.outcomes[1].result.as_ref().unwrap_err().kind(),
            "schema_mismatch"
        );

        let duplicate = processors
            .process_user_registration(vec![TransportRecord::topic("msg-3", "t", valid)])
            .await;
        assert_eq!(duplicate.failed(), 1);
        assert_eq!(
            duplicate.outcomes[0].result.as_ref().unwrap_err().kind(),
            "downstream"
        );
        assert!(storage.users.find_by_email("a@b.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn empty_batch_reports_nothing() {
        let storage = MemoryStorage::new();
        let report = processors(&storage, None)
            .process_board_creation(Vec::new())
            .await;
        assert_eq!(report.successful(), 0);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn board_creation_from_queue_records() {
        let storage = MemoryStorage::new();
        let report = processors(&storage, None)
            .process_board_creation(vec![
                TransportRecord::queue("m-1", "board-creation", r#"{"name":"General","createdBy":"u-1"}"#),
                TransportRecord::queue("m-2", "board-creation", r#"{"name":"G","createdBy":"u-1"}"#),
            ])
            .await;

        assert_eq!(report.successful(), 1);
        assert_eq!(report.outcomes[0].result.as_ref().unwrap(), "board-1");
        assert_eq!(storage.boards.count().await, 1);
    }

    #[tokio::test]
    async fn posted_message_is_broadcast_to_subscribers() {
        let storage = MemoryStorage::new();
        let gateway = Arc::new(RecordingGateway::new());
        let now = Utc::now();
        storage
            .connections
            .put(WebSocketConnection::subscribed("c-1", "board-1", None, now))
            .await
            .unwrap();
        storage
            .connections
            .put(WebSocketConnection::subscribed("c-2", "board-1", None, now))
            .await
            .unwrap();
        storage
            .connections
            .put(WebSocketConnection::subscribed("c-3", "board-2", None, now))
            .await
            .unwrap();
        gateway.mark_gone("c-2").await;

        let report = processors(&storage, Some(gateway.clone()))
            .process_message_posting(vec![TransportRecord::topic(
                "msg-1",
                "message-posting",
                r#"{"topic":"hi","data":"there","userId":"u-1","boardId":"board-1"}"#,
            )])
            .await;

        assert_eq!(report.successful(), 1);
        assert_eq!(storage.messages.count().await, 1);
        assert_eq!(gateway.sent_to("c-1").await.len(), 1);
        assert!(gateway.sent_to("c-3").await.is_empty());
        assert_eq!(storage.connections.count().await, 2);
    }

    #[tokio::test]
    async fn broadcast_failure_does_not_fail_the_record() {
        let storage = MemoryStorage::new();
        storage.connections.set_unavailable(true);

        let report = processors(&storage, Some(Arc::new(RecordingGateway::new())))
            .process_message_posting(vec![TransportRecord::topic(
                "msg-1",
                "message-posting",
                r#"{"topic":"hi","data":"there","userId":"u-1","boardId":"board-1"}"#,
            )])
            .await;

        assert_eq!(report.successful(), 1);
        assert_eq!(storage.messages.count().await, 1);
    }
}
