//! 存储适配服务与广播的单元测试

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use domain::{
    CreateBoardRequest, PostMessageRequest, RegisterUserRequest, SequentialIdGenerator,
    ServerEvent, WebSocketConnection,
};

use crate::broadcast::Broadcaster;
use crate::clock::FixedClock;
use crate::error::ApplicationError;
use crate::gateway::{ConnectionGateway, GatewayError, MockConnectionGateway};
use crate::memory::{MemoryStorage, RecordingGateway};
use crate::repository::ConnectionRepository;
use crate::services::*;

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()))
}

fn user_service(storage: &MemoryStorage) -> UserService {
    UserService::new(UserServiceDependencies {
        user_repository: storage.users.clone(),
        id_generator: Arc::new(SequentialIdGenerator::new("user")),
        clock: clock(),
    })
}

fn board_service(storage: &MemoryStorage) -> BoardService {
    BoardService::new(BoardServiceDependencies {
        board_repository: storage.boards.clone(),
        id_generator: Arc::new(SequentialIdGenerator::new("board")),
        clock: clock(),
    })
}

fn message_service(storage: &MemoryStorage) -> MessageService {
    MessageService::new(MessageServiceDependencies {
        message_repository: storage.messages.clone(),
        id_generator: Arc::new(SequentialIdGenerator::new("message")),
        clock: clock(),
    })
}

fn connection_service(
    storage: &MemoryStorage,
    gateway: Option<Arc<dyn ConnectionGateway>>,
) -> Arc<ConnectionService> {
    Arc::new(ConnectionService::new(ConnectionServiceDependencies {
        connection_repository: storage.connections.clone(),
        gateway,
        clock: clock(),
    }))
}

fn post(board_id: &str, topic: &str) -> PostMessageRequest {
    PostMessageRequest {
        topic: topic.into(),
        data: "body".into(),
        user_id: "user-1".into(),
        board_id: board_id.into(),
    }
}

#[tokio::test]
async fn create_user_then_read_by_email() {
    let storage = MemoryStorage::new();
    let service = user_service(&storage);

    let created = service
        .create_user(RegisterUserRequest {
            email: "a@b.com".into(),
            name: "Ann".into(),
        })
        .await
        .unwrap();
    assert_eq!(created.id, "user-1");

    let found = service.get_user_by_email("a@b.com").await.unwrap();
    assert_eq!(found, Some(created));
}

#[tokio::test]
async fn unknown_email_is_not_an_error() {
    let storage = MemoryStorage::new();
    let found = user_service(&storage)
        .get_user_by_email("nobody@b.com")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let storage = MemoryStorage::new();
    let service = user_service(&storage);
    let request = RegisterUserRequest {
        email: "a@b.com".into(),
        name: "Ann".into(),
    };

    service.create_user(request.clone()).await.unwrap();
    let err = service.create_user(request).await.unwrap_err();

    assert!(matches!(err, ApplicationError::Conflict(_)));
    assert_eq!(err.to_string(), "User with email a@b.com already exists");
    assert_eq!(storage.users.count().await, 1);
}

#[tokio::test]
async fn store_failure_surfaces_as_repository_error() {
    let storage = MemoryStorage::new();
    storage.boards.set_unavailable(true);

    let err = board_service(&storage).list_boards().await.unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.code(), "DATABASE_ERROR");
}

#[tokio::test]
async fn boards_are_listed_in_insertion_order() {
    let storage = MemoryStorage::new();
    let service = board_service(&storage);
    for name in ["General", "Random"] {
        service
            .create_board(CreateBoardRequest {
                name: name.into(),
                created_by: "ghost-user".into(),
            })
            .await
            .unwrap();
    }

    let boards = service.list_boards().await.unwrap();
    let names: Vec<_> = boards.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["General", "Random"]);
    assert_eq!(boards[0].created_by, "ghost-user");
}

#[tokio::test]
async fn messages_are_scoped_to_their_board() {
    let storage = MemoryStorage::new();
    let service = message_service(&storage);
    service.create_message(post("board-1", "first")).await.unwrap();
    service.create_message(post("board-2", "other")).await.unwrap();
    service.create_message(post("board-1", "second")).await.unwrap();

    let messages = service.list_messages("board-1").await.unwrap();
    let topics: Vec<_> = messages.iter().map(|m| m.topic.as_str()).collect();
    assert_eq!(topics, vec!["first", "second"]);
    assert!(service.list_messages("board-404").await.unwrap().is_empty());
}

#[tokio::test]
async fn subscribe_overwrites_bare_connection() {
    let storage = MemoryStorage::new();
    let service = connection_service(&storage, None);

    service.store_connection("c-1").await.unwrap();
    assert!(service.connections_for_board("board-1").await.unwrap().is_empty());

    service
        .subscribe_to_board("c-1", "board-1", Some("user-1".into()))
        .await
        .unwrap();
    let connections = service.connections_for_board("board-1").await.unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].user_id.as_deref(), Some("user-1"));
    assert_eq!(storage.connections.count().await, 1);

    service.remove_connection("c-1").await.unwrap();
    assert_eq!(storage.connections.count().await, 0);
}

#[tokio::test]
async fn send_without_gateway_is_skipped() {
    let storage = MemoryStorage::new();
    let service = connection_service(&storage, None);
    let event = ServerEvent::SubscriptionConfirmed {
        board_id: "board-1".into(),
        connection_id: "c-1".into(),
    };
    assert!(service.send_to_connection("c-1", &event).await.is_ok());
}

#[tokio::test]
async fn gone_connection_is_removed_and_error_returned() {
    let storage = MemoryStorage::new();
    let mut gateway = MockConnectionGateway::new();
    gateway
        .expect_post_to_connection()
        .times(1)
        .returning(|connection_id, _| {
            Err(GatewayError::Gone {
                connection_id: connection_id.to_string(),
            })
        });
    let service = connection_service(&storage, Some(Arc::new(gateway)));
    service
        .subscribe_to_board("c-1", "board-1", None)
        .await
        .unwrap();

    let event = ServerEvent::SubscriptionConfirmed {
        board_id: "board-1".into(),
        connection_id: "c-1".into(),
    };
    let err = service.send_to_connection("c-1", &event).await.unwrap_err();

    assert!(matches!(err, ApplicationError::Gateway(GatewayError::Gone { .. })));
    assert_eq!(storage.connections.count().await, 0);
}

#[tokio::test]
async fn broadcast_with_no_subscribers_sends_nothing() {
    let storage = MemoryStorage::new();
    let mut gateway = MockConnectionGateway::new();
    gateway.expect_post_to_connection().never();
    let broadcaster = Broadcaster::new(connection_service(&storage, Some(Arc::new(gateway))));

    let message = message_service(&storage)
        .create_message(post("board-1", "hello"))
        .await
        .unwrap();
    let report = broadcaster
        .broadcast_to_board("board-1", &ServerEvent::new_message(message))
        .await
        .unwrap();

    assert_eq!(report.attempted, 0);
}

#[tokio::test]
async fn broadcast_removes_stale_connection_and_keeps_delivering() {
    let storage = MemoryStorage::new();
    let gateway = Arc::new(RecordingGateway::new());
    let now = Utc::now();
    for id in ["c-1", "c-2", "c-3"] {
        storage
            .connections
            .put(WebSocketConnection::subscribed(id, "board-1", None, now))
            .await
            .unwrap();
    }
    gateway.mark_gone("c-2").await;
    gateway.mark_failing("c-3").await;

    let broadcaster = Broadcaster::new(connection_service(&storage, Some(gateway.clone())));
    let message = message_service(&storage)
        .create_message(post("board-1", "hello"))
        .await
        .unwrap();
    let report = broadcaster
        .broadcast_to_board("board-1", &ServerEvent::new_message(message))
        .await
        .unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.stale_removed, 1);
    assert_eq!(report.failed, 1);

    let remaining: Vec<_> = storage
        .connections
        .list_by_board("board-1")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.connection_id)
        .collect();
    assert_eq!(remaining, vec!["c-1".to_string(), "c-3".to_string()]);

    let frames = gateway.sent_to("c-1").await;
    assert_eq!(frames.len(), 1);
    let frame: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(frame["type"], "message");
    assert_eq!(frame["message"]["topic"], "hello");
}
