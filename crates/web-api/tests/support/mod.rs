#![allow(dead_code)]

use std::sync::Arc;

use application::memory::{MemoryStorage, RecordingPublisher};
use application::{
    BoardService, BoardServiceDependencies, ConnectionGateway, ConnectionService, ConnectionServiceDependencies,
    MessageService, MessageServiceDependencies, SystemClock, UserService, UserServiceDependencies,
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use config::ResourceConfig;
use domain::SequentialIdGenerator;
use infrastructure::LocalConnectionGateway;
use serde_json::Value;
use tower::ServiceExt;
use web_api::{router, AppState};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub storage: MemoryStorage,
    pub publisher: Arc<RecordingPublisher>,
    pub gateway: Arc<LocalConnectionGateway>,
}

pub fn configured_resources() -> ResourceConfig {
    ResourceConfig {
        user_registration_topic: Some("user-registration".into()),
        board_creation_queue: Some("board-creation".into()),
        message_posting_topic: Some("message-posting".into()),
        users_table: "users".into(),
        boards_table: "boards".into(),
        messages_table: "messages".into(),
        connections_table: "websocket_connections".into(),
        ..Default::default()
    }
}

pub fn build_app(resources: ResourceConfig) -> TestApp {
    let storage = MemoryStorage::new();
    let publisher = Arc::new(RecordingPublisher::new());
    let gateway = Arc::new(LocalConnectionGateway::with_id_generator(Arc::new(
        SequentialIdGenerator::new("conn"),
    )));
    let clock = Arc::new(SystemClock);

    let state = AppState {
        user_service: Arc::new(UserService::new(UserServiceDependencies {
            user_repository: storage.users.clone(),
            id_generator: Arc::new(SequentialIdGenerator::new("user")),
            clock: clock.clone(),
        })),
        board_service: Arc::new(BoardService::new(BoardServiceDependencies {
            board_repository: storage.boards.clone(),
            id_generator: Arc::new(SequentialIdGenerator::new("board")),
            clock: clock.clone(),
        })),
        message_service: Arc::new(MessageService::new(MessageServiceDependencies {
            message_repository: storage.messages.clone(),
            id_generator: Arc::new(SequentialIdGenerator::new("message")),
            clock: clock.clone(),
        })),
        connection_service: Arc::new(ConnectionService::new(ConnectionServiceDependencies {
            connection_repository: storage.connections.clone(),
            gateway: Some(gateway.clone() as Arc<dyn ConnectionGateway>),
            clock,
        })),
        publisher: publisher.clone(),
        gateway: gateway.clone(),
        resources: Arc::new(resources),
    };

    TestApp {
        router: router(state.clone()),
        state,
        storage,
        publisher,
        gateway,
    }
}

pub async fn send(router: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .expect("request");

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}
