//! 主应用程序入口
//!
//! 启动 HTTP / WebSocket 服务，并在同一进程内运行三个批处理消费者。

use std::sync::Arc;

use application::{
    memory::MemoryStorage, BoardRepository, BoardService, BoardServiceDependencies, Broadcaster,
    Clock, ConnectionGateway, ConnectionRepository, ConnectionService,
    ConnectionServiceDependencies, EventKind, EventPublisher, MessageRepository, MessageService,
    MessageServiceDependencies, Processors, PublishTarget, SystemClock, UserRepository,
    UserService, UserServiceDependencies,
};
use config::{AppConfig, StoreBackend};
use domain::{IdGenerator, UuidIdGenerator};
use infrastructure::{
    create_pg_pool, ensure_schema, LocalConnectionGateway, PgStorage, RedisStreamConsumer,
    RedisStreamPublisher, TableNames,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

struct Repositories {
    users: Arc<dyn UserRepository>,
    boards: Arc<dyn BoardRepository>,
    messages: Arc<dyn MessageRepository>,
    connections: Arc<dyn ConnectionRepository>,
}

async fn build_repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let pool =
                create_pg_pool(&config.database.url, config.database.max_connections).await?;
            let tables = TableNames::from(&config.resources);
            ensure_schema(&pool, &tables).await?;
            let storage = PgStorage::new(pool, &tables);
            Ok(Repositories {
                users: storage.user_repository,
                boards: storage.board_repository,
                messages: storage.message_repository,
                connections: storage.connection_repository,
            })
        }
        StoreBackend::Memory => {
            warn!("using in-memory store, data is lost on restart");
            let storage = MemoryStorage::new();
            Ok(Repositories {
                users: storage.users,
                boards: storage.boards,
                messages: storage.messages,
                connections: storage.connections,
            })
        }
    }
}

/// 为每个已配置的主题 / 队列启动一个消费任务
fn spawn_consumers(
    consumer: Arc<RedisStreamConsumer>,
    config: &AppConfig,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let resources = &config.resources;
    let sources = [
        (
            EventKind::UserRegistration,
            resources
                .require_user_registration_topic()
                .map(PublishTarget::topic),
        ),
        (
            EventKind::BoardCreation,
            resources
                .require_board_creation_queue()
                .map(PublishTarget::queue),
        ),
        (
            EventKind::MessagePosting,
            resources
                .require_message_posting_topic()
                .map(PublishTarget::topic),
        ),
    ];

    let mut handles = Vec::new();
    for (kind, source) in sources {
        let source = match source {
            Ok(source) => source,
            Err(e) => {
                warn!(event_kind = kind.as_str(), error = %e, "consumer not started");
                continue;
            }
        };
        let consumer = consumer.clone();
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = consumer.run(kind, source, shutdown).await {
                error!(event_kind = kind.as_str(), error = %e, "consumer exited");
            }
        }));
    }
    handles
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    info!(config = %config.sanitize(), "configuration loaded");
    if let Some(region) = &config.resources.region {
        info!(region = %region, "deployment region");
    }
    if let Some(url) = config.resources.websocket_callback_url() {
        info!(url = %url, "websocket callback endpoint");
    }

    let repositories = build_repositories(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdGenerator> = Arc::new(UuidIdGenerator);
    let gateway = Arc::new(LocalConnectionGateway::new());

    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: repositories.users,
        id_generator: ids.clone(),
        clock: clock.clone(),
    }));
    let board_service = Arc::new(BoardService::new(BoardServiceDependencies {
        board_repository: repositories.boards,
        id_generator: ids.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository: repositories.messages,
        id_generator: ids,
        clock: clock.clone(),
    }));
    let connection_service = Arc::new(ConnectionService::new(ConnectionServiceDependencies {
        connection_repository: repositories.connections,
        gateway: Some(gateway.clone() as Arc<dyn ConnectionGateway>),
        clock,
    }));

    let publisher: Arc<dyn EventPublisher> =
        Arc::new(RedisStreamPublisher::connect(&config.redis.url).await?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut consumers = Vec::new();
    if config.consumer.enabled {
        let processors = Arc::new(Processors::new(
            user_service.clone(),
            board_service.clone(),
            message_service.clone(),
            Arc::new(Broadcaster::new(connection_service.clone())),
        ));
        let connection = redis::Client::open(config.redis.url.as_str())?
            .get_connection_manager()
            .await?;
        let consumer = Arc::new(RedisStreamConsumer::new(
            connection,
            processors,
            &config.consumer,
        ));
        consumers = spawn_consumers(consumer, &config, &shutdown_rx);
    }

    let state = AppState {
        user_service,
        board_service,
        message_service,
        connection_service,
        publisher,
        gateway,
        resources: Arc::new(config.resources.clone()),
    };

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("message board listening on http://{}", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    for handle in consumers {
        if let Err(e) = handle.await {
            warn!(error = %e, "consumer task panicked");
        }
    }
    info!("message board stopped");
    Ok(())
}
