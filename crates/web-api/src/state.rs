use std::sync::Arc;

use application::{BoardService, ConnectionService, EventPublisher, MessageService, UserService};
use config::ResourceConfig;
use infrastructure::LocalConnectionGateway;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub board_service: Arc<BoardService>,
    pub message_service: Arc<MessageService>,
    pub connection_service: Arc<ConnectionService>,
    pub publisher: Arc<dyn EventPublisher>,
    pub gateway: Arc<LocalConnectionGateway>,
    /// 处理请求时读取，缺失的主题/队列在调用时才报错
    pub resources: Arc<ResourceConfig>,
}
