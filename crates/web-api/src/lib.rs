//! Web API 层。
//!
//! 提供 Axum 路由：写请求校验后发布到主题或队列，读请求直接查询存储，
//! WebSocket 连接的建立、订阅和断开也以同一套处理函数实现。

mod error;
mod handlers;
mod request;
mod response;
mod routes;
mod state;
mod ws_connection;

pub use error::{ApiError, ErrorBody};
pub use handlers::{websocket_connect, websocket_disconnect, websocket_subscribe};
pub use request::{ApiRequest, REQUEST_ID_HEADER};
pub use response::{with_error_handling, ApiResponse};
pub use routes::router;
pub use state::AppState;
