mod board_service;
mod connection_service;
mod message_service;
mod user_service;

#[cfg(test)]
mod services_tests;

pub use board_service::{BoardService, BoardServiceDependencies};
pub use connection_service::{ConnectionService, ConnectionServiceDependencies};
pub use message_service::{MessageService, MessageServiceDependencies};
pub use user_service::{UserService, UserServiceDependencies};
