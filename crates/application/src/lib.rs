//! 应用层实现。
//!
//! 这里提供围绕领域模型的存储适配服务、事件信封解析、异步批处理器和
//! WebSocket 广播，并以 trait 抽象外部协作者（实体存储、事件发布、
//! 连接网关、时钟）。

pub mod broadcast;
pub mod clock;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod processors;
pub mod publisher;
pub mod repository;
pub mod services;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use clock::{Clock, FixedClock, SystemClock};
pub use envelope::{parse_record, MessageParsingError, RecordSource, TransportRecord};
pub use error::ApplicationError;
pub use gateway::{ConnectionGateway, GatewayError};
pub use processors::{BatchReport, EventKind, ProcessingError, Processors, RecordOutcome};
pub use publisher::{EventPublisher, PublishError, PublishTarget, TargetKind};
pub use repository::{BoardRepository, ConnectionRepository, MessageRepository, UserRepository};
pub use services::{
    BoardService, BoardServiceDependencies, ConnectionService, ConnectionServiceDependencies,
    MessageService, MessageServiceDependencies, UserService, UserServiceDependencies,
};
