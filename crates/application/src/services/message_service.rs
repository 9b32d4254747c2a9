use std::sync::Arc;

use domain::{IdGenerator, Message, PostMessageRequest};

use crate::{clock::Clock, error::ApplicationError, repository::MessageRepository};

pub struct MessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub id_generator: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    /// 写入留言，不校验留言板是否存在
    pub async fn create_message(
        &self,
        request: PostMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let message = Message::post(self.deps.id_generator.generate(), request, self.deps.clock.now());
        self.deps.message_repository.insert(message.clone()).await?;
        Ok(message)
    }

    pub async fn list_messages(&self, board_id: &str) -> Result<Vec<Message>, ApplicationError> {
        Ok(self.deps.message_repository.list_by_board(board_id).await?)
    }
}
