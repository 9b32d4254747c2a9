use std::sync::Arc;

use domain::{Board, CreateBoardRequest, IdGenerator};

use crate::{clock::Clock, error::ApplicationError, repository::BoardRepository};

pub struct BoardServiceDependencies {
    pub board_repository: Arc<dyn BoardRepository>,
    pub id_generator: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

pub struct BoardService {
    deps: BoardServiceDependencies,
}

impl BoardService {
    pub fn new(deps: BoardServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create_board(&self, request: CreateBoardRequest) -> Result<Board, ApplicationError> {
        let board = Board::create(self.deps.id_generator.generate(), request, self.deps.clock.now());
        self.deps.board_repository.insert(board.clone()).await?;
        Ok(board)
    }

    pub async fn list_boards(&self) -> Result<Vec<Board>, ApplicationError> {
        Ok(self.deps.board_repository.list_all().await?)
    }
}
