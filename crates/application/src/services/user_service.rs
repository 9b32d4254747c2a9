use std::sync::Arc;

use domain::{IdGenerator, RegisterUserRequest, User};
use tracing::info;

use crate::{clock::Clock, error::ApplicationError, repository::UserRepository};

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub id_generator: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    /// 创建用户。
    ///
    /// 写入前先按邮箱查询，但“查询再写入”不是原子操作，并发的重复注册可能都通过检查。
    pub async fn create_user(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        if self
            .deps
            .user_repository
            .find_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(ApplicationError::Conflict(format!(
                "User with email {} already exists",
                request.email
            )));
        }

        let user = User::register(self.deps.id_generator.generate(), request, self.deps.clock.now());
        self.deps.user_repository.insert(user.clone()).await?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApplicationError> {
        let user = self.deps.user_repository.find_by_email(email).await?;
        if user.is_none() {
            info!(email, "user not found");
        }
        Ok(user)
    }
}
