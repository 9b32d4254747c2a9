use config::ConfigError;
use domain::{RepositoryError, ValidationError};
use thiserror::Error;

use crate::{gateway::GatewayError, publisher::PublishError};

/// 应用层错误，每个变体对应一个 HTTP 状态码
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApplicationError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Configuration(_)
            | Self::Repository(_)
            | Self::Publish(_)
            | Self::Gateway(_)
            | Self::Serialization(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Repository(_) => "DATABASE_ERROR",
            Self::Publish(_) => "PUBLISH_ERROR",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
