use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::FieldViolation;
use serde::Serialize;
use serde_json::json;

use crate::response::ApiResponse;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldViolation>,
}

/// 处理函数返回的错误，携带状态码和原因链
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
    causes: Vec<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
                code,
                details: Vec::new(),
            },
            causes: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 记录底层原因及其 `source()` 链，只写入日志
    pub fn with_cause(mut self, cause: &(dyn std::error::Error + 'static)) -> Self {
        let mut current = Some(cause);
        while let Some(err) = current {
            self.causes.push(err.to_string());
            current = err.source();
        }
        self
    }

    pub fn with_details(mut self, details: Vec<FieldViolation>) -> Self {
        self.body.details = details;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.body.message
    }

    pub fn code(&self) -> &'static str {
        self.body.code
    }

    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    /// 统一的错误信封 `{success: false, error: {message, code}}`
    pub fn to_response(&self) -> ApiResponse {
        ApiResponse::new(
            self.status,
            json!({
                "success": false,
                "error": &self.body,
            }),
        )
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let api_error = match &error {
            ApplicationError::Validation(validation) => {
                ApiError::new(status, error.code(), "Request validation failed")
                    .with_details(validation.violations.clone())
            }
            _ => ApiError::new(status, error.code(), error.to_string()),
        };
        api_error.with_cause(&error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_response().into_response()
    }
}
