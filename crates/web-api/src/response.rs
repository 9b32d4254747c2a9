//! 响应信封与错误处理包装

use std::future::Future;
use std::time::Instant;

use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::{error::ApiError, request::ApiRequest};

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// `{success: true, data}`
    pub fn success<T: Serialize>(data: &T, status: StatusCode) -> Result<Self, ApiError> {
        let data = serde_json::to_value(data).map_err(ApplicationError::from)?;
        Ok(Self::new(status, json!({ "success": true, "data": data })))
    }

    /// 已受理的异步写请求
    pub fn accepted(message: &str) -> Self {
        Self::new(
            StatusCode::ACCEPTED,
            json!({ "success": true, "data": { "message": message } }),
        )
    }

    /// 不带信封的旧格式响应
    pub fn bare<T: Serialize>(data: &T, status: StatusCode) -> Result<Self, ApiError> {
        let body = serde_json::to_value(data).map_err(ApplicationError::from)?;
        Ok(Self::new(status, body))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// 包装一个处理函数：记录请求，执行，记录结果；失败时记录原因链并转换为错误信封
pub async fn with_error_handling<F, Fut>(
    operation: &'static str,
    request: ApiRequest,
    handler: F,
) -> ApiResponse
where
    F: FnOnce(ApiRequest) -> Fut,
    Fut: Future<Output = Result<ApiResponse, ApiError>>,
{
    let request_id = request.request_id.clone();
    let started = Instant::now();
    info!(
        operation,
        request_id = %request_id,
        method = %request.method,
        path = %request.path,
        path_params = ?request.path_params,
        connection_id = ?request.connection_id,
        "API request"
    );

    match handler(request).await {
        Ok(response) => {
            info!(
                operation,
                request_id = %request_id,
                status = response.status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "API success"
            );
            response
        }
        Err(err) => {
            error!(
                operation,
                request_id = %request_id,
                status = err.status().as_u16(),
                code = err.code(),
                error = %err.message(),
                causes = ?err.causes(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "API error"
            );
            err.to_response()
        }
    }
}
