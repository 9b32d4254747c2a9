//! 处理函数的统一入参

use std::collections::HashMap;

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequest, FromRequestParts, RawPathParams},
    http::{Method, Request},
};
use domain::{parse_payload, ValidationError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// HTTP 请求和 WebSocket 帧共用的请求上下文
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    /// 已经过百分号解码
    pub path_params: HashMap<String, String>,
    pub body: Option<String>,
    /// 仅 WebSocket 请求携带
    pub connection_id: Option<String>,
}

impl ApiRequest {
    /// 为 WebSocket 连接上的一次调用构造请求
    pub fn for_connection(connection_id: &str, body: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method: Method::GET,
            path: "/ws".to_string(),
            path_params: HashMap::new(),
            body,
            connection_id: Some(connection_id.to_string()),
        }
    }

    pub fn path_param(&self, name: &str) -> Result<String, ApiError> {
        match self.path_params.get(name) {
            Some(value) if !value.trim().is_empty() => Ok(value.clone()),
            _ => Err(ApiError::bad_request(format!("{name} parameter is required"))),
        }
    }

    pub fn connection_id(&self) -> Result<String, ApiError> {
        self.connection_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::bad_request("Connection ID not found"))
    }

    /// 取出 JSON 请求体，不做 schema 校验
    pub fn json_value(&self) -> Result<Value, ApiError> {
        let body = match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => body,
            _ => return Err(ApiError::bad_request("Request body is required")),
        };
        serde_json::from_str(body)
            .map_err(|err| ApiError::bad_request("Invalid JSON in request body").with_cause(&err))
    }

    /// 解析并校验请求体
    pub fn validated_body<T>(&self) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Validate,
    {
        let value = self.json_value()?;
        parse_payload(value).map_err(validation_failed)
    }
}

pub(crate) fn validation_failed(error: ValidationError) -> ApiError {
    ApiError::bad_request("Request validation failed")
        .with_details(error.violations.clone())
        .with_cause(&error)
}

impl<S> FromRequest<S> for ApiRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = request.into_parts();

        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let path_params = match RawPathParams::from_request_parts(&mut parts, state).await {
            Ok(params) => params
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            Err(_) => HashMap::new(),
        };

        let bytes = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|err| ApiError::bad_request("Request body is too large").with_cause(&err))?;
        let body = if bytes.is_empty() {
            None
        } else {
            Some(String::from_utf8(bytes.to_vec()).map_err(|err| {
                ApiError::bad_request("Invalid JSON in request body").with_cause(&err)
            })?)
        };

        Ok(Self {
            request_id,
            method: parts.method,
            path: parts.uri.path().to_string(),
            path_params,
            body,
            connection_id: None,
        })
    }
}
