//! 同步请求处理函数
//!
//! 写请求只做校验并发布到主题或队列，实际写入由批处理器完成；
//! 读请求直接查询存储。

use application::{ApplicationError, PublishTarget};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{
    parse_payload, validate_board_id_param, validate_email_param, CreateBoardRequest,
    PostMessageRequest, RegisterUserRequest, ServerEvent, WebSocketAction,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    error::ApiError,
    request::{validation_failed, ApiRequest},
    response::{with_error_handling, ApiResponse},
    state::AppState,
};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

async fn publish<T: Serialize>(
    state: &AppState,
    target: PublishTarget,
    payload: &T,
) -> Result<String, ApiError> {
    let body = serde_json::to_string(payload).map_err(ApplicationError::from)?;
    let message_id = state
        .publisher
        .publish(&target, body)
        .await
        .map_err(ApplicationError::from)?;
    info!(%target, message_id = %message_id, "request forwarded");
    Ok(message_id)
}

pub async fn register_user(State(state): State<AppState>, request: ApiRequest) -> Response {
    with_error_handling("registerUser", request, |request| async move {
        let payload: RegisterUserRequest = request.validated_body()?;
        let topic = state
            .resources
            .require_user_registration_topic()
            .map_err(ApplicationError::from)?;
        publish(&state, PublishTarget::topic(topic), &payload).await?;
        Ok(ApiResponse::accepted("User registration request is accepted."))
    })
    .await
    .into_response()
}

pub async fn get_user_by_email(State(state): State<AppState>, request: ApiRequest) -> Response {
    with_error_handling("getUserByEmail", request, |request| async move {
        let email = request.path_param("email")?;
        let email = validate_email_param(&email)
            .map_err(|err| ApiError::bad_request("Invalid email format").with_cause(&err))?;

        match state.user_service.get_user_by_email(&email).await? {
            Some(user) => ApiResponse::bare(&user, StatusCode::OK),
            None => Err(ApplicationError::not_found(format!(
                "User with email {email} not found"
            ))
            .into()),
        }
    })
    .await
    .into_response()
}

pub async fn create_board(State(state): State<AppState>, request: ApiRequest) -> Response {
    with_error_handling("createBoard", request, |request| async move {
        let payload: CreateBoardRequest = request.validated_body()?;
        let queue = state
            .resources
            .require_board_creation_queue()
            .map_err(ApplicationError::from)?;
        publish(&state, PublishTarget::queue(queue), &payload).await?;
        Ok(ApiResponse::accepted("Board creation request is accepted."))
    })
    .await
    .into_response()
}

pub async fn list_boards(State(state): State<AppState>, request: ApiRequest) -> Response {
    with_error_handling("listBoards", request, |_| async move {
        let boards = state.board_service.list_boards().await?;
        ApiResponse::bare(&boards, StatusCode::OK)
    })
    .await
    .into_response()
}

/// 路径中的 `boardId` 覆盖请求体中的同名字段
pub async fn post_message(State(state): State<AppState>, request: ApiRequest) -> Response {
    with_error_handling("postMessage", request, |request| async move {
        let board_id = request.path_param("boardId")?;
        let mut body = request.json_value()?;
        match body.as_object_mut() {
            Some(fields) => {
                fields.insert("boardId".to_string(), Value::String(board_id));
            }
            None => return Err(ApiError::bad_request("Request validation failed")),
        }
        let payload: PostMessageRequest = parse_payload(body).map_err(validation_failed)?;

        let topic = state
            .resources
            .require_message_posting_topic()
            .map_err(ApplicationError::from)?;
        publish(&state, PublishTarget::topic(topic), &payload).await?;
        Ok(ApiResponse::accepted("Message posting request is accepted."))
    })
    .await
    .into_response()
}

pub async fn list_messages(State(state): State<AppState>, request: ApiRequest) -> Response {
    with_error_handling("listMessages", request, |request| async move {
        let board_id = request.path_param("boardId")?;
        let board_id = validate_board_id_param(&board_id)
            .map_err(|err| ApiError::bad_request("Invalid board ID format").with_cause(&err))?;
        let messages = state.message_service.list_messages(&board_id).await?;
        ApiResponse::success(&messages, StatusCode::OK)
    })
    .await
    .into_response()
}

pub async fn websocket_connect(state: &AppState, request: ApiRequest) -> ApiResponse {
    with_error_handling("websocketConnect", request, |request| async move {
        let connection_id = request.connection_id()?;
        info!(connection_id = %connection_id, "WebSocket connection established");
        state.connection_service.store_connection(&connection_id).await?;
        ApiResponse::success(
            &json!({ "status": "connected", "connectionId": connection_id }),
            StatusCode::OK,
        )
    })
    .await
}

pub async fn websocket_disconnect(state: &AppState, request: ApiRequest) -> ApiResponse {
    with_error_handling("websocketDisconnect", request, |request| async move {
        let connection_id = request.connection_id()?;
        info!(connection_id = %connection_id, "WebSocket connection closed");
        state.connection_service.remove_connection(&connection_id).await?;
        ApiResponse::success(
            &json!({ "status": "disconnected", "connectionId": connection_id }),
            StatusCode::OK,
        )
    })
    .await
}

/// 订阅或取消订阅留言板，确认帧通过连接网关推回同一连接
pub async fn websocket_subscribe(state: &AppState, request: ApiRequest) -> ApiResponse {
    with_error_handling("websocketSubscribe", request, |request| async move {
        let connection_id = request.connection_id()?;
        let value = request.json_value()?;
        let action: WebSocketAction = parse_payload(value).map_err(|err| {
            ApiError::bad_request(format!("Invalid message format: {err}")).with_cause(&err)
        })?;

        let board_id = action.board_id().to_string();
        let connections = &state.connection_service;
        let (status, confirmation) = match action {
            WebSocketAction::Subscribe { board_id, user_id } => {
                info!(connection_id = %connection_id, board_id = %board_id, "subscribing connection to board");
                connections
                    .subscribe_to_board(&connection_id, &board_id, user_id)
                    .await?;
                (
                    "subscribed",
                    ServerEvent::SubscriptionConfirmed {
                        board_id,
                        connection_id: connection_id.clone(),
                    },
                )
            }
            WebSocketAction::Unsubscribe { board_id } => {
                info!(connection_id = %connection_id, board_id = %board_id, "unsubscribing connection from board");
                connections.remove_connection(&connection_id).await?;
                connections.store_connection(&connection_id).await?;
                (
                    "unsubscribed",
                    ServerEvent::UnsubscriptionConfirmed {
                        board_id,
                        connection_id: connection_id.clone(),
                    },
                )
            }
        };

        connections
            .send_to_connection(&connection_id, &confirmation)
            .await?;

        ApiResponse::success(
            &json!({ "status": status, "boardId": board_id, "connectionId": connection_id }),
            StatusCode::OK,
        )
    })
    .await
}
