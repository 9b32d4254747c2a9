//! 单个 WebSocket 连接的生命周期
//!
//! 升级成功后在网关登记并保存连接记录；每个文本帧交给订阅处理函数，
//! 网关推送的帧原样转发给客户端；连接关闭时删除记录并注销。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use crate::{
    handlers::{websocket_connect, websocket_disconnect, websocket_subscribe},
    request::ApiRequest,
    state::AppState,
};

pub async fn websocket_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_connection(socket, state))
}

async fn run_connection(socket: WebSocket, state: AppState) {
    let (connection_id, mut outbound) = state.gateway.register().await;
    let (mut sender, mut incoming) = socket.split();

    let connected = websocket_connect(&state, ApiRequest::for_connection(&connection_id, None)).await;
    if !connected.is_success() {
        if let Err(err) = sender
            .send(WsMessage::Text(connected.body.to_string().into()))
            .await
        {
            warn!(connection_id = %connection_id, error = %err, "failed to write websocket frame");
        }
        state.gateway.unregister(&connection_id).await;
        return;
    }

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if sender.send(WsMessage::Text(frame.into())).await.is_err() {
                    warn!(connection_id = %connection_id, "failed to write websocket frame");
                    break;
                }
            }
            message = incoming.next() => {
                match message {
                    Some(Ok(WsMessage::Text(text))) => {
                        let request = ApiRequest::for_connection(&connection_id, Some(text.as_str().to_owned()));
                        let response = websocket_subscribe(&state, request).await;
                        // 成功时确认帧已经通过网关推送
                        if !response.is_success()
                            && sender
                                .send(WsMessage::Text(response.body.to_string().into()))
                                .await
                                .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(connection_id = %connection_id, error = %err, "websocket read failed");
                        break;
                    }
                }
            }
        }
    }

    websocket_disconnect(&state, ApiRequest::for_connection(&connection_id, None)).await;
    state.gateway.unregister(&connection_id).await;
    info!(connection_id = %connection_id, "websocket connection finished");
}
