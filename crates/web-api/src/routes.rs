use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{handlers, state::AppState, ws_connection::websocket_upgrade};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api_routes())
        .route("/ws", get(websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::register_user))
        .route("/users/{email}", get(handlers::get_user_by_email))
        .route(
            "/boards",
            post(handlers::create_board).get(handlers::list_boards),
        )
        .route(
            "/boards/{boardId}/messages",
            post(handlers::post_message).get(handlers::list_messages),
        )
}
