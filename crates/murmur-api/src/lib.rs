pub mod countries;
pub mod messages;
pub mod responder;
pub mod rooms;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

pub use state::{AppState, AppStateInner, SharedStore};

/// Room for a 10 MB image once base64 and JSON overhead are added.
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/countries", get(countries::list_countries))
        .route(
            "/chatrooms",
            get(rooms::list_chatrooms).post(rooms::create_chatroom),
        )
        .route(
            "/chatrooms/{room_id}",
            get(rooms::get_chatroom).delete(rooms::delete_chatroom),
        )
        .route(
            "/chatrooms/{room_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route(
            "/chatrooms/{room_id}/messages/older",
            post(messages::load_older_messages),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}
