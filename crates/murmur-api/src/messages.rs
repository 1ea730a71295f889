use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::debug;

use murmur_store::NewMessage;
use murmur_types::RoomId;
use murmur_types::api::{MessagesResponse, SendMessageRequest};

use crate::state::AppState;

/// 10 MB limit for decoded images
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Accepts `data:image/<subtype>;base64,<payload>` with a decodable payload.
fn validate_image(data_url: &str) -> Result<(), StatusCode> {
    let rest = data_url.strip_prefix("data:").ok_or(StatusCode::BAD_REQUEST)?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or(StatusCode::BAD_REQUEST)?;
    if !mime.starts_with("image/") || payload.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    if payload.len() / 4 * 3 > MAX_IMAGE_SIZE {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }

    B64.decode(payload).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(())
}

/// GET /chatrooms/{room_id}/messages
pub async fn get_messages(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.lock_store()?;
    store
        .require_chatroom(room_id)
        .map_err(|_| StatusCode::NOT_FOUND)?;

    Ok(Json(MessagesResponse {
        messages: store.messages(room_id).to_vec(),
    }))
}

/// POST /chatrooms/{room_id}/messages. Appends a user message and queues
/// the AI reply.
pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let text = req.text.as_deref().map(str::trim).unwrap_or_default();
    let image = req.image.filter(|i| !i.is_empty());
    if text.is_empty() && image.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if let Some(image) = &image {
        validate_image(image)?;
    }

    let mut draft = NewMessage::user(text);
    draft.image = image;

    let message = {
        let mut store = state.lock_store()?;
        store
            .require_chatroom(room_id)
            .map_err(|_| StatusCode::NOT_FOUND)?;

        let id = store.send_message(room_id, draft).into_value();
        store
            .messages(room_id)
            .iter()
            .rev()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?
    };

    state.responder.schedule(room_id);

    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /chatrooms/{room_id}/messages/older. Prepends one page of older
/// messages and returns that page.
pub async fn load_older_messages(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut store = state.lock_store()?;
    store
        .require_chatroom(room_id)
        .map_err(|_| StatusCode::NOT_FOUND)?;

    let count = store.load_older_messages(room_id).into_value();
    debug!(room_id = %room_id, count, "Served older messages");

    Ok(Json(MessagesResponse {
        messages: store.messages(room_id)[..count].to_vec(),
    }))
}
