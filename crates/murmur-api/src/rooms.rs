use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use murmur_types::RoomId;
use murmur_types::api::{ChatroomQuery, ChatroomResponse, CreateChatroomRequest};

use crate::state::AppState;

/// GET /chatrooms?q=
pub async fn list_chatrooms(
    State(state): State<AppState>,
    Query(query): Query<ChatroomQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Collect under the store lock, then release it before asking the
    // responder, so the two locks are never held together.
    let rooms = {
        let store = state.lock_store()?;
        store
            .search_chatrooms(query.q.as_deref().unwrap_or_default())
            .into_iter()
            .cloned()
            .collect::<Vec<_>>()
    };

    let rooms: Vec<ChatroomResponse> = rooms
        .into_iter()
        .map(|room| ChatroomResponse {
            typing: state.responder.is_typing(room.id),
            room,
        })
        .collect();

    Ok(Json(rooms))
}

/// POST /chatrooms
pub async fn create_chatroom(
    State(state): State<AppState>,
    Json(req): Json<CreateChatroomRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.title.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let room = {
        let mut store = state.lock_store()?;
        let id = store.add_chatroom(req.title).into_value();
        store.require_chatroom(id).cloned().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    };

    info!(room_id = %room.id, "Chatroom created: {}", room.title);
    Ok((
        StatusCode::CREATED,
        Json(ChatroomResponse {
            room,
            typing: false,
        }),
    ))
}

/// GET /chatrooms/{room_id}
pub async fn get_chatroom(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
) -> Result<impl IntoResponse, StatusCode> {
    let room = state
        .lock_store()?
        .chatroom(room_id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ChatroomResponse {
        typing: state.responder.is_typing(room.id),
        room,
    }))
}

/// DELETE /chatrooms/{room_id}. Deleting an unknown room is not an error.
pub async fn delete_chatroom(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
) -> Result<impl IntoResponse, StatusCode> {
    state.responder.cancel(room_id);

    let removed = state.lock_store()?.delete_chatroom(room_id).into_value();
    if removed {
        info!(room_id = %room_id, "Chatroom deleted");
    }

    Ok(StatusCode::NO_CONTENT)
}
