use murmur_db::PersistenceError;
use murmur_types::RoomId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chatroom not found: {0}")]
    NotFound(RoomId),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
