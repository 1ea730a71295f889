pub mod api;
pub mod models;

pub use models::{Chatroom, Message, MessageId, RoomId, Sender, StoreState};
