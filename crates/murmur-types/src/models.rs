use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RoomId = Uuid;
pub type MessageId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chatroom {
    pub id: RoomId,
    pub title: String,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    #[default]
    User,
    Ai,
}

/// A single chat message. `image` is a data URL and is never inspected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn has_content(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty()) || self.image.is_some()
    }
}

/// Full chat state as it is persisted and rehydrated.
///
/// `messages` holds one list per room, oldest first. Lists for rooms that
/// were never created may exist (appends are permissive), but deleting a
/// room always drops its list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub chatrooms: Vec<Chatroom>,
    #[serde(default)]
    pub messages: HashMap<RoomId, Vec<Message>>,
}

impl StoreState {
    pub fn is_empty(&self) -> bool {
        self.chatrooms.is_empty() && self.messages.is_empty()
    }
}
