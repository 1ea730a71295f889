use serde::{Deserialize, Serialize};

use crate::models::{Chatroom, Message};

// -- Chatrooms --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChatroomRequest {
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatroomQuery {
    /// Case-insensitive title filter.
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatroomResponse {
    #[serde(flatten)]
    pub room: Chatroom,
    /// True while an AI reply is pending for this room.
    pub typing: bool,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// `data:<mime>;base64,<payload>`
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

// -- Countries --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub name: String,
    pub dial_code: String,
    pub flag_url: Option<String>,
}
