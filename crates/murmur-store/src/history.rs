use chrono::Utc;
use murmur_types::{Message, RoomId, Sender};
use uuid::Uuid;

/// Number of messages in one page of older history.
pub const PAGE_SIZE: usize = 10;

pub const PLACEHOLDER_TEXT: &str = "Old message...";

/// Source of older messages for a room.
///
/// `oldest` is the head of the currently loaded list and acts as the
/// pagination cursor. The returned page is ordered oldest first and is
/// prepended to the room as one block.
pub trait HistorySource: Send + Sync {
    fn older_page(&self, room_id: RoomId, oldest: Option<&Message>) -> Vec<Message>;
}

/// Generates placeholder messages instead of reading real history.
#[derive(Debug, Clone)]
pub struct SyntheticHistory {
    page_size: usize,
}

impl SyntheticHistory {
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }
}

impl Default for SyntheticHistory {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl HistorySource for SyntheticHistory {
    fn older_page(&self, _room_id: RoomId, _oldest: Option<&Message>) -> Vec<Message> {
        (0..self.page_size)
            .map(|_| Message {
                id: Uuid::new_v4(),
                text: Some(PLACEHOLDER_TEXT.to_string()),
                image: None,
                sender: Sender::User,
                timestamp: Utc::now(),
            })
            .collect()
    }
}
