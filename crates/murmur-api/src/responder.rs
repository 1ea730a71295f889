use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use murmur_store::NewMessage;
use murmur_types::RoomId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::state::SharedStore;

pub const DEFAULT_REPLY_TEXT: &str = "Gemini AI received your message!";
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct ReplyConfig {
    pub delay: Duration,
    pub text: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_REPLY_DELAY,
            text: DEFAULT_REPLY_TEXT.to_string(),
        }
    }
}

/// Replies pending for one room. All of them share `token`, so a room's
/// replies are cancelled together.
struct PendingReplies {
    token: CancellationToken,
    generation: u64,
    count: usize,
}

/// Posts a canned AI reply to a room some time after each user message.
///
/// Replies run on their own tokio tasks and reach the store only through
/// its public operations.
#[derive(Clone)]
pub struct AutoResponder {
    inner: Arc<ResponderInner>,
}

struct ResponderInner {
    store: SharedStore,
    config: ReplyConfig,
    pending: Mutex<HashMap<RoomId, PendingReplies>>,
    next_generation: AtomicU64,
}

impl AutoResponder {
    pub fn new(store: SharedStore, config: ReplyConfig) -> Self {
        Self {
            inner: Arc::new(ResponderInner {
                store,
                config,
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Queues one reply for `room_id`. Must be called from within a tokio runtime.
    pub fn schedule(&self, room_id: RoomId) {
        let Some((token, generation)) = self.inner.register(room_id) else {
            return;
        };

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(room_id = %room_id, "AI reply cancelled");
                    return;
                }
                _ = tokio::time::sleep(inner.config.delay) => {}
            }

            inner.deliver(room_id, &token);
            inner.settle(room_id, generation);
        });
    }

    /// Drops every reply still pending for `room_id`. Returns how many were dropped.
    pub fn cancel(&self, room_id: RoomId) -> usize {
        let Ok(mut pending) = self.inner.pending.lock() else {
            error!("Reply registry lock poisoned");
            return 0;
        };
        match pending.remove(&room_id) {
            Some(replies) => {
                replies.token.cancel();
                debug!(room_id = %room_id, count = replies.count, "Pending AI replies cancelled");
                replies.count
            }
            None => 0,
        }
    }

    /// True while at least one reply is pending for the room.
    pub fn is_typing(&self, room_id: RoomId) -> bool {
        self.inner
            .pending
            .lock()
            .map(|pending| pending.get(&room_id).is_some_and(|r| r.count > 0))
            .unwrap_or(false)
    }
}

impl ResponderInner {
    fn register(&self, room_id: RoomId) -> Option<(CancellationToken, u64)> {
        let Ok(mut pending) = self.pending.lock() else {
            error!("Reply registry lock poisoned");
            return None;
        };
        let replies = pending.entry(room_id).or_insert_with(|| PendingReplies {
            token: CancellationToken::new(),
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            count: 0,
        });
        replies.count += 1;
        Some((replies.token.child_token(), replies.generation))
    }

    fn deliver(&self, room_id: RoomId, token: &CancellationToken) {
        let Ok(mut store) = self.store.lock() else {
            error!("Chat store lock poisoned, dropping AI reply");
            return;
        };
        // The room may have been deleted while the reply was waiting; appending
        // now would recreate its message list.
        if token.is_cancelled() || store.chatroom(room_id).is_none() {
            debug!(room_id = %room_id, "AI reply skipped, room gone");
            return;
        }
        store.send_message(room_id, NewMessage::ai(self.config.text.clone()));
    }

    fn settle(&self, room_id: RoomId, generation: u64) {
        let Ok(mut pending) = self.pending.lock() else {
            error!("Reply registry lock poisoned");
            return;
        };
        if let Some(replies) = pending.get_mut(&room_id) {
            if replies.generation != generation {
                return;
            }
            replies.count = replies.count.saturating_sub(1);
            if replies.count == 0 {
                pending.remove(&room_id);
            }
        }
    }
}
