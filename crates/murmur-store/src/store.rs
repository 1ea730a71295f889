use chrono::Utc;
use murmur_db::{Persistence, PersistenceError};
use murmur_types::{Chatroom, Message, MessageId, RoomId, Sender, StoreState};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::history::{HistorySource, SyntheticHistory};

/// Result of a mutation: the operation's value plus the save failure, if
/// the snapshot that followed it could not be written. The in-memory
/// state is updated either way.
#[derive(Debug)]
pub struct Outcome<T> {
    value: T,
    warning: Option<PersistenceError>,
}

impl<T> Outcome<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn warning(&self) -> Option<&PersistenceError> {
        self.warning.as_ref()
    }

    pub fn is_durable(&self) -> bool {
        self.warning.is_none()
    }

    pub fn into_parts(self) -> (T, Option<PersistenceError>) {
        (self.value, self.warning)
    }

    /// Treats a failed save as an error, for callers that need durability.
    pub fn into_result(self) -> Result<T, StoreError> {
        match self.warning {
            Some(e) => Err(StoreError::Persistence(e)),
            None => Ok(self.value),
        }
    }
}

/// A message about to be appended. Empty text counts as no text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMessage {
    pub text: Option<String>,
    pub image: Option<String>,
    pub sender: Sender,
}

impl NewMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            text: (!text.is_empty()).then_some(text),
            image: None,
            sender,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(Sender::Ai, text)
    }

    pub fn with_image(mut self, data_url: impl Into<String>) -> Self {
        self.image = Some(data_url.into());
        self
    }
}

/// Owns every chatroom and message and writes a full snapshot through its
/// persistence adapter after each mutation.
///
/// Appends are permissive: sending to or paging an id that is not in
/// `chatrooms` creates a message list for it without creating a room.
/// Use [`ChatStore::require_chatroom`] where a missing room should be an
/// error.
pub struct ChatStore {
    state: StoreState,
    persistence: Box<dyn Persistence>,
    history: Box<dyn HistorySource>,
    startup_warning: Option<PersistenceError>,
}

impl ChatStore {
    /// Rehydrates from `persistence`. A failed load leaves the store empty
    /// and is kept for [`ChatStore::take_startup_warning`].
    pub fn open(persistence: impl Persistence + 'static) -> Self {
        let (state, startup_warning) = match persistence.load() {
            Ok(Some(state)) => {
                info!(
                    chatrooms = state.chatrooms.len(),
                    "Restored chat state from persistence"
                );
                (state, None)
            }
            Ok(None) => (StoreState::default(), None),
            Err(e) => {
                warn!("Failed to load chat state, starting empty: {}", e);
                (StoreState::default(), Some(e))
            }
        };

        Self {
            state,
            persistence: Box::new(persistence),
            history: Box::new(SyntheticHistory::default()),
            startup_warning,
        }
    }

    pub fn with_history(mut self, history: impl HistorySource + 'static) -> Self {
        self.history = Box::new(history);
        self
    }

    pub fn take_startup_warning(&mut self) -> Option<PersistenceError> {
        self.startup_warning.take()
    }

    // -- Reads --

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn chatrooms(&self) -> &[Chatroom] {
        &self.state.chatrooms
    }

    pub fn chatroom(&self, id: RoomId) -> Option<&Chatroom> {
        self.state.chatrooms.iter().find(|room| room.id == id)
    }

    pub fn require_chatroom(&self, id: RoomId) -> Result<&Chatroom, StoreError> {
        self.chatroom(id).ok_or(StoreError::NotFound(id))
    }

    /// Messages of a room, oldest first. Empty when the room has none.
    pub fn messages(&self, room_id: RoomId) -> &[Message] {
        self.state
            .messages
            .get(&room_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Rooms whose title contains `term`, ignoring case, in creation order.
    pub fn search_chatrooms(&self, term: &str) -> Vec<&Chatroom> {
        let term = term.to_lowercase();
        self.state
            .chatrooms
            .iter()
            .filter(|room| room.title.to_lowercase().contains(&term))
            .collect()
    }

    // -- Mutations --

    pub fn add_chatroom(&mut self, title: impl Into<String>) -> Outcome<RoomId> {
        let id = Uuid::new_v4();
        self.state.chatrooms.push(Chatroom {
            id,
            title: title.into(),
        });
        self.state.messages.insert(id, Vec::new());

        debug!(room_id = %id, "Chatroom created");
        self.commit(id)
    }

    /// Removes the room and its messages. Returns whether a room was removed.
    pub fn delete_chatroom(&mut self, id: RoomId) -> Outcome<bool> {
        let before = self.state.chatrooms.len();
        self.state.chatrooms.retain(|room| room.id != id);
        self.state.messages.remove(&id);
        let removed = self.state.chatrooms.len() != before;

        debug!(room_id = %id, removed, "Chatroom deleted");
        self.commit(removed)
    }

    pub fn send_message(&mut self, room_id: RoomId, message: NewMessage) -> Outcome<MessageId> {
        let id = Uuid::new_v4();
        let messages = self.state.messages.entry(room_id).or_default();

        // Appends never move backwards in time, even if the wall clock does.
        let now = Utc::now();
        let timestamp = messages.last().map_or(now, |last| last.timestamp.max(now));

        messages.push(Message {
            id,
            text: message.text,
            image: message.image,
            sender: message.sender,
            timestamp,
        });

        debug!(room_id = %room_id, message_id = %id, sender = ?message.sender, "Message appended");
        self.commit(id)
    }

    /// Prepends one page of older messages. Returns the page length.
    pub fn load_older_messages(&mut self, room_id: RoomId) -> Outcome<usize> {
        let page = {
            let oldest = self.state.messages.get(&room_id).and_then(|m| m.first());
            self.history.older_page(room_id, oldest)
        };
        let count = page.len();

        let messages = self.state.messages.entry(room_id).or_default();
        messages.splice(0..0, page);

        debug!(room_id = %room_id, count, "Older messages prepended");
        self.commit(count)
    }

    fn commit<T>(&self, value: T) -> Outcome<T> {
        let warning = match self.persistence.save(&self.state) {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to persist chat state, continuing in memory: {}", e);
                Some(e)
            }
        };
        Outcome { value, warning }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use murmur_db::{BlobPersistence, BlobStore, MemoryBlobStore};

    use super::*;
    use crate::history::{PAGE_SIZE, PLACEHOLDER_TEXT};

    fn memory_store() -> ChatStore {
        ChatStore::open(BlobPersistence::new(MemoryBlobStore::new()))
    }

    /// Loads nothing and fails every save.
    struct BrokenPersistence {
        saves: Arc<AtomicUsize>,
    }

    impl Persistence for BrokenPersistence {
        fn load(&self) -> murmur_db::Result<Option<StoreState>> {
            Ok(None)
        }

        fn save(&self, _state: &StoreState) -> murmur_db::Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Err(PersistenceError::LockPoisoned)
        }
    }

    #[test]
    fn add_chatroom_returns_unique_ids() {
        let mut store = memory_store();
        let ids: Vec<RoomId> = (0..20)
            .map(|i| store.add_chatroom(format!("room {}", i)).into_value())
            .collect();

        assert_eq!(store.chatrooms().len(), 20);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 20);
        for id in &ids {
            assert!(store.state().messages.get(id).unwrap().is_empty());
        }
    }

    #[test]
    fn chatrooms_keep_insertion_order() {
        let mut store = memory_store();
        store.add_chatroom("first");
        store.add_chatroom("second");
        store.add_chatroom("third");

        let titles: Vec<&str> = store.chatrooms().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn create_send_delete_scenario() {
        let mut store = memory_store();
        let r1 = store.add_chatroom("Team A").into_value();

        store.send_message(r1, NewMessage::user("hello"));
        let messages = store.messages(r1);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text.as_deref(), Some("hello"));
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].image, None);

        assert!(store.delete_chatroom(r1).into_value());
        assert!(store.chatrooms().is_empty());
        assert!(!store.state().messages.contains_key(&r1));
    }

    #[test]
    fn delete_removes_only_the_target() {
        let mut store = memory_store();
        let keep = store.add_chatroom("keep").into_value();
        let gone = store.add_chatroom("gone").into_value();
        store.send_message(keep, NewMessage::user("stay"));
        store.send_message(gone, NewMessage::user("bye"));

        store.delete_chatroom(gone);

        assert_eq!(store.chatrooms().len(), 1);
        assert_eq!(store.chatrooms()[0].id, keep);
        assert_eq!(store.messages(keep).len(), 1);
        assert!(store.messages(gone).is_empty());
    }

    #[test]
    fn delete_unknown_room_is_noop() {
        let mut store = memory_store();
        store.add_chatroom("Team A");

        let outcome = store.delete_chatroom(Uuid::new_v4());
        assert!(!outcome.value());
        assert_eq!(store.chatrooms().len(), 1);
    }

    #[test]
    fn send_after_delete_is_permissive() {
        let mut store = memory_store();
        let id = store.add_chatroom("Team A").into_value();
        store.delete_chatroom(id);

        store.send_message(id, NewMessage::user("still here"));

        assert_eq!(store.messages(id).len(), 1);
        assert!(store.chatroom(id).is_none());
        assert!(matches!(store.require_chatroom(id), Err(StoreError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn send_is_append_only_in_call_order() {
        let mut store = memory_store();
        let id = store.add_chatroom("Team A").into_value();
        store.send_message(id, NewMessage::user("existing"));

        for i in 0..5 {
            let sender = if i % 2 == 0 { Sender::User } else { Sender::Ai };
            store.send_message(id, NewMessage::new(sender, format!("m{}", i)));
        }

        let texts: Vec<&str> = store
            .messages(id)
            .iter()
            .filter_map(|m| m.text.as_deref())
            .collect();
        assert_eq!(texts, ["existing", "m0", "m1", "m2", "m3", "m4"]);
        assert_eq!(store.messages(id)[2].sender, Sender::Ai);
    }

    #[test]
    fn appended_timestamps_never_decrease() {
        let mut store = memory_store();
        let id = store.add_chatroom("Team A").into_value();
        for i in 0..50 {
            store.send_message(id, NewMessage::user(format!("m{}", i)));
        }

        let messages = store.messages(id);
        assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn image_messages_keep_payload() {
        let mut store = memory_store();
        let id = store.add_chatroom("Team A").into_value();
        let url = "data:image/png;base64,iVBORw0KGgo=";

        store.send_message(id, NewMessage::user("").with_image(url));

        let msg = &store.messages(id)[0];
        assert_eq!(msg.text, None);
        assert_eq!(msg.image.as_deref(), Some(url));
        assert!(msg.has_content());
    }

    #[test]
    fn load_older_prepends_one_page() {
        let mut store = memory_store();
        let id = store.add_chatroom("Team A").into_value();
        store.send_message(id, NewMessage::user("original"));

        assert_eq!(store.load_older_messages(id).into_value(), PAGE_SIZE);

        let messages = store.messages(id);
        assert_eq!(messages.len(), 11);
        assert!(
            messages[..10]
                .iter()
                .all(|m| m.text.as_deref() == Some(PLACEHOLDER_TEXT) && m.sender == Sender::User)
        );
        assert_eq!(messages[10].text.as_deref(), Some("original"));
    }

    #[test]
    fn second_page_lands_before_the_first() {
        let mut store = memory_store();
        let id = store.add_chatroom("Team A").into_value();
        store.send_message(id, NewMessage::user("original"));

        store.load_older_messages(id);
        let first_page: Vec<MessageId> = store.messages(id)[..10].iter().map(|m| m.id).collect();

        store.load_older_messages(id);
        let messages = store.messages(id);
        assert_eq!(messages.len(), 21);
        let now_second: Vec<MessageId> = messages[10..20].iter().map(|m| m.id).collect();
        assert_eq!(now_second, first_page);
        assert_eq!(messages[20].text.as_deref(), Some("original"));
    }

    #[test]
    fn history_source_sees_current_head() {
        struct Recording(Arc<std::sync::Mutex<Vec<Option<MessageId>>>>);

        impl HistorySource for Recording {
            fn older_page(&self, _room_id: RoomId, oldest: Option<&Message>) -> Vec<Message> {
                self.0.lock().unwrap().push(oldest.map(|m| m.id));
                vec![]
            }
        }

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut store = memory_store().with_history(Recording(seen.clone()));
        let id = store.add_chatroom("Team A").into_value();

        store.load_older_messages(id);
        let first = store.send_message(id, NewMessage::user("a")).into_value();
        store.send_message(id, NewMessage::user("b"));
        assert_eq!(store.load_older_messages(id).into_value(), 0);

        assert_eq!(*seen.lock().unwrap(), vec![None, Some(first)]);
    }

    #[test]
    fn search_is_case_insensitive() {
        let mut store = memory_store();
        store.add_chatroom("Team Alpha");
        store.add_chatroom("Beta squad");
        store.add_chatroom("ALPHA centauri");

        let hits: Vec<&str> = store
            .search_chatrooms("alpha")
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(hits, ["Team Alpha", "ALPHA centauri"]);
        assert_eq!(store.search_chatrooms("").len(), 3);
        assert!(store.search_chatrooms("gamma").is_empty());
    }

    #[test]
    fn state_survives_reload() {
        let blobs = Arc::new(MemoryBlobStore::new());

        let original = {
            let mut store = ChatStore::open(BlobPersistence::new(blobs.clone()));
            let a = store.add_chatroom("Team A").into_value();
            let b = store.add_chatroom("Team B").into_value();
            store.send_message(a, NewMessage::user("hello"));
            store.send_message(a, NewMessage::ai("hi there"));
            store.load_older_messages(b);
            store.state().clone()
        };

        let mut reloaded = ChatStore::open(BlobPersistence::new(blobs));
        assert!(reloaded.take_startup_warning().is_none());
        assert_eq!(reloaded.state(), &original);
    }

    #[test]
    fn durable_outcome_converts_to_ok() {
        let mut store = memory_store();
        let outcome = store.add_chatroom("Team A");
        assert!(outcome.is_durable());
        assert!(outcome.into_result().is_ok());
    }

    #[test]
    fn every_mutation_saves() {
        let saves = Arc::new(AtomicUsize::new(0));
        let mut store = ChatStore::open(BrokenPersistence { saves: saves.clone() });

        let id = store.add_chatroom("Team A").into_value();
        store.send_message(id, NewMessage::user("hello"));
        store.load_older_messages(id);
        store.delete_chatroom(id);

        assert_eq!(saves.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn save_failure_is_a_warning() {
        let saves = Arc::new(AtomicUsize::new(0));
        let mut store = ChatStore::open(BrokenPersistence { saves });

        let outcome = store.add_chatroom("Team A");
        assert!(!outcome.is_durable());
        assert!(matches!(outcome.warning(), Some(PersistenceError::LockPoisoned)));

        let (id, _) = outcome.into_parts();
        let sent = store.send_message(id, NewMessage::user("hello"));
        assert!(matches!(
            sent.into_result(),
            Err(StoreError::Persistence(PersistenceError::LockPoisoned))
        ));
        assert_eq!(store.chatrooms().len(), 1);
        assert_eq!(store.messages(id).len(), 1);
    }

    #[test]
    fn corrupt_snapshot_starts_empty() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put(murmur_db::DEFAULT_STORAGE_KEY, "{broken").unwrap();

        let mut store = ChatStore::open(BlobPersistence::new(blobs));
        assert!(store.state().is_empty());
        assert!(matches!(
            store.take_startup_warning(),
            Some(PersistenceError::Decode(_))
        ));
        assert!(store.take_startup_warning().is_none());
    }
}
