use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::StatusCode;
use murmur_store::ChatStore;
use tracing::error;

use crate::countries::CountryProvider;
use crate::responder::{AutoResponder, ReplyConfig};

/// The chat store shared between handlers and reply tasks. The lock is
/// only ever held for a single store operation, never across an await.
pub type SharedStore = Arc<Mutex<ChatStore>>;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: SharedStore,
    pub responder: AutoResponder,
    pub countries: CountryProvider,
}

impl AppStateInner {
    pub fn new(store: ChatStore, reply: ReplyConfig, countries: CountryProvider) -> AppState {
        let store: SharedStore = Arc::new(Mutex::new(store));
        Arc::new(Self {
            responder: AutoResponder::new(store.clone(), reply),
            store,
            countries,
        })
    }

    pub fn lock_store(&self) -> Result<MutexGuard<'_, ChatStore>, StatusCode> {
        self.store.lock().map_err(|e| {
            error!("Chat store lock poisoned: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }
}
