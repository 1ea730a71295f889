pub mod memory;
pub mod migrations;
pub mod snapshot;
pub mod sqlite;

use std::sync::Arc;

use murmur_types::StoreState;
use thiserror::Error;

pub use memory::MemoryBlobStore;
pub use snapshot::{BlobPersistence, DEFAULT_STORAGE_KEY, SNAPSHOT_VERSION};
pub use sqlite::SqliteBlobStore;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("blob store lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Opaque key/value store holding whole serialized snapshots.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrites any previous blob under `key`.
    fn put(&self, key: &str, blob: &str) -> Result<()>;
}

impl<B: BlobStore + ?Sized> BlobStore for Arc<B> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, blob: &str) -> Result<()> {
        (**self).put(key, blob)
    }
}

/// Load-on-init / save-on-change contract used by the chat store.
pub trait Persistence: Send + Sync {
    /// Returns `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<StoreState>>;

    fn save(&self, state: &StoreState) -> Result<()>;
}
