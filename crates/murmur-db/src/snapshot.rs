//! Versioned JSON snapshots of the full chat state.
//!
//! The whole `StoreState` is written under a single storage key on every
//! save, wrapped as `{"state": {...}, "version": N}`.

use murmur_types::StoreState;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BlobStore, Persistence, PersistenceError, Result};

pub const DEFAULT_STORAGE_KEY: &str = "chat-store";
pub const SNAPSHOT_VERSION: u32 = 0;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    state: &'a StoreState,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    state: StoreState,
    #[serde(default)]
    version: u32,
}

pub fn encode(state: &StoreState) -> Result<String> {
    serde_json::to_string(&EnvelopeRef {
        state,
        version: SNAPSHOT_VERSION,
    })
    .map_err(PersistenceError::Encode)
}

pub fn decode(blob: &str) -> Result<StoreState> {
    let envelope: Envelope = serde_json::from_str(blob).map_err(PersistenceError::Decode)?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: envelope.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    Ok(envelope.state)
}

/// Adapts any `BlobStore` into a `Persistence` under a fixed storage key.
pub struct BlobPersistence<B> {
    blobs: B,
    key: String,
}

impl<B: BlobStore> BlobPersistence<B> {
    pub fn new(blobs: B) -> Self {
        Self::with_key(blobs, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(blobs: B, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
        }
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }
}

impl<B: BlobStore> Persistence for BlobPersistence<B> {
    fn load(&self) -> Result<Option<StoreState>> {
        match self.blobs.get(&self.key)? {
            Some(blob) => decode(&blob).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, state: &StoreState) -> Result<()> {
        let blob = encode(state)?;
        debug!(key = %self.key, bytes = blob.len(), "Saving chat snapshot");
        self.blobs.put(&self.key, &blob)
    }
}
