use std::collections::HashMap;
use std::sync::Mutex;

use crate::{BlobStore, PersistenceError, Result};

/// Process-local blob store. Contents vanish with the process.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let blobs = self.blobs.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(blobs.get(key).cloned())
    }

    fn put(&self, key: &str, blob: &str) -> Result<()> {
        let mut blobs = self.blobs.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}
