//! In-memory implementation of the BlobStore trait.
//!
//! This is primarily for testing. It has the same semantics as the file and
//! SQLite backends but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use privkit_core::{DocumentId, Revision};

use crate::error::{Result, StoreError};
use crate::traits::{BlobStore, Expect, PutResult, StoredBlob};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<DocumentId, StoredBlob>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a document's raw envelope text, bypassing the codec.
    ///
    /// Lets tests simulate corruption or a foreign writer.
    pub fn insert_raw(&self, id: &DocumentId, envelope: &str) -> Result<()> {
        let mut blobs = self.blobs.write().map_err(poisoned)?;
        blobs.insert(id.clone(), StoredBlob::new(envelope.to_string()));
        Ok(())
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::LockPoisoned(e.to_string())
}

impl BlobStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn get(&self, id: &DocumentId) -> Result<Option<StoredBlob>> {
        let blobs = self.blobs.read().map_err(poisoned)?;
        Ok(blobs.get(id).filter(|b| !b.envelope.is_empty()).cloned())
    }

    fn put(&self, id: &DocumentId, envelope: &str, expect: Expect) -> Result<PutResult> {
        let mut blobs = self.blobs.write().map_err(poisoned)?;

        let current: Option<Revision> = blobs
            .get(id)
            .filter(|b| !b.envelope.is_empty())
            .map(|b| b.revision);
        if !expect.holds(current) {
            return Ok(PutResult::Stale { current });
        }

        let blob = StoredBlob::new(envelope.to_string());
        let revision = blob.revision;
        blobs.insert(id.clone(), blob);
        Ok(PutResult::Written(revision))
    }

    fn list(&self) -> Result<Vec<DocumentId>> {
        let blobs = self.blobs.read().map_err(poisoned)?;
        let mut ids: Vec<DocumentId> = blobs.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
