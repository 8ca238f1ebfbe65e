//! Encrypted JSON documents on top of a [`BlobStore`].
//!
//! Every higher-level mutation is a read-modify-write cycle on one document.
//! Within a process, cycles on the same document are serialized by a
//! per-document mutex. Across store instances and processes, the write
//! carries the revision that was read, so a concurrent external writer surfaces as
//! [`StoreError::Conflict`] instead of a silently lost update.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use privkit_core::{DocumentId, SymmetricCodec};

use crate::error::{Result, StoreError};
use crate::traits::{BlobStore, Expect, PutResult, StoredBlob};

/// What to do with a document that exists but cannot be decrypted or parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadPolicy {
    /// Treat it as absent and return the caller's fallback.
    #[default]
    Lenient,
    /// Fail with [`StoreError::Corrupt`].
    Strict,
}

/// Outcome of a mutation inside [`DocumentStore::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<R> {
    /// Persist the mutated document and return `R`.
    Commit(R),
    /// Leave storage untouched and return `R`.
    Discard(R),
}

/// Encrypted JSON document store.
///
/// Cheap to clone; clones share the backend, codec and lock table.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("backend", &self.inner.backend.kind())
            .field("policy", &self.inner.policy)
            .finish()
    }
}

struct Inner {
    backend: Arc<dyn BlobStore>,
    codec: SymmetricCodec,
    policy: ReadPolicy,
    locks: Mutex<HashMap<DocumentId, Arc<Mutex<()>>>>,
}

impl DocumentStore {
    /// Create a store with the lenient read policy.
    pub fn new(backend: Arc<dyn BlobStore>, codec: SymmetricCodec) -> Self {
        Self::with_policy(backend, codec, ReadPolicy::default())
    }

    /// Create a store with an explicit read policy.
    pub fn with_policy(
        backend: Arc<dyn BlobStore>,
        codec: SymmetricCodec,
        policy: ReadPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                codec,
                policy,
                locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn BlobStore> {
        &self.inner.backend
    }

    /// The configured read policy.
    pub fn read_policy(&self) -> ReadPolicy {
        self.inner.policy
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blocking API
    // ─────────────────────────────────────────────────────────────────────────

    /// Read a document, or `fallback` if it is absent or empty.
    pub fn read_blocking<T: DeserializeOwned>(&self, id: &DocumentId, fallback: T) -> Result<T> {
        let blob = self.inner.backend.get(id)?;
        self.decode(id, blob.as_ref(), fallback)
    }

    /// Replace a document unconditionally.
    pub fn write_blocking<T: Serialize>(&self, id: &DocumentId, value: &T) -> Result<()> {
        let lock = self.lock_for(id)?;
        let _guard = lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        let envelope = self.encode(value)?;
        self.inner.backend.put(id, &envelope, Expect::Any)?;
        tracing::debug!(document = %id, backend = self.inner.backend.kind(), "document written");
        Ok(())
    }

    /// Read-modify-write a document.
    ///
    /// `default` seeds the cycle when the document is absent (or corrupt
    /// under the lenient policy). The mutation decides whether the result is
    /// written back.
    pub fn update_blocking<T, R, F>(&self, id: &DocumentId, default: T, mutate: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Change<R>,
    {
        let lock = self.lock_for(id)?;
        let _guard = lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        let blob = self.inner.backend.get(id)?;
        let mut doc = self.decode(id, blob.as_ref(), default)?;

        match mutate(&mut doc) {
            Change::Discard(r) => Ok(r),
            Change::Commit(r) => {
                let envelope = self.encode(&doc)?;
                match self
                    .inner
                    .backend
                    .put(id, &envelope, Expect::observed(blob.as_ref()))?
                {
                    PutResult::Written(revision) => {
                        tracing::debug!(
                            document = %id,
                            backend = self.inner.backend.kind(),
                            %revision,
                            "document updated"
                        );
                        Ok(r)
                    }
                    PutResult::Stale { .. } => {
                        tracing::warn!(document = %id, "concurrent writer detected, update rejected");
                        Err(StoreError::Conflict(id.clone()))
                    }
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Async API
    // ─────────────────────────────────────────────────────────────────────────

    /// Async [`read_blocking`](Self::read_blocking).
    pub async fn read<T>(&self, id: &DocumentId, fallback: T) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let this = self.clone();
        let id = id.clone();
        run_blocking(move || this.read_blocking(&id, fallback)).await
    }

    /// Async [`write_blocking`](Self::write_blocking).
    pub async fn write<T>(&self, id: &DocumentId, value: T) -> Result<()>
    where
        T: Serialize + Send + 'static,
    {
        let this = self.clone();
        let id = id.clone();
        run_blocking(move || this.write_blocking(&id, &value)).await
    }

    /// Async [`update_blocking`](Self::update_blocking).
    pub async fn update<T, R, F>(&self, id: &DocumentId, default: T, mutate: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        R: Send + 'static,
        F: FnOnce(&mut T) -> Change<R> + Send + 'static,
    {
        let this = self.clone();
        let id = id.clone();
        run_blocking(move || this.update_blocking(&id, default, mutate)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn lock_for(&self, id: &DocumentId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .inner
            .locks
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        Ok(locks.entry(id.clone()).or_default().clone())
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        let json =
            serde_json::to_vec_pretty(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(self.inner.codec.encrypt_str(&json)?)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        id: &DocumentId,
        blob: Option<&StoredBlob>,
        fallback: T,
    ) -> Result<T> {
        let Some(blob) = blob else {
            return Ok(fallback);
        };

        let parsed = self
            .inner
            .codec
            .decrypt_str(&blob.envelope)
            .map_err(|e| e.to_string())
            .and_then(|plain| serde_json::from_slice::<T>(&plain).map_err(|e| e.to_string()));

        match (parsed, self.inner.policy) {
            (Ok(doc), _) => Ok(doc),
            (Err(reason), ReadPolicy::Lenient) => {
                tracing::warn!(document = %id, %reason, "unreadable document treated as absent");
                Ok(fallback)
            }
            (Err(reason), ReadPolicy::Strict) => Err(StoreError::Corrupt {
                document: id.clone(),
                reason,
            }),
        }
    }
}

async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}
