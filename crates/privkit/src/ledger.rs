//! Append-only ledgers.
//!
//! A ledger is one document holding an ordered sequence of entries.
//! Insertion order is append order. Index lookups past the end return
//! `None` or `false` rather than an error.

use std::fmt;
use std::marker::PhantomData;

use privkit_core::{DocumentId, LedgerEntry};
use privkit_store::{Change, DocumentStore};

use crate::error::Result;

/// An append-only sequence of `E` persisted as one encrypted document.
pub struct Ledger<E> {
    docs: DocumentStore,
    id: DocumentId,
    _entry: PhantomData<fn() -> E>,
}

impl<E> Clone for Ledger<E> {
    fn clone(&self) -> Self {
        Self {
            docs: self.docs.clone(),
            id: self.id.clone(),
            _entry: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Ledger<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger").field("document", &self.id).finish()
    }
}

impl<E: LedgerEntry> Ledger<E> {
    /// Create a ledger over the given document.
    pub fn new(docs: DocumentStore, id: DocumentId) -> Self {
        Self {
            docs,
            id,
            _entry: PhantomData,
        }
    }

    /// The document backing this ledger.
    pub fn document(&self) -> &DocumentId {
        &self.id
    }

    /// Append one entry. Returns its index.
    pub async fn append(&self, entry: E) -> Result<usize> {
        let index = self
            .docs
            .update(&self.id, Vec::<E>::new(), move |entries| {
                entries.push(entry);
                Change::Commit(entries.len() - 1)
            })
            .await?;
        Ok(index)
    }

    /// Append entries in order. Returns the new length.
    pub async fn append_many(&self, entries: Vec<E>) -> Result<usize> {
        let len = self
            .docs
            .update(&self.id, Vec::<E>::new(), move |existing| {
                if entries.is_empty() {
                    return Change::Discard(existing.len());
                }
                existing.extend(entries);
                Change::Commit(existing.len())
            })
            .await?;
        Ok(len)
    }

    /// Blocking [`append_many`](Self::append_many), for use where no
    /// runtime can be awaited.
    pub fn append_many_blocking(&self, entries: &[E]) -> Result<usize> {
        let len = self
            .docs
            .update_blocking(&self.id, Vec::<E>::new(), |existing| {
                if entries.is_empty() {
                    return Change::Discard(existing.len());
                }
                existing.extend_from_slice(entries);
                Change::Commit(existing.len())
            })?;
        Ok(len)
    }

    /// All entries, oldest first.
    pub async fn list(&self) -> Result<Vec<E>> {
        Ok(self.docs.read(&self.id, Vec::new()).await?)
    }

    /// Entries matching `predicate`, oldest first.
    pub async fn list_filtered<P>(&self, predicate: P) -> Result<Vec<E>>
    where
        P: Fn(&E) -> bool,
    {
        let mut entries = self.list().await?;
        entries.retain(|e| predicate(e));
        Ok(entries)
    }

    /// The entry at `index`, if any.
    pub async fn get(&self, index: usize) -> Result<Option<E>> {
        let mut entries = self.list().await?;
        if index < entries.len() {
            Ok(Some(entries.swap_remove(index)))
        } else {
            Ok(None)
        }
    }

    /// Remove the entry at `index`. Returns false if out of range.
    pub async fn delete(&self, index: usize) -> Result<bool> {
        let removed = self
            .docs
            .update(&self.id, Vec::<E>::new(), move |entries| {
                if index < entries.len() {
                    entries.remove(index);
                    Change::Commit(true)
                } else {
                    Change::Discard(false)
                }
            })
            .await?;
        Ok(removed)
    }

    /// Persist an empty sequence.
    pub async fn clear(&self) -> Result<()> {
        self.docs.write(&self.id, Vec::<E>::new()).await?;
        Ok(())
    }

    /// Number of persisted entries.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }

    /// Whether the ledger holds no persisted entries.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
