//! # privkit Store
//!
//! Storage abstraction for privkit. Provides a trait-based interface for
//! envelope persistence with encrypted-file, SQLite and in-memory
//! implementations, and the encrypted JSON [`DocumentStore`] built on top.
//!
//! ## Overview
//!
//! Backends implement [`BlobStore`] and only ever see opaque envelope text.
//! [`DocumentStore`] owns the codec: it serializes documents to JSON,
//! encrypts them, and runs read-modify-write cycles with per-document
//! locking and revision checks.
//!
//! ## Key Types
//!
//! - [`BlobStore`] - The blocking trait for all backends
//! - [`FileStore`] - One encrypted file per document (primary)
//! - [`SqliteStore`] - SQLite table of envelopes
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`DocumentStore`] - Encrypted JSON documents with read-modify-write
//! - [`ReadPolicy`] - Lenient or strict handling of unreadable documents
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use privkit_core::{DocumentId, EncryptionKey, SymmetricCodec};
//! use privkit_store::{Change, DocumentStore, FileStore};
//!
//! async fn example() {
//!     let backend = Arc::new(FileStore::open("data").unwrap());
//!     let codec = SymmetricCodec::new(EncryptionKey::from_secret("secret"));
//!     let docs = DocumentStore::new(backend, codec);
//!
//!     docs.update(&DocumentId::PROCESSING_LOGS, Vec::<String>::new(), |logs| {
//!         logs.push("started".into());
//!         Change::Commit(())
//!     })
//!     .await
//!     .unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Absent is not an error**: reading a missing or empty document
//!   returns the caller's fallback.
//! - **Corruption policy**: unreadable documents are either treated as
//!   absent or reported, see [`ReadPolicy`].
//! - **No lost updates**: cycles on one document are serialized in-process
//!   and conditioned on the revision they read.

pub mod document;
pub mod error;
pub mod file;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use document::{Change, DocumentStore, ReadPolicy};
pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{BlobStore, Expect, PutResult, StoredBlob};

/// Current time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
