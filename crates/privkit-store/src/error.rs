//! Error types for the store module.

use privkit_core::{CoreError, DocumentId};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error on write.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Codec failure while encrypting a document.
    #[error("codec error: {0}")]
    Codec(#[from] CoreError),

    /// Document exists but cannot be decrypted or parsed (strict reads only).
    #[error("document {document} is corrupt: {reason}")]
    Corrupt { document: DocumentId, reason: String },

    /// Another writer changed the document during a read-modify-write cycle.
    #[error("concurrent modification of document {0}")]
    Conflict(DocumentId),

    /// A lock was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// A blocking task could not be joined.
    #[error("background task failed: {0}")]
    Task(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
