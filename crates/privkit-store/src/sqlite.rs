//! SQLite implementation of the BlobStore trait.
//!
//! Envelopes are kept in a single `documents` table keyed by document name.
//! Conditional writes run inside one immediate transaction, so the
//! compare-and-swap is atomic even across processes sharing the file.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use privkit_core::{DocumentId, Revision};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::now_millis;
use crate::traits::{BlobStore, Expect, PutResult, StoredBlob};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute an operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(format!("sqlite connection: {}", e)))?;
        f(&mut conn)
    }
}

fn row_to_blob(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, Vec<u8>)> {
    Ok((row.get("envelope")?, row.get("revision")?))
}

fn to_revision(bytes: Vec<u8>) -> Result<Revision> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| StoreError::Migration("revision column is not 32 bytes".into()))?;
    Ok(Revision(arr))
}

impl BlobStore for SqliteStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, id: &DocumentId) -> Result<Option<StoredBlob>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT envelope, revision FROM documents WHERE name = ?1",
                    params![id.as_str()],
                    row_to_blob,
                )
                .optional()?;

            match row {
                Some((envelope, _)) if envelope.is_empty() => Ok(None),
                Some((envelope, revision)) => Ok(Some(StoredBlob {
                    envelope,
                    revision: to_revision(revision)?,
                })),
                None => Ok(None),
            }
        })
    }

    fn put(&self, id: &DocumentId, envelope: &str, expect: Expect) -> Result<PutResult> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let current: Option<Revision> = tx
                .query_row(
                    "SELECT envelope, revision FROM documents WHERE name = ?1",
                    params![id.as_str()],
                    row_to_blob,
                )
                .optional()?
                .filter(|(envelope, _)| !envelope.is_empty())
                .map(|(_, revision)| to_revision(revision))
                .transpose()?;

            if !expect.holds(current) {
                return Ok(PutResult::Stale { current });
            }

            let revision = Revision::of(envelope);
            tx.execute(
                "INSERT INTO documents (name, envelope, revision, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET
                    envelope = excluded.envelope,
                    revision = excluded.revision,
                    updated_at = excluded.updated_at",
                params![
                    id.as_str(),
                    envelope,
                    revision.as_bytes().as_slice(),
                    now_millis()
                ],
            )?;
            tx.commit()?;

            Ok(PutResult::Written(revision))
        })
    }

    fn list(&self) -> Result<Vec<DocumentId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM documents ORDER BY name")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(names
                .into_iter()
                .filter_map(|name| DocumentId::custom(name).ok())
                .collect())
        })
    }
}
