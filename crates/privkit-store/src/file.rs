//! Encrypted-file implementation of the BlobStore trait.
//!
//! Each document lives in `<root>/<name>.json` and holds a single envelope
//! line. Writes go to a temporary file in the same directory which is then
//! renamed over the target, so readers see either the old or the new
//! envelope and never a partial one.
//!
//! Conditional writes hold an exclusive OS lock on
//! `<root>/.privkit.lock` from the precondition check until the rename, so
//! every store over the same directory, in this process or another, sees
//! them as atomic.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use privkit_core::DocumentId;
use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};
use crate::traits::{BlobStore, Expect, PutResult, StoredBlob};

const EXTENSION: &str = "json";

/// Lock file guarding writes to the directory.
pub const LOCK_FILE: &str = ".privkit.lock";

/// Directory-backed store, one file per document.
pub struct FileStore {
    root: PathBuf,
}

/// Exclusive directory lock, released when dropped.
struct DirLock(File);

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.0) {
            tracing::warn!(error = %e, "failed to release store lock");
        }
    }
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The directory holding the documents.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file path backing a document.
    pub fn path_of(&self, id: &DocumentId) -> PathBuf {
        self.root.join(format!("{}.{}", id.as_str(), EXTENSION))
    }

    fn lock(&self) -> Result<DirLock> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.root.join(LOCK_FILE))?;
        FileExt::lock_exclusive(&file)?;
        Ok(DirLock(file))
    }

    fn read_blob(&self, path: &Path) -> Result<Option<StoredBlob>> {
        match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(StoredBlob::new(text.trim().to_string()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl BlobStore for FileStore {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn get(&self, id: &DocumentId) -> Result<Option<StoredBlob>> {
        self.read_blob(&self.path_of(id))
    }

    fn put(&self, id: &DocumentId, envelope: &str, expect: Expect) -> Result<PutResult> {
        let _lock = self.lock()?;

        let path = self.path_of(id);
        let current = self.read_blob(&path)?.map(|b| b.revision);
        if !expect.holds(current) {
            return Ok(PutResult::Stale { current });
        }

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(envelope.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        tracing::debug!(document = %id, path = %path.display(), "envelope written");
        Ok(PutResult::Written(StoredBlob::new(envelope.to_string()).revision))
    }

    fn list(&self) -> Result<Vec<DocumentId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(id) = DocumentId::custom(stem) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use privkit_core::Revision;

    #[test]
    fn test_file_store_basic() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let id = DocumentId::CONSENTS;

        assert!(store.get(&id).unwrap().is_none());

        store.put(&id, "00:11", Expect::Any).unwrap();
        assert!(dir.path().join("consents.json").exists());

        let blob = store.get(&id).unwrap().unwrap();
        assert_eq!(blob.envelope, "00:11");
        assert_eq!(blob.revision, Revision::of("00:11"));

        assert_eq!(store.list().unwrap(), vec![DocumentId::CONSENTS]);
    }

    #[test]
    fn test_file_store_detects_foreign_writer() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let id = DocumentId::DSAR_USERS;

        store.put(&id, "aa:bb", Expect::Absent).unwrap();
        let seen = store.get(&id).unwrap().unwrap();

        // Another process rewrites the file behind our back.
        fs::write(store.path_of(&id), "cc:dd").unwrap();

        let result = store
            .put(&id, "ee:ff", Expect::Revision(seen.revision))
            .unwrap();
        assert!(matches!(result, PutResult::Stale { .. }));
        assert_eq!(store.get(&id).unwrap().unwrap().envelope, "cc:dd");
    }

    #[test]
    fn test_two_stores_over_one_directory_never_lose_updates() {
        use std::sync::Arc;

        use privkit_core::{EncryptionKey, SymmetricCodec};

        use crate::document::{Change, DocumentStore};

        const ROUNDS: usize = 200;

        let dir = tempfile::tempdir().unwrap();
        let open = || {
            DocumentStore::new(
                Arc::new(FileStore::open(dir.path()).unwrap()),
                SymmetricCodec::new(EncryptionKey::from_secret("file-cas")),
            )
        };
        let stores = [open(), open()];

        let outcomes: Vec<(usize, usize)> = std::thread::scope(|scope| {
            let workers: Vec<_> = stores
                .iter()
                .enumerate()
                .map(|(worker, docs)| {
                    scope.spawn(move || {
                        let (mut committed, mut conflicts) = (0, 0);
                        for round in 0..ROUNDS {
                            let result = docs.update_blocking(
                                &DocumentId::PROCESSING_LOGS,
                                Vec::<String>::new(),
                                |entries| {
                                    entries.push(format!("{worker}-{round}"));
                                    Change::Commit(())
                                },
                            );
                            match result {
                                Ok(()) => committed += 1,
                                Err(StoreError::Conflict(_)) => conflicts += 1,
                                Err(other) => panic!("unexpected error: {other}"),
                            }
                        }
                        (committed, conflicts)
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let committed: usize = outcomes.iter().map(|(ok, _)| ok).sum();
        let conflicts: usize = outcomes.iter().map(|(_, c)| c).sum();
        assert_eq!(committed + conflicts, 2 * ROUNDS);

        let persisted: Vec<String> = stores[0]
            .read_blocking(&DocumentId::PROCESSING_LOGS, Vec::new())
            .unwrap();
        assert_eq!(persisted.len(), committed);
    }

    #[test]
    fn test_lock_file_is_not_a_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.put(&DocumentId::CONSENTS, "00:11", Expect::Any).unwrap();

        assert!(dir.path().join(LOCK_FILE).exists());
        assert_eq!(store.list().unwrap(), vec![DocumentId::CONSENTS]);
    }

    #[test]
    fn test_empty_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(store.path_of(&DocumentId::PROCESSING_LOGS), "\n").unwrap();

        assert!(store.get(&DocumentId::PROCESSING_LOGS).unwrap().is_none());
    }

    #[test]
    fn test_list_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        store.put(&DocumentId::BREACH_LOG, "00:11", Expect::Any).unwrap();

        assert_eq!(store.list().unwrap(), vec![DocumentId::BREACH_LOG]);
    }
}
